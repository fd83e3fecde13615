//! First-N-days cumulative views, for one video and for the recent baseline.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::data::{TimeSeriesRow, VideoMetricsRow};
use crate::features::{latest_published, mean, median, percentile, window_start};

/// A daily observation tagged with days since the video was published.
#[derive(Debug, Clone, PartialEq)]
pub struct DayObservation<'a> {
    pub video: &'a str,
    pub days_published: i64,
    pub views: f64,
}

/// Join daily rows to publish dates. Rows for unknown videos are dropped.
pub fn days_since_publish<'a>(
    series: &'a [TimeSeriesRow],
    videos: &[VideoMetricsRow],
) -> Vec<DayObservation<'a>> {
    let published: HashMap<&str, chrono::NaiveDate> =
        videos.iter().map(|v| (v.video.as_str(), v.published)).collect();
    series
        .iter()
        .filter_map(|r| {
            let p = published.get(r.video.as_str())?;
            Some(DayObservation {
                video: r.video.as_str(),
                days_published: (r.date - *p).num_days(),
                views: r.views,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandPoint {
    pub day: i64,
    pub mean: f64,
    pub median: f64,
    pub p80: f64,
    pub p20: f64,
}

/// Cumulative views per day over recent videos, one point per observed day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewBands {
    pub window_months: u32,
    pub points: Vec<BandPoint>,
}

/// Per-day distribution of views for videos published inside the trailing
/// window, restricted to days `0..=max_day`, accumulated over days.
pub fn baseline_bands(
    series: &[TimeSeriesRow],
    videos: &[VideoMetricsRow],
    months: u32,
    max_day: i64,
) -> ViewBands {
    let Some(latest) = latest_published(videos) else {
        return ViewBands { window_months: months, points: Vec::new() };
    };
    let start = window_start(latest, months);
    let recent: Vec<VideoMetricsRow> = videos.iter().filter(|v| v.published >= start).cloned().collect();

    let mut by_day: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for obs in days_since_publish(series, &recent) {
        if (0..=max_day).contains(&obs.days_published) {
            by_day.entry(obs.days_published).or_default().push(obs.views);
        }
    }

    let mut points = Vec::with_capacity(by_day.len());
    let mut acc = BandPoint { day: 0, mean: 0.0, median: 0.0, p80: 0.0, p20: 0.0 };
    for (day, views) in by_day {
        acc.day = day;
        acc.mean += mean(&views).unwrap_or(0.0);
        acc.median += median(&views).unwrap_or(0.0);
        acc.p80 += percentile(&views, 0.8).unwrap_or(0.0);
        acc.p20 += percentile(&views, 0.2).unwrap_or(0.0);
        points.push(acc.clone());
    }
    ViewBands { window_months: months, points }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
    pub day: i64,
    pub cumulative_views: f64,
}

/// Cumulative daily views of one video over its first `max_day` days.
/// Several rows on the same day are summed into one point.
pub fn video_curve(
    series: &[TimeSeriesRow],
    videos: &[VideoMetricsRow],
    video_id: &str,
    max_day: i64,
) -> Vec<CurvePoint> {
    let mut by_day: BTreeMap<i64, f64> = BTreeMap::new();
    for obs in days_since_publish(series, videos) {
        if obs.video == video_id && (0..=max_day).contains(&obs.days_published) {
            *by_day.entry(obs.days_published).or_insert(0.0) += obs.views;
        }
    }
    let mut total = 0.0;
    by_day
        .into_iter()
        .map(|(day, views)| {
            total += views;
            CurvePoint { day, cumulative_views: total }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn video(id: &str, published: NaiveDate) -> VideoMetricsRow {
        VideoMetricsRow::new(id, id, published)
    }

    fn daily(id: &str, published: NaiveDate, day: i64, views: f64) -> TimeSeriesRow {
        TimeSeriesRow {
            date: published + Duration::days(day),
            video: id.to_string(),
            video_title: id.to_string(),
            views,
        }
    }

    #[test]
    fn curve_accumulates_and_stops_at_horizon() {
        let p = date(2023, 3, 1);
        let videos = vec![video("a", p)];
        let series = vec![
            daily("a", p, 1, 5.0),
            daily("a", p, 0, 10.0),
            daily("a", p, 1, 1.0),
            daily("a", p, 31, 100.0),
            daily("a", p, -1, 7.0),
        ];
        let curve = video_curve(&series, &videos, "a", 30);
        assert_eq!(
            curve,
            vec![
                CurvePoint { day: 0, cumulative_views: 10.0 },
                CurvePoint { day: 1, cumulative_views: 16.0 },
            ]
        );
    }

    #[test]
    fn bands_use_recent_videos_only() {
        let latest = date(2023, 12, 1);
        let old = date(2021, 1, 1);
        let videos = vec![
            video("a", latest),
            video("b", date(2023, 6, 1)),
            video("old", old),
        ];
        let series = vec![
            daily("a", latest, 0, 10.0),
            daily("b", date(2023, 6, 1), 0, 30.0),
            daily("old", old, 0, 1000.0),
            daily("a", latest, 1, 2.0),
            daily("b", date(2023, 6, 1), 1, 4.0),
        ];
        let bands = baseline_bands(&series, &videos, 12, 30);
        assert_eq!(bands.points.len(), 2);
        assert_eq!(bands.points[0].median, 20.0);
        assert_eq!(bands.points[0].mean, 20.0);
        assert_eq!(bands.points[1].median, 23.0);
        assert_eq!(bands.points[1].day, 1);
        assert!(bands.points[1].p80 >= bands.points[1].p20);
    }

    #[test]
    fn unknown_videos_are_dropped_from_join() {
        let p = date(2023, 1, 1);
        let series = vec![daily("ghost", p, 0, 1.0)];
        assert!(days_since_publish(&series, &[video("a", p)]).is_empty());
    }

    #[test]
    fn empty_inputs_give_empty_bands() {
        assert!(baseline_bands(&[], &[], 12, 30).points.is_empty());
    }
}

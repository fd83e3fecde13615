//! Per-video drill-down: audience split by country bucket and subscription status.

use serde::Serialize;

use crate::data::{CountryBreakdownRow, Dataset, VideoMetricsRow};
use crate::logging::{self, obj, v_num, v_str, Domain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CountryBucket {
    #[serde(rename = "USA")]
    Usa,
    India,
    Other,
}

impl CountryBucket {
    pub const ALL: [CountryBucket; 3] = [CountryBucket::Usa, CountryBucket::India, CountryBucket::Other];

    pub fn label(&self) -> &'static str {
        match self {
            CountryBucket::Usa => "USA",
            CountryBucket::India => "India",
            CountryBucket::Other => "Other",
        }
    }
}

/// Exact, case-sensitive match on the two tracked codes.
pub fn classify_country(code: &str) -> CountryBucket {
    match code {
        "US" => CountryBucket::Usa,
        "IN" => CountryBucket::India,
        _ => CountryBucket::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudienceRow {
    pub country_code: String,
    pub bucket: CountryBucket,
    pub is_subscribed: bool,
    pub views: f64,
}

/// One bar segment: summed views for a subscription status and bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownBar {
    pub is_subscribed: bool,
    pub bucket: CountryBucket,
    pub views: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoBreakdown {
    pub video: VideoMetricsRow,
    pub audience: Vec<AudienceRow>,
    pub bars: Vec<BreakdownBar>,
}

impl VideoBreakdown {
    pub fn total_views(&self) -> f64 {
        self.bars.iter().map(|b| b.views).sum()
    }
}

pub fn resolve_title<'a>(rows: &'a [VideoMetricsRow], title: &str) -> Option<&'a VideoMetricsRow> {
    rows.iter().find(|r| r.title == title)
}

/// Rows for one video, sorted by subscription status (unsubscribed first).
pub fn audience_rows(rows: &[CountryBreakdownRow], video_id: &str) -> Vec<AudienceRow> {
    let mut out: Vec<AudienceRow> = rows
        .iter()
        .filter(|r| r.video == video_id)
        .map(|r| AudienceRow {
            country_code: r.country_code.clone(),
            bucket: classify_country(&r.country_code),
            is_subscribed: r.is_subscribed,
            views: r.views,
        })
        .collect();
    out.sort_by_key(|r| r.is_subscribed);
    out
}

/// Views summed per `(is_subscribed, bucket)`; empty groups are omitted.
pub fn group_bars(audience: &[AudienceRow]) -> Vec<BreakdownBar> {
    let mut bars = Vec::new();
    for is_subscribed in [false, true] {
        for bucket in CountryBucket::ALL {
            let group: Vec<&AudienceRow> = audience
                .iter()
                .filter(|r| r.is_subscribed == is_subscribed && r.bucket == bucket)
                .collect();
            if group.is_empty() {
                continue;
            }
            bars.push(BreakdownBar {
                is_subscribed,
                bucket,
                views: group.iter().map(|r| r.views).sum(),
            });
        }
    }
    bars
}

/// `None` when the id is not in the per-video table.
pub fn video_breakdown(dataset: &Dataset, video_id: &str) -> Option<VideoBreakdown> {
    let video = dataset.video(video_id)?.clone();
    let audience = audience_rows(&dataset.countries, video_id);
    let bars = group_bars(&audience);

    logging::debug(
        Domain::Breakdown,
        "video_breakdown",
        obj(&[
            ("video", v_str(video_id)),
            ("audience_rows", v_num(audience.len() as f64)),
            ("bars", v_num(bars.len() as f64)),
        ]),
    );

    Some(VideoBreakdown { video, audience, bars })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country(video: &str, code: &str, subscribed: bool, views: f64) -> CountryBreakdownRow {
        CountryBreakdownRow {
            video_title: format!("title {}", video),
            video: video.to_string(),
            country_code: code.to_string(),
            is_subscribed: subscribed,
            views,
            likes: 0.0,
            dislikes: 0.0,
            subscriptions_added: 0.0,
            subscriptions_removed: 0.0,
            average_view_pct: 0.0,
            average_watch_time: 0.0,
            comments_added: 0.0,
        }
    }

    #[test]
    fn classifies_countries() {
        assert_eq!(classify_country("US"), CountryBucket::Usa);
        assert_eq!(classify_country("IN"), CountryBucket::India);
        assert_eq!(classify_country("GB"), CountryBucket::Other);
        assert_eq!(classify_country("us"), CountryBucket::Other);
        assert_eq!(classify_country(""), CountryBucket::Other);
    }

    #[test]
    fn audience_filters_and_sorts_by_subscription() {
        let rows = vec![
            country("a", "US", true, 10.0),
            country("b", "US", false, 99.0),
            country("a", "IN", false, 5.0),
            country("a", "DE", true, 2.0),
        ];
        let audience = audience_rows(&rows, "a");
        assert_eq!(audience.len(), 3);
        assert!(!audience[0].is_subscribed);
        assert_eq!(audience[0].bucket, CountryBucket::India);
        assert!(audience[1].is_subscribed && audience[2].is_subscribed);
        // stable within a status
        assert_eq!(audience[1].country_code, "US");
    }

    #[test]
    fn bars_sum_views_per_group() {
        let rows = vec![
            country("a", "US", true, 10.0),
            country("a", "GB", true, 3.0),
            country("a", "DE", true, 2.0),
            country("a", "IN", false, 5.0),
        ];
        let bars = group_bars(&audience_rows(&rows, "a"));
        assert_eq!(
            bars,
            vec![
                BreakdownBar { is_subscribed: false, bucket: CountryBucket::India, views: 5.0 },
                BreakdownBar { is_subscribed: true, bucket: CountryBucket::Usa, views: 10.0 },
                BreakdownBar { is_subscribed: true, bucket: CountryBucket::Other, views: 5.0 },
            ]
        );
    }

    #[test]
    fn unknown_video_has_no_breakdown() {
        let dataset = Dataset::default();
        assert!(video_breakdown(&dataset, "missing").is_none());
    }
}

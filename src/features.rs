//! Derived per-video columns and median-relative normalization.

use chrono::{Months, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::data::VideoMetricsRow;
use crate::logging::{self, obj, v_num, Domain, ProfileScope};

// =============================================================================
// Derived columns
// =============================================================================

pub fn duration_secs(t: NaiveTime) -> f64 {
    (t.hour() * 3600 + t.minute() * 60 + t.second()) as f64
}

/// `(comments + shares + dislikes + likes) / views`, blank without views.
pub fn engagement_ratio(row: &VideoMetricsRow) -> Option<f64> {
    ratio(
        row.comments_added + row.shares + row.dislikes + row.likes,
        row.views,
    )
}

pub fn views_per_sub_gained(row: &VideoMetricsRow) -> Option<f64> {
    ratio(row.views, row.subscribers_gained)
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let r = num / den;
    if r.is_finite() {
        Some(r)
    } else {
        None
    }
}

pub fn derive(row: &mut VideoMetricsRow) {
    row.avg_duration_secs = duration_secs(row.average_view_duration);
    row.engagement_ratio = engagement_ratio(row);
    row.views_per_sub_gained = views_per_sub_gained(row);
}

/// Newest first. Ties keep their file order.
pub fn sort_by_published_desc(rows: &mut [VideoMetricsRow]) {
    rows.sort_by(|a, b| b.published.cmp(&a.published));
}

// =============================================================================
// Metrics
// =============================================================================

/// Every numeric column of the per-video table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CommentsAdded,
    Shares,
    Dislikes,
    Likes,
    SubscribersLost,
    SubscribersGained,
    RpmUsd,
    CpmUsd,
    AveragePctViewed,
    Views,
    WatchTimeHours,
    Subscribers,
    EstimatedRevenueUsd,
    Impressions,
    ImpressionsCtrPct,
    AvgDurationSecs,
    EngagementRatio,
    ViewsPerSubGained,
}

impl Metric {
    pub const ALL: [Metric; 18] = [
        Metric::CommentsAdded,
        Metric::Shares,
        Metric::Dislikes,
        Metric::Likes,
        Metric::SubscribersLost,
        Metric::SubscribersGained,
        Metric::RpmUsd,
        Metric::CpmUsd,
        Metric::AveragePctViewed,
        Metric::Views,
        Metric::WatchTimeHours,
        Metric::Subscribers,
        Metric::EstimatedRevenueUsd,
        Metric::Impressions,
        Metric::ImpressionsCtrPct,
        Metric::AvgDurationSecs,
        Metric::EngagementRatio,
        Metric::ViewsPerSubGained,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::CommentsAdded => "Comments added",
            Metric::Shares => "Shares",
            Metric::Dislikes => "Dislikes",
            Metric::Likes => "Likes",
            Metric::SubscribersLost => "Subscribers lost",
            Metric::SubscribersGained => "Subscribers gained",
            Metric::RpmUsd => "RPM(USD)",
            Metric::CpmUsd => "CPM(USD)",
            Metric::AveragePctViewed => "Average % viewed",
            Metric::Views => "Views",
            Metric::WatchTimeHours => "Watch time (hours)",
            Metric::Subscribers => "Subscribers",
            Metric::EstimatedRevenueUsd => "Your estimated revenue (USD)",
            Metric::Impressions => "Impressions",
            Metric::ImpressionsCtrPct => "Impressions ctr(%)",
            Metric::AvgDurationSecs => "Avg_duration_sec",
            Metric::EngagementRatio => "Engagement_ratio",
            Metric::ViewsPerSubGained => "Views / sub gained",
        }
    }

    pub fn value(&self, row: &VideoMetricsRow) -> Option<f64> {
        let v = match self {
            Metric::CommentsAdded => row.comments_added,
            Metric::Shares => row.shares,
            Metric::Dislikes => row.dislikes,
            Metric::Likes => row.likes,
            Metric::SubscribersLost => row.subscribers_lost,
            Metric::SubscribersGained => row.subscribers_gained,
            Metric::RpmUsd => row.rpm_usd,
            Metric::CpmUsd => row.cpm_usd,
            Metric::AveragePctViewed => row.average_pct_viewed,
            Metric::Views => row.views,
            Metric::WatchTimeHours => row.watch_time_hours,
            Metric::Subscribers => row.subscribers,
            Metric::EstimatedRevenueUsd => row.estimated_revenue_usd,
            Metric::Impressions => row.impressions,
            Metric::ImpressionsCtrPct => row.impressions_ctr_pct,
            Metric::AvgDurationSecs => row.avg_duration_secs,
            Metric::EngagementRatio => return row.engagement_ratio,
            Metric::ViewsPerSubGained => return row.views_per_sub_gained,
        };
        Some(v)
    }
}

// =============================================================================
// Trailing windows
// =============================================================================

/// First date of the trailing window ending at `latest`.
///
/// Calendar months are subtracted with end-of-month clamping, so
/// Aug 31 minus 6 months is Feb 28 (or 29).
pub fn window_start(latest: NaiveDate, months: u32) -> NaiveDate {
    latest
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Boundary-inclusive.
pub fn in_window(date: NaiveDate, start: NaiveDate) -> bool {
    date >= start
}

pub fn latest_published(rows: &[VideoMetricsRow]) -> Option<NaiveDate> {
    rows.iter().map(|r| r.published).max()
}

pub fn rows_in_window(rows: &[VideoMetricsRow], months: u32) -> Vec<&VideoMetricsRow> {
    let Some(latest) = latest_published(rows) else {
        return Vec::new();
    };
    let start = window_start(latest, months);
    rows.iter().filter(|r| in_window(r.published, start)).collect()
}

// =============================================================================
// Order statistics
// =============================================================================

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v
}

/// Linear-interpolated percentile, `p` in `[0, 1]`. Non-finite values are ignored.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let v = sorted_finite(values);
    if v.is_empty() {
        return None;
    }
    let rank = (v.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(v[lo] + (v[hi] - v[lo]) * (rank - lo as f64))
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    let v = sorted_finite(values);
    if v.is_empty() {
        None
    } else {
        Some(v.iter().sum::<f64>() / v.len() as f64)
    }
}

/// Column-wise medians of one trailing window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Medians {
    pub window_months: u32,
    pub window_start: Option<NaiveDate>,
    values: HashMap<Metric, f64>,
}

impl Medians {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }
}

pub fn window_medians(rows: &[VideoMetricsRow], months: u32, metrics: &[Metric]) -> Medians {
    let window = rows_in_window(rows, months);
    let mut values = HashMap::new();
    for metric in metrics {
        let column: Vec<f64> = window.iter().filter_map(|r| metric.value(r)).collect();
        if let Some(m) = median(&column) {
            values.insert(*metric, m);
        }
    }
    Medians {
        window_months: months,
        window_start: latest_published(rows).map(|d| window_start(d, months)),
        values,
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// `(value - median) / median`, blank when undefined.
pub fn relative_to_median(value: Option<f64>, median: Option<f64>) -> Option<f64> {
    let (v, m) = (value?, median?);
    ratio(v - m, m)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub video: String,
    pub title: String,
    pub published: NaiveDate,
    /// Aligned with `Metric::ALL`.
    pub values: Vec<Option<f64>>,
}

impl NormalizedRow {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        Metric::ALL
            .iter()
            .position(|m| *m == metric)
            .and_then(|i| self.values.get(i).copied().flatten())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizedTable {
    pub medians: Medians,
    pub rows: Vec<NormalizedRow>,
}

/// Every metric as a fractional deviation from its trailing-window median.
/// Row order is preserved.
pub fn normalize(rows: &[VideoMetricsRow], months: u32) -> NormalizedTable {
    let _scope = ProfileScope::new("normalize");
    let medians = window_medians(rows, months, &Metric::ALL);

    let out: Vec<NormalizedRow> = rows
        .iter()
        .map(|r| NormalizedRow {
            video: r.video.clone(),
            title: r.title.clone(),
            published: r.published,
            values: Metric::ALL
                .iter()
                .map(|m| relative_to_median(m.value(r), medians.get(*m)))
                .collect(),
        })
        .collect();

    let zero_medians = Metric::ALL
        .iter()
        .filter(|m| medians.get(**m) == Some(0.0))
        .count();
    logging::debug(
        Domain::Derive,
        "normalized",
        obj(&[
            ("rows", v_num(out.len() as f64)),
            ("window_months", v_num(months as f64)),
            ("zero_medians", v_num(zero_medians as f64)),
        ]),
    );

    NormalizedTable { medians, rows: out }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(id: &str, published: NaiveDate, views: f64) -> VideoMetricsRow {
        let mut r = VideoMetricsRow::new(id, id, published);
        r.views = views;
        derive(&mut r);
        r
    }

    #[test]
    fn duration_to_seconds() {
        let t = NaiveTime::from_hms_opt(1, 2, 3).unwrap();
        assert_eq!(duration_secs(t), 3723.0);
    }

    #[test]
    fn engagement_blank_without_views() {
        let mut r = row("a", date(2023, 1, 1), 0.0);
        r.likes = 5.0;
        assert_eq!(engagement_ratio(&r), None);
        r.views = 50.0;
        assert_eq!(engagement_ratio(&r), Some(0.1));
    }

    #[test]
    fn views_per_sub_blank_without_gains() {
        let mut r = row("a", date(2023, 1, 1), 100.0);
        assert_eq!(views_per_sub_gained(&r), None);
        r.subscribers_gained = 4.0;
        assert_eq!(views_per_sub_gained(&r), Some(25.0));
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[f64::NAN, 7.0]), Some(7.0));
    }

    #[test]
    fn percentile_interpolates() {
        let v = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&v, 0.2), Some(18.0));
        assert_eq!(percentile(&v, 0.8), Some(42.0));
        assert_eq!(percentile(&v, 0.0), Some(10.0));
        assert_eq!(percentile(&v, 1.0), Some(50.0));
    }

    #[test]
    fn window_start_clamps_month_end() {
        assert_eq!(window_start(date(2023, 8, 31), 6), date(2023, 2, 28));
        assert_eq!(window_start(date(2023, 12, 1), 12), date(2022, 12, 1));
    }

    #[test]
    fn window_is_inclusive() {
        let rows = vec![
            row("new", date(2023, 12, 1), 300.0),
            row("edge", date(2022, 12, 1), 100.0),
            row("old", date(2022, 11, 30), 900.0),
        ];
        let ids: Vec<&str> = rows_in_window(&rows, 12).iter().map(|r| r.video.as_str()).collect();
        assert_eq!(ids, vec!["new", "edge"]);
    }

    #[test]
    fn normalizes_against_twelve_month_median() {
        let rows = vec![
            row("c", date(2023, 12, 1), 300.0),
            row("b", date(2023, 6, 1), 200.0),
            row("a", date(2023, 1, 1), 100.0),
        ];
        let table = normalize(&rows, 12);
        assert_eq!(table.medians.get(Metric::Views), Some(200.0));
        assert_eq!(table.rows[2].get(Metric::Views), Some(-0.5));
        assert_eq!(table.rows[1].get(Metric::Views), Some(0.0));
        assert_eq!(table.rows[0].get(Metric::Views), Some(0.5));
    }

    #[test]
    fn zero_median_is_blank() {
        let rows = vec![row("a", date(2023, 1, 1), 10.0), row("b", date(2023, 2, 1), 20.0)];
        let table = normalize(&rows, 12);
        // likes are zero everywhere
        assert_eq!(table.medians.get(Metric::Likes), Some(0.0));
        assert!(table.rows.iter().all(|r| r.get(Metric::Likes).is_none()));
        // no subscriber gains anywhere, so the ratio column has no median
        assert_eq!(table.medians.get(Metric::ViewsPerSubGained), None);
    }

    #[test]
    fn sorts_newest_first() {
        let mut rows = vec![
            row("a", date(2023, 1, 1), 1.0),
            row("c", date(2023, 12, 1), 1.0),
            row("b", date(2023, 6, 1), 1.0),
        ];
        sort_by_published_desc(&mut rows);
        let ids: Vec<&str> = rows.iter().map(|r| r.video.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn empty_table_normalizes_to_empty() {
        let table = normalize(&[], 12);
        assert!(table.rows.is_empty());
        assert_eq!(table.medians.get(Metric::Views), None);
        assert_eq!(table.medians.window_start, None);
    }
}

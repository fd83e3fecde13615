//! Aggregate summary tiles: recent median against the longer baseline.

use serde::Serialize;

use crate::data::VideoMetricsRow;
use crate::features::{window_medians, Metric};
use crate::logging::{self, obj, v_num, v_opt, Domain};

/// Metrics shown as tiles, in display order.
pub const TILE_METRICS: [Metric; 10] = [
    Metric::Views,
    Metric::Likes,
    Metric::Subscribers,
    Metric::Shares,
    Metric::CommentsAdded,
    Metric::RpmUsd,
    Metric::AveragePctViewed,
    Metric::AvgDurationSecs,
    Metric::EngagementRatio,
    Metric::ViewsPerSubGained,
];

pub const TILES_PER_ROW: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTile {
    pub metric: Metric,
    pub label: &'static str,
    pub recent_median: Option<f64>,
    pub baseline_median: Option<f64>,
    pub delta: Option<f64>,
}

impl MetricTile {
    pub fn value_text(&self) -> String {
        format_value(self.recent_median)
    }

    /// `None` means the delta is not shown.
    pub fn delta_text(&self) -> Option<String> {
        self.delta.map(format_delta)
    }
}

/// `(recent - baseline) / baseline`; undefined when the baseline is zero.
pub fn percent_change(recent: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    let (r, b) = (recent?, baseline?);
    if b == 0.0 {
        return None;
    }
    let d = (r - b) / b;
    d.is_finite().then_some(d)
}

/// One decimal; blank when there is no value.
pub fn format_value(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{:.1}", v),
        _ => String::new(),
    }
}

/// Signed percentage with two decimals, e.g. `+12.34%`.
pub fn format_delta(d: f64) -> String {
    format!("{:+.2}%", d * 100.0)
}

pub fn compute_tiles(rows: &[VideoMetricsRow], short_months: u32, long_months: u32) -> Vec<MetricTile> {
    let recent = window_medians(rows, short_months, &TILE_METRICS);
    let baseline = window_medians(rows, long_months, &TILE_METRICS);

    let tiles: Vec<MetricTile> = TILE_METRICS
        .iter()
        .map(|m| {
            let recent_median = recent.get(*m);
            let baseline_median = baseline.get(*m);
            MetricTile {
                metric: *m,
                label: m.label(),
                recent_median,
                baseline_median,
                delta: percent_change(recent_median, baseline_median),
            }
        })
        .collect();

    let headline = tiles.first();
    logging::debug(
        Domain::Summary,
        "tiles_computed",
        obj(&[
            ("tiles", v_num(tiles.len() as f64)),
            (
                "hidden_deltas",
                v_num(tiles.iter().filter(|t| t.delta.is_none()).count() as f64),
            ),
            ("views_recent_median", v_opt(headline.and_then(|t| t.recent_median))),
            ("views_baseline_median", v_opt(headline.and_then(|t| t.baseline_median))),
            ("views_delta", v_opt(headline.and_then(|t| t.delta))),
        ]),
    );
    tiles
}

/// Tiles grouped into display rows.
pub fn tile_rows(tiles: &[MetricTile]) -> Vec<&[MetricTile]> {
    tiles.chunks(TILES_PER_ROW).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::derive;
    use chrono::NaiveDate;

    fn row(y: i32, m: u32, d: u32, views: f64, likes: f64) -> VideoMetricsRow {
        let mut r = VideoMetricsRow::new("v", "t", NaiveDate::from_ymd_opt(y, m, d).unwrap());
        r.views = views;
        r.likes = likes;
        derive(&mut r);
        r
    }

    #[test]
    fn delta_formats_signed() {
        assert_eq!(format_delta(0.1234), "+12.34%");
        assert_eq!(format_delta(-0.05), "-5.00%");
        assert_eq!(format_delta(0.0), "+0.00%");
    }

    #[test]
    fn value_rounds_to_one_decimal() {
        assert_eq!(format_value(Some(1234.56)), "1234.6");
        assert_eq!(format_value(None), "");
    }

    #[test]
    fn zero_baseline_hides_delta() {
        assert_eq!(percent_change(Some(3.0), Some(0.0)), None);
        assert_eq!(percent_change(None, Some(2.0)), None);
        assert_eq!(percent_change(Some(3.0), Some(2.0)), Some(0.5));
    }

    #[test]
    fn tiles_compare_six_and_twelve_months() {
        let rows = vec![
            row(2023, 12, 1, 400.0, 0.0),
            row(2023, 6, 1, 200.0, 0.0),
            row(2023, 1, 1, 100.0, 0.0),
        ];
        let tiles = compute_tiles(&rows, 6, 12);
        assert_eq!(tiles.len(), 10);

        let views = &tiles[0];
        assert_eq!(views.label, "Views");
        // 6 months back from Dec 1 is Jun 1, included
        assert_eq!(views.recent_median, Some(300.0));
        assert_eq!(views.baseline_median, Some(200.0));
        assert_eq!(views.delta_text().as_deref(), Some("+50.00%"));
        assert_eq!(views.value_text(), "300.0");

        let likes = &tiles[1];
        assert_eq!(likes.baseline_median, Some(0.0));
        assert_eq!(likes.delta_text(), None);
    }

    #[test]
    fn tiles_layout_in_rows_of_five() {
        let rows = vec![row(2023, 1, 1, 1.0, 1.0)];
        let tiles = compute_tiles(&rows, 6, 12);
        let grid = tile_rows(&tiles);
        assert_eq!(grid.len(), 2);
        assert!(grid.iter().all(|r| r.len() == TILES_PER_ROW));
    }
}

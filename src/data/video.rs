use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{csv_reader, field, parse_number, LoadReport};
use crate::features;

/// Canonical names for the per-video export, applied by position.
pub const VIDEO_COLUMNS: [&str; 19] = [
    "Video",
    "Video title",
    "Video publish time",
    "Comments added",
    "Shares",
    "Dislikes",
    "Likes",
    "Subscribers lost",
    "Subscribers gained",
    "RPM(USD)",
    "CPM(USD)",
    "Average % viewed",
    "Average view duration",
    "Views",
    "Watch time (hours)",
    "Subscribers",
    "Your estimated revenue (USD)",
    "Impressions",
    "Impressions ctr(%)",
];

pub const PUBLISH_DATE_FORMAT: &str = "%b %d, %Y";
pub const DURATION_FORMAT: &str = "%H:%M:%S";

/// One row per video, with the derived columns filled in at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetricsRow {
    pub video: String,
    pub title: String,
    pub published: NaiveDate,
    pub comments_added: f64,
    pub shares: f64,
    pub dislikes: f64,
    pub likes: f64,
    pub subscribers_lost: f64,
    pub subscribers_gained: f64,
    pub rpm_usd: f64,
    pub cpm_usd: f64,
    pub average_pct_viewed: f64,
    pub average_view_duration: NaiveTime,
    pub views: f64,
    pub watch_time_hours: f64,
    pub subscribers: f64,
    pub estimated_revenue_usd: f64,
    pub impressions: f64,
    pub impressions_ctr_pct: f64,
    pub avg_duration_secs: f64,
    pub engagement_ratio: Option<f64>,
    pub views_per_sub_gained: Option<f64>,
}

impl VideoMetricsRow {
    /// A row with zeroed metrics. Derived fields are not computed.
    pub fn new(video: &str, title: &str, published: NaiveDate) -> Self {
        Self {
            video: video.to_string(),
            title: title.to_string(),
            published,
            comments_added: 0.0,
            shares: 0.0,
            dislikes: 0.0,
            likes: 0.0,
            subscribers_lost: 0.0,
            subscribers_gained: 0.0,
            rpm_usd: 0.0,
            cpm_usd: 0.0,
            average_pct_viewed: 0.0,
            average_view_duration: NaiveTime::default(),
            views: 0.0,
            watch_time_hours: 0.0,
            subscribers: 0.0,
            estimated_revenue_usd: 0.0,
            impressions: 0.0,
            impressions_ctr_pct: 0.0,
            avg_duration_secs: 0.0,
            engagement_ratio: None,
            views_per_sub_gained: None,
        }
    }
}

fn parse_record(rec: &csv::StringRecord) -> Result<VideoMetricsRow> {
    let num = |i: usize| -> Result<f64> {
        parse_number(field(rec, i)).with_context(|| format!("column {:?}", VIDEO_COLUMNS[i]))
    };

    let published = NaiveDate::parse_from_str(field(rec, 2), PUBLISH_DATE_FORMAT)
        .with_context(|| format!("bad publish time {:?}", field(rec, 2)))?;
    let average_view_duration = NaiveTime::parse_from_str(field(rec, 12), DURATION_FORMAT)
        .with_context(|| format!("bad view duration {:?}", field(rec, 12)))?;

    let mut row = VideoMetricsRow {
        video: field(rec, 0).to_string(),
        title: field(rec, 1).to_string(),
        published,
        comments_added: num(3)?,
        shares: num(4)?,
        dislikes: num(5)?,
        likes: num(6)?,
        subscribers_lost: num(7)?,
        subscribers_gained: num(8)?,
        rpm_usd: num(9)?,
        cpm_usd: num(10)?,
        average_pct_viewed: num(11)?,
        average_view_duration,
        views: num(13)?,
        watch_time_hours: num(14)?,
        subscribers: num(15)?,
        estimated_revenue_usd: num(16)?,
        impressions: num(17)?,
        impressions_ctr_pct: num(18)?,
        avg_duration_secs: 0.0,
        engagement_ratio: None,
        views_per_sub_gained: None,
    };
    features::derive(&mut row);
    Ok(row)
}

/// Read the per-video export.
///
/// The first data row holds channel totals and is dropped. Any malformed
/// row fails the whole load. Output is sorted by publish time, newest first.
pub fn load_video_metrics(path: &Path) -> Result<(Vec<VideoMetricsRow>, LoadReport)> {
    let mut report = LoadReport::new(path)?;
    let mut rdr = csv_reader(path)?;

    let headers = rdr
        .headers()
        .with_context(|| format!("invalid csv header in {}", path.display()))?;
    if headers.len() < VIDEO_COLUMNS.len() {
        bail!(
            "{}: expected {} columns, got {}",
            path.display(),
            VIDEO_COLUMNS.len(),
            headers.len()
        );
    }

    let mut rows = Vec::new();
    for (row_i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("invalid csv row {} in {}", row_i + 1, path.display()))?;
        if row_i == 0 {
            report.skip(format!("row 1: channel totals ({})", field(&rec, 0)));
            continue;
        }
        let row = parse_record(&rec)
            .with_context(|| format!("{}: row {}", path.display(), row_i + 1))?;
        rows.push(row);
    }

    features::sort_by_published_desc(&mut rows);
    report.rows = rows.len() as u64;
    Ok((rows, report))
}

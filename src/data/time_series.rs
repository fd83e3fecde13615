use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{csv_reader, field, header_index, normalize_header_name, parse_number, require_column, LoadReport};

pub const TIME_SERIES_REQUIRED_COLUMNS: [&str; 3] = ["Date", "External Video ID", "Views"];

/// Day-first formats are tried before month-first ones.
const DATE_FORMATS: [&str; 5] = ["%d %b %Y", "%b %d, %Y", "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Daily views for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    pub video: String,
    pub video_title: String,
    pub views: f64,
}

pub fn parse_series_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Read the daily performance export.
///
/// Rows whose date does not parse are dropped and counted in the report.
pub fn load_time_series(path: &Path) -> Result<(Vec<TimeSeriesRow>, LoadReport)> {
    let mut report = LoadReport::new(path)?;
    let mut rdr = csv_reader(path)?;
    let headers = rdr
        .headers()
        .with_context(|| format!("invalid csv header in {}", path.display()))?
        .clone();
    let idx = header_index(&headers);

    let date_idx = require_column(&idx, "Date", path)?;
    let video_idx = require_column(&idx, "External Video ID", path)?;
    let views_idx = require_column(&idx, "Views", path)?;
    let title_idx = idx.get(&normalize_header_name("Video Title")).copied();

    let mut rows = Vec::new();
    for (row_i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("invalid csv row {} in {}", row_i + 1, path.display()))?;
        let raw_date = field(&rec, date_idx);
        let Some(date) = parse_series_date(raw_date) else {
            report.skip(format!("row {}: bad date {:?}", row_i + 1, raw_date));
            continue;
        };
        let views = parse_number(field(&rec, views_idx))
            .with_context(|| format!("{}: row {}", path.display(), row_i + 1))?;
        rows.push(TimeSeriesRow {
            date,
            video: field(&rec, video_idx).to_string(),
            video_title: title_idx.map(|i| field(&rec, i).to_string()).unwrap_or_default(),
            views,
        });
    }

    report.rows = rows.len() as u64;
    Ok((rows, report))
}

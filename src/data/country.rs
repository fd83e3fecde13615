use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::{csv_reader, field, header_index, normalize_header_name, parse_number, require_column, LoadReport};

pub const COUNTRY_REQUIRED_COLUMNS: [&str; 5] = [
    "Video Title",
    "External Video ID",
    "Country Code",
    "Is Subscribed",
    "Views",
];

/// Views and engagement for one video, one country, one subscription status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryBreakdownRow {
    pub video_title: String,
    pub video: String,
    pub country_code: String,
    pub is_subscribed: bool,
    pub views: f64,
    pub likes: f64,
    pub dislikes: f64,
    pub subscriptions_added: f64,
    pub subscriptions_removed: f64,
    pub average_view_pct: f64,
    pub average_watch_time: f64,
    pub comments_added: f64,
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => bail!("not a subscription flag: {:?}", other),
    }
}

fn optional_number(rec: &csv::StringRecord, idx: Option<usize>) -> Result<f64> {
    match idx {
        Some(i) => parse_number(field(rec, i)),
        None => Ok(0.0),
    }
}

/// Read the per-country, per-subscription-status export.
pub fn load_country_breakdown(path: &Path) -> Result<(Vec<CountryBreakdownRow>, LoadReport)> {
    let mut report = LoadReport::new(path)?;
    let mut rdr = csv_reader(path)?;
    let headers = rdr
        .headers()
        .with_context(|| format!("invalid csv header in {}", path.display()))?
        .clone();
    let idx = header_index(&headers);

    let title_idx = require_column(&idx, "Video Title", path)?;
    let video_idx = require_column(&idx, "External Video ID", path)?;
    let country_idx = require_column(&idx, "Country Code", path)?;
    let subscribed_idx = require_column(&idx, "Is Subscribed", path)?;
    let views_idx = require_column(&idx, "Views", path)?;

    let opt = |name: &str, idx: &HashMap<String, usize>| idx.get(&normalize_header_name(name)).copied();
    let likes_idx = opt("Video Likes Added", &idx);
    let dislikes_idx = opt("Video Dislikes Added", &idx);
    let subs_added_idx = opt("User Subscriptions Added", &idx);
    let subs_removed_idx = opt("User Subscriptions Removed", &idx);
    let view_pct_idx = opt("Average View Percentage", &idx);
    let watch_time_idx = opt("Average Watch Time", &idx);
    let comments_idx = opt("User Comments Added", &idx);

    let mut rows = Vec::new();
    for (row_i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("invalid csv row {} in {}", row_i + 1, path.display()))?;
        let parsed = (|| -> Result<CountryBreakdownRow> {
            Ok(CountryBreakdownRow {
                video_title: field(&rec, title_idx).to_string(),
                video: field(&rec, video_idx).to_string(),
                country_code: field(&rec, country_idx).to_string(),
                is_subscribed: parse_bool(field(&rec, subscribed_idx))?,
                views: parse_number(field(&rec, views_idx))?,
                likes: optional_number(&rec, likes_idx)?,
                dislikes: optional_number(&rec, dislikes_idx)?,
                subscriptions_added: optional_number(&rec, subs_added_idx)?,
                subscriptions_removed: optional_number(&rec, subs_removed_idx)?,
                average_view_pct: optional_number(&rec, view_pct_idx)?,
                average_watch_time: optional_number(&rec, watch_time_idx)?,
                comments_added: optional_number(&rec, comments_idx)?,
            })
        })()
        .with_context(|| format!("{}: row {}", path.display(), row_i + 1))?;
        rows.push(parsed);
    }

    report.rows = rows.len() as u64;
    Ok((rows, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_flags() {
        assert!(parse_bool("True").unwrap());
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("False").unwrap());
        assert!(!parse_bool("").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}

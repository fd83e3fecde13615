//! CSV loading for the three channel exports.
//!
//! Each table is read once per process and never mutated afterwards; every
//! derived table elsewhere in the crate is a copy.

pub mod country;
pub mod time_series;
pub mod video;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::Config;
use crate::logging::{self, obj, v_num, v_str, Domain, ProfileScope};

pub use country::{load_country_breakdown, CountryBreakdownRow, COUNTRY_REQUIRED_COLUMNS};
pub use time_series::{load_time_series, TimeSeriesRow, TIME_SERIES_REQUIRED_COLUMNS};
pub use video::{load_video_metrics, VideoMetricsRow, VIDEO_COLUMNS};

const MAX_WARNINGS: usize = 50;

/// What happened while reading one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadReport {
    pub path: String,
    pub hash_sha256: String,
    pub rows: u64,
    pub skipped_rows: u64,
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.display().to_string(),
            hash_sha256: file_sha256(path)?,
            ..Self::default()
        })
    }

    pub fn skip(&mut self, warning: String) {
        self.skipped_rows += 1;
        if self.warnings.len() < MAX_WARNINGS {
            self.warnings.push(warning);
        }
    }

    fn log(&self, table: &str) {
        logging::info(
            Domain::Load,
            "table_loaded",
            obj(&[
                ("path", v_str(&self.path)),
                ("table", v_str(table)),
                ("rows", v_num(self.rows as f64)),
                ("skipped_rows", v_num(self.skipped_rows as f64)),
                ("sha256", v_str(&self.hash_sha256)),
            ]),
        );
        if self.skipped_rows > 0 {
            logging::warn(
                Domain::Load,
                "rows_skipped",
                obj(&[
                    ("path", v_str(&self.path)),
                    ("count", v_num(self.skipped_rows as f64)),
                    (
                        "first",
                        self.warnings.first().map(|w| v_str(w)).unwrap_or_default(),
                    ),
                ]),
            );
        }
    }
}

/// The three source tables, loaded together.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub videos: Vec<VideoMetricsRow>,
    pub countries: Vec<CountryBreakdownRow>,
    pub time_series: Vec<TimeSeriesRow>,
    pub reports: Vec<LoadReport>,
}

impl Dataset {
    pub fn video(&self, id: &str) -> Option<&VideoMetricsRow> {
        self.videos.iter().find(|v| v.video == id)
    }
}

pub fn load_dataset(cfg: &Config) -> Result<Dataset> {
    let _scope = ProfileScope::with_context(
        "load_dataset",
        &[("data_dir", v_str(&cfg.data_dir.display().to_string()))],
    );

    let (videos, video_report) = load_video_metrics(&cfg.video_path())?;
    video_report.log("video");
    let (countries, country_report) = load_country_breakdown(&cfg.country_path())?;
    country_report.log("country");
    let (time_series, time_report) = load_time_series(&cfg.time_series_path())?;
    time_report.log("time_series");

    Ok(Dataset {
        videos,
        countries,
        time_series,
        reports: vec![video_report, country_report, time_report],
    })
}

// =============================================================================
// Schema checks
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub expected: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
    pub message: String,
}

/// Check that every expected column is present in the header.
///
/// Matching is by normalized name, so `Is Subscribed` and `is_subscribed`
/// are the same column.
pub fn validate_schema(path: &Path, expected: &[&str]) -> Result<SchemaReport> {
    let header = read_header(path)?;
    let present: Vec<String> = header.iter().map(|h| normalize_header_name(h)).collect();
    let missing: Vec<String> = expected
        .iter()
        .filter(|e| !present.contains(&normalize_header_name(e)))
        .map(|e| e.to_string())
        .collect();
    let ok = missing.is_empty();
    let message = if ok {
        "schema ok".to_string()
    } else {
        format!("schema mismatch: missing {:?}", missing)
    };
    Ok(SchemaReport {
        columns: header,
        expected: expected.iter().map(|s| s.to_string()).collect(),
        missing,
        ok,
        message,
    })
}

/// Check only the column count, for files whose columns are renamed by position.
pub fn validate_column_count(path: &Path, expected: &[&str]) -> Result<SchemaReport> {
    let header = read_header(path)?;
    let ok = header.len() >= expected.len();
    let missing = if ok {
        Vec::new()
    } else {
        expected[header.len()..].iter().map(|s| s.to_string()).collect()
    };
    let message = if ok {
        "schema ok".to_string()
    } else {
        format!("expected {} columns, got {}", expected.len(), header.len())
    };
    Ok(SchemaReport {
        columns: header,
        expected: expected.iter().map(|s| s.to_string()).collect(),
        missing,
        ok,
        message,
    })
}

pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let mut rdr = csv_reader(path)?;
    let headers = rdr
        .headers()
        .with_context(|| format!("invalid csv header in {}", path.display()))?;
    Ok(headers.iter().map(|h| h.to_string()).collect())
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("cannot read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// =============================================================================
// Shared parsing helpers
// =============================================================================

pub(crate) fn csv_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

/// Lowercase, with every run of non-alphanumerics collapsed to `_`.
pub fn normalize_header_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_sep = false;
    for ch in input.trim().trim_start_matches('\u{feff}').chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}

/// Map of normalized header name to column index.
pub(crate) fn header_index(headers: &csv::StringRecord) -> HashMap<String, usize> {
    let mut idx = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        idx.entry(normalize_header_name(h)).or_insert(i);
    }
    idx
}

pub(crate) fn require_column(
    idx: &HashMap<String, usize>,
    name: &str,
    path: &Path,
) -> Result<usize> {
    idx.get(&normalize_header_name(name))
        .copied()
        .with_context(|| format!("{} is missing required column {:?}", path.display(), name))
}

/// Numeric cell. Empty cells read as zero, thousands separators are ignored.
pub(crate) fn parse_number(raw: &str) -> Result<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    cleaned
        .parse::<f64>()
        .with_context(|| format!("not a number: {:?}", raw))
}

pub(crate) fn field<'a>(rec: &'a csv::StringRecord, i: usize) -> &'a str {
    rec.get(i).unwrap_or("")
}

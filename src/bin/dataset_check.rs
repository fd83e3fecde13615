//! Validate the three CSV exports and print a JSON report.
//!
//! Exit codes: 1 unreadable file, 2 schema mismatch, 3 load failure.
//! Load progress is logged to stdout as well; run with `LOG_LEVEL=warn` to
//! keep stdout to the report.

use serde_json::json;
use std::path::Path;

use vidmetrics::config::Config;
use vidmetrics::data::{
    load_dataset, validate_column_count, validate_schema, SchemaReport, COUNTRY_REQUIRED_COLUMNS,
    TIME_SERIES_REQUIRED_COLUMNS, VIDEO_COLUMNS,
};

fn check(path: &Path, schema: anyhow::Result<SchemaReport>) -> SchemaReport {
    match schema {
        Ok(s) => s,
        Err(err) => {
            eprintln!("schema check failed for {}: {:#}", path.display(), err);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cfg = Config::from_env();

    let video_path = cfg.video_path();
    let country_path = cfg.country_path();
    let time_path = cfg.time_series_path();

    let schemas = [
        (&video_path, check(&video_path, validate_column_count(&video_path, &VIDEO_COLUMNS))),
        (&country_path, check(&country_path, validate_schema(&country_path, &COUNTRY_REQUIRED_COLUMNS))),
        (&time_path, check(&time_path, validate_schema(&time_path, &TIME_SERIES_REQUIRED_COLUMNS))),
    ];

    let mut mismatched = false;
    for (path, schema) in &schemas {
        if !schema.ok {
            eprintln!("{}: {}", path.display(), schema.message);
            mismatched = true;
        }
    }
    if mismatched {
        std::process::exit(2);
    }

    let dataset = match load_dataset(&cfg) {
        Ok(d) => d,
        Err(err) => {
            eprintln!("load failed: {:#}", err);
            std::process::exit(3);
        }
    };

    let payload = json!({
        "schemas": schemas.iter().map(|(_, s)| s).collect::<Vec<_>>(),
        "reports": dataset.reports,
        "videos": dataset.videos.len(),
        "country_rows": dataset.countries.len(),
        "time_series_rows": dataset.time_series.len(),
    });
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(err) => {
            eprintln!("failed to encode report: {}", err);
            std::process::exit(3);
        }
    }
}

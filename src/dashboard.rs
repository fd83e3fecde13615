//! Load-once state shared by every request.

use anyhow::Result;

use crate::breakdown::{resolve_title, video_breakdown, VideoBreakdown};
use crate::config::Config;
use crate::data::{load_dataset, Dataset, VideoMetricsRow};
use crate::features::{normalize, NormalizedTable};
use crate::logging::{self, obj, v_num, Domain};
use crate::summary::{compute_tiles, MetricTile};
use crate::timeline::{baseline_bands, video_curve, CurvePoint, ViewBands};

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub config: Config,
    pub dataset: Dataset,
    pub normalized: NormalizedTable,
    pub bands: ViewBands,
}

impl Dashboard {
    pub fn load(config: Config) -> Result<Self> {
        let dataset = load_dataset(&config)?;
        Ok(Self::from_dataset(config, dataset))
    }

    pub fn from_dataset(config: Config, dataset: Dataset) -> Self {
        let normalized = normalize(&dataset.videos, config.long_window_months);
        let bands = baseline_bands(
            &dataset.time_series,
            &dataset.videos,
            config.long_window_months,
            config.curve_days,
        );
        logging::info(
            Domain::Derive,
            "dashboard_ready",
            obj(&[
                ("videos", v_num(dataset.videos.len() as f64)),
                ("country_rows", v_num(dataset.countries.len() as f64)),
                ("time_series_rows", v_num(dataset.time_series.len() as f64)),
                ("band_points", v_num(bands.points.len() as f64)),
            ]),
        );
        Self {
            config,
            dataset,
            normalized,
            bands,
        }
    }

    pub fn tiles(&self) -> Vec<MetricTile> {
        compute_tiles(
            &self.dataset.videos,
            self.config.short_window_months,
            self.config.long_window_months,
        )
    }

    /// Titles in table order (newest first).
    pub fn titles(&self) -> Vec<&str> {
        self.dataset.videos.iter().map(|v| v.title.as_str()).collect()
    }

    pub fn find_by_title(&self, title: &str) -> Option<&VideoMetricsRow> {
        resolve_title(&self.dataset.videos, title)
    }

    pub fn breakdown(&self, video_id: &str) -> Option<VideoBreakdown> {
        video_breakdown(&self.dataset, video_id)
    }

    pub fn curve(&self, video_id: &str) -> Vec<CurvePoint> {
        video_curve(
            &self.dataset.time_series,
            &self.dataset.videos,
            video_id,
            self.config.curve_days,
        )
    }
}

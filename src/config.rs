use std::path::PathBuf;

pub const VIDEO_CSV: &str = "Aggregated_Metrics_By_Video.csv";
pub const COUNTRY_CSV: &str = "Aggregated_Metrics_By_Country_And_Subscriber_Status.csv";
pub const TIME_SERIES_CSV: &str = "Video_Performance_Over_Time.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub video_csv: String,
    pub country_csv: String,
    pub time_series_csv: String,
    pub bind_addr: String,
    pub port: u16,
    pub short_window_months: u32,
    pub long_window_months: u32,
    pub curve_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            video_csv: VIDEO_CSV.to_string(),
            country_csv: COUNTRY_CSV.to_string(),
            time_series_csv: TIME_SERIES_CSV.to_string(),
            bind_addr: "127.0.0.1".to_string(),
            port: 8501,
            short_window_months: 6,
            long_window_months: 12,
            curve_days: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            data_dir: std::env::var("DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            video_csv: std::env::var("AGG_VIDEO_CSV").unwrap_or(d.video_csv),
            country_csv: std::env::var("AGG_COUNTRY_CSV").unwrap_or(d.country_csv),
            time_series_csv: std::env::var("TIME_SERIES_CSV").unwrap_or(d.time_series_csv),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(d.bind_addr),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.port),
            short_window_months: std::env::var("SHORT_WINDOW_MONTHS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.short_window_months),
            long_window_months: std::env::var("LONG_WINDOW_MONTHS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.long_window_months),
            curve_days: std::env::var("CURVE_DAYS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.curve_days),
        }
    }

    /// Config rooted at `dir` with every other field at its default.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn video_path(&self) -> PathBuf {
        self.data_dir.join(&self.video_csv)
    }

    pub fn country_path(&self) -> PathBuf {
        self.data_dir.join(&self.country_csv)
    }

    pub fn time_series_path(&self) -> PathBuf {
        self.data_dir.join(&self.time_series_csv)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_join_data_dir() {
        let cfg = Config::with_data_dir("/tmp/yt");
        assert_eq!(cfg.video_path(), PathBuf::from("/tmp/yt").join(VIDEO_CSV));
        assert_eq!(cfg.country_path(), PathBuf::from("/tmp/yt").join(COUNTRY_CSV));
        assert_eq!(cfg.time_series_path(), PathBuf::from("/tmp/yt").join(TIME_SERIES_CSV));
        assert_eq!(cfg.listen_addr(), "127.0.0.1:8501");
    }

    #[test]
    fn default_windows() {
        let cfg = Config::default();
        assert_eq!(cfg.short_window_months, 6);
        assert_eq!(cfg.long_window_months, 12);
        assert_eq!(cfg.curve_days, 30);
    }
}

//! Runtime configuration utilities for insider-pulse.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::Context;

use crate::data::normalize::ShareFields;

pub const DEFAULT_FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_UNIVERSE_CSV_URL: &str =
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/master/data/constituents.csv";

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Financial Modeling Prep API key; empty disables the provider.
    pub fmp_api_key: String,
    /// Free-tier mode caps per-ticker calls and prefers Yahoo for market data.
    pub fmp_free_tier: bool,
    pub fmp_base_url: String,
    pub yahoo_base_url: String,
    pub universe_csv_url: String,
    /// Root folder for the cached dashboard snapshot.
    pub data_dir: PathBuf,
    /// Explicit path to the `insider-engine` binary.
    pub engine_bin: Option<PathBuf>,
    pub engine_timeout: Duration,
    pub std_threshold: f64,
    pub baseline_days: i64,
    pub current_days: i64,
    pub min_baseline_points: usize,
    pub cache_max_age: Duration,
    pub refresh_debounce: Duration,
    /// Vendor field names tried, in order, for a transaction's share count.
    pub share_fields: ShareFields,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fmp_api_key: String::new(),
            fmp_free_tier: false,
            fmp_base_url: DEFAULT_FMP_BASE_URL.to_string(),
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            universe_csv_url: DEFAULT_UNIVERSE_CSV_URL.to_string(),
            data_dir: PathBuf::from("./data"),
            engine_bin: None,
            engine_timeout: Duration::from_secs(20),
            std_threshold: 2.0,
            baseline_days: 365,
            current_days: 30,
            min_baseline_points: 5,
            cache_max_age: Duration::from_secs(24 * 60 * 60),
            refresh_debounce: Duration::from_secs(5 * 60),
            share_fields: ShareFields::default(),
        }
    }
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let data_dir = env::var("VIBES_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        std::fs::create_dir_all(&data_dir).context("creating data dir")?;

        let share_fields = env::var("INSIDER_SHARE_FIELDS")
            .ok()
            .map(|raw| ShareFields::parse(&raw))
            .filter(|fields| !fields.is_empty())
            .unwrap_or(defaults.share_fields);

        Ok(Self {
            fmp_api_key: var_trimmed("FMP_API_KEY").unwrap_or_default(),
            fmp_free_tier: flag("FMP_FREE_TIER"),
            fmp_base_url: var_trimmed("FMP_BASE_URL").unwrap_or(defaults.fmp_base_url),
            yahoo_base_url: var_trimmed("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            universe_csv_url: var_trimmed("UNIVERSE_CSV_URL")
                .unwrap_or(defaults.universe_csv_url),
            data_dir,
            engine_bin: var_trimmed("VIBES_ANOMALY_BIN").map(PathBuf::from),
            engine_timeout: parsed::<u64>("ENGINE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.engine_timeout),
            std_threshold: parsed("ANOMALY_STD_THRESHOLD").unwrap_or(defaults.std_threshold),
            baseline_days: parsed("BASELINE_DAYS").unwrap_or(defaults.baseline_days),
            current_days: parsed("CURRENT_WINDOW_DAYS").unwrap_or(defaults.current_days),
            min_baseline_points: parsed("MIN_BASELINE_POINTS")
                .unwrap_or(defaults.min_baseline_points),
            cache_max_age: parsed::<u64>("CACHE_MAX_AGE_HOURS")
                .map(|hours| Duration::from_secs(hours * 60 * 60))
                .unwrap_or(defaults.cache_max_age),
            refresh_debounce: parsed::<u64>("REFRESH_DEBOUNCE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_debounce),
            share_fields,
        })
    }

    pub fn has_fmp_key(&self) -> bool {
        !self.fmp_api_key.is_empty()
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.join_data("dashboard_cache.json")
    }
}

fn var_trimmed(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    var_trimmed(key).and_then(|v| v.parse().ok())
}

fn flag(key: &str) -> bool {
    matches!(
        var_trimmed(key).map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

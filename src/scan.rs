//! One-shot insider-selling scan over the ticker universe.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    config::Settings,
    data::{
        aggregate::{Aggregator, TICKER_PACING},
        fmp::FmpClient,
        universe::UniverseClient,
        UniverseSource,
    },
    error::{ProviderError, ScanError},
    models::{parse_day, AnomalySignal},
    signals::{AnomalyParams, EngineSelector},
};

pub const MAX_SCAN_TICKERS: usize = 600;
pub const FREE_TIER_SCAN_LIMIT: usize = 25;

/// Caller-supplied scan knobs; anything missing falls back to configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub limit: Option<usize>,
    pub baseline_days: Option<i64>,
    pub current_days: Option<i64>,
    pub std_threshold: Option<f64>,
    pub as_of: Option<String>,
}

/// Validated scan parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    /// `None` scans the whole universe; a requested limit of 0 means the same.
    pub limit: Option<usize>,
    pub anomaly: AnomalyParams,
}

impl ScanRequest {
    /// Clamp every knob into its accepted range.
    pub fn resolve(&self, settings: &Settings, today: NaiveDate) -> ScanParams {
        let as_of = match self.as_of.as_deref().map(str::trim) {
            None | Some("") => today,
            Some(raw) => parse_day(raw).unwrap_or_else(|| {
                warn!(as_of = raw, "invalid as_of; using today");
                today
            }),
        };
        let threshold = self
            .std_threshold
            .filter(|t| t.is_finite())
            .unwrap_or(settings.std_threshold);
        let limit = match self.limit {
            Some(0) => None,
            Some(limit) => Some(limit.min(MAX_SCAN_TICKERS)),
            None if settings.fmp_free_tier => Some(FREE_TIER_SCAN_LIMIT),
            None => None,
        };

        ScanParams {
            limit,
            anomaly: AnomalyParams::new(
                self.baseline_days.unwrap_or(settings.baseline_days),
                self.current_days.unwrap_or(settings.current_days),
                threshold,
                as_of,
            )
            .with_min_baseline_points(settings.min_baseline_points)
            .clamped(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportParams {
    pub baseline_days: i64,
    pub current_days: i64,
    pub std_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub tickers_count: usize,
    pub records_count: usize,
    pub anomalies_count: usize,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub as_of: NaiveDate,
    pub params: ReportParams,
    pub anomalies: Vec<AnomalySignal>,
    pub all_signals: Vec<AnomalySignal>,
}

pub struct Scanner {
    universe: Arc<dyn UniverseSource>,
    insiders: Aggregator,
    engines: EngineSelector,
}

impl Scanner {
    pub fn new(universe: Arc<dyn UniverseSource>, insiders: Aggregator, engines: EngineSelector) -> Self {
        Self {
            universe,
            insiders,
            engines,
        }
    }

    /// Production wiring: S&P 500 CSV universe and FMP disclosures.
    pub fn from_settings(settings: &Settings, engines: EngineSelector) -> Result<Self, ProviderError> {
        let universe = Arc::new(UniverseClient::new(settings.universe_csv_url.clone())?);
        let fmp = Arc::new(FmpClient::from_settings(settings)?);
        Ok(Self::new(
            universe,
            Aggregator::for_source(fmp, settings.fmp_free_tier).with_pacing(TICKER_PACING),
            engines,
        ))
    }

    /// Aggregate sells over both windows and score every ticker.
    #[instrument(skip(self), fields(as_of = %params.anomaly.as_of))]
    pub async fn run_scan(&self, params: &ScanParams) -> Result<ScanReport, ScanError> {
        let companies = self
            .universe
            .companies()
            .await
            .map_err(|err| ScanError::Universe(err.to_string()))?;
        if companies.is_empty() {
            return Err(ScanError::Universe("universe is empty".to_string()));
        }
        let mut tickers: Vec<String> = companies.into_iter().map(|c| c.symbol).collect();
        if let Some(limit) = params.limit {
            tickers.truncate(limit);
        }

        let anomaly = &params.anomaly;
        let date_to = anomaly.as_of;
        let date_from = date_to - ChronoDuration::days(anomaly.baseline_days + anomaly.current_days);
        let records = self.insiders.aggregate(&tickers, date_from, date_to).await;
        let all_signals = self.engines.compute_signals(&records, anomaly).await;
        let anomalies: Vec<AnomalySignal> =
            all_signals.iter().filter(|s| s.is_anomaly).cloned().collect();

        info!(
            tickers = tickers.len(),
            records = records.len(),
            anomalies = anomalies.len(),
            "scan complete"
        );
        Ok(ScanReport {
            tickers_count: tickers.len(),
            records_count: records.len(),
            anomalies_count: anomalies.len(),
            date_from,
            date_to,
            as_of: anomaly.as_of,
            params: ReportParams {
                baseline_days: anomaly.baseline_days,
                current_days: anomaly.current_days,
                std_threshold: anomaly.std_threshold,
            },
            anomalies,
            all_signals,
        })
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

//! Signal computation layer: anomaly scoring, quarterly trends and engine selection.
//!
//! Two interchangeable implementations exist. The reference engine
//! ([`anomaly`], [`trend`]) is always available and acts as the correctness
//! oracle. The accelerated engine ([`columnar`]) ships as the `insider-engine`
//! binary and is reached through [`process::ProcessEngine`]. [`EngineSelector`]
//! prefers the accelerated engine and falls back per call.

pub mod anomaly;
pub mod columnar;
pub mod process;
pub mod protocol;
pub mod trend;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::EngineError,
    models::{lenient_date, AnomalySignal, InsiderSellRecord, QuarterlyTrend},
};

pub const DEFAULT_MIN_BASELINE_POINTS: usize = 5;
pub const DEFAULT_STD_THRESHOLD: f64 = 2.0;

pub const BASELINE_DAYS_RANGE: (i64, i64) = (30, 730);
pub const CURRENT_DAYS_RANGE: (i64, i64) = (7, 90);
pub const THRESHOLD_RANGE: (f64, f64) = (1.0, 5.0);

pub fn clamp_baseline_days(days: i64) -> i64 {
    days.clamp(BASELINE_DAYS_RANGE.0, BASELINE_DAYS_RANGE.1)
}

pub fn clamp_current_days(days: i64) -> i64 {
    days.clamp(CURRENT_DAYS_RANGE.0, CURRENT_DAYS_RANGE.1)
}

/// Threshold forced into range; NaN and infinities become the default.
pub fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_finite() {
        threshold.clamp(THRESHOLD_RANGE.0, THRESHOLD_RANGE.1)
    } else {
        DEFAULT_STD_THRESHOLD
    }
}

fn default_min_baseline_points() -> usize {
    DEFAULT_MIN_BASELINE_POINTS
}

/// Window and threshold parameters for one anomaly computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyParams {
    pub baseline_days: i64,
    pub current_days: i64,
    pub std_threshold: f64,
    #[serde(default = "default_min_baseline_points")]
    pub min_baseline_points: usize,
    #[serde(deserialize_with = "lenient_date")]
    pub as_of: NaiveDate,
}

impl AnomalyParams {
    pub fn new(baseline_days: i64, current_days: i64, std_threshold: f64, as_of: NaiveDate) -> Self {
        Self {
            baseline_days,
            current_days,
            std_threshold,
            min_baseline_points: DEFAULT_MIN_BASELINE_POINTS,
            as_of,
        }
    }

    pub fn with_min_baseline_points(mut self, points: usize) -> Self {
        self.min_baseline_points = points;
        self
    }

    /// Window lengths and threshold pulled into their accepted ranges.
    pub fn clamped(self) -> Self {
        Self {
            baseline_days: clamp_baseline_days(self.baseline_days),
            current_days: clamp_current_days(self.current_days),
            std_threshold: clamp_threshold(self.std_threshold),
            ..self
        }
    }
}

/// A statistics engine able to score anomalies and estimate trends.
#[async_trait]
pub trait SignalEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn anomaly_signals(
        &self,
        records: &[InsiderSellRecord],
        params: &AnomalyParams,
    ) -> Result<Vec<AnomalySignal>, EngineError>;

    async fn quarterly_trend(&self, closes: &[f64]) -> Result<Option<QuarterlyTrend>, EngineError>;
}

/// In-process reference implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

#[async_trait]
impl SignalEngine for ReferenceEngine {
    fn name(&self) -> &'static str {
        "reference"
    }

    async fn anomaly_signals(
        &self,
        records: &[InsiderSellRecord],
        params: &AnomalyParams,
    ) -> Result<Vec<AnomalySignal>, EngineError> {
        Ok(anomaly::compute_signals(records, params))
    }

    async fn quarterly_trend(&self, closes: &[f64]) -> Result<Option<QuarterlyTrend>, EngineError> {
        Ok(trend::from_closes(closes))
    }
}

/// In-process accelerated implementation; the binary serves the same code.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarEngine;

#[async_trait]
impl SignalEngine for ColumnarEngine {
    fn name(&self) -> &'static str {
        "columnar"
    }

    async fn anomaly_signals(
        &self,
        records: &[InsiderSellRecord],
        params: &AnomalyParams,
    ) -> Result<Vec<AnomalySignal>, EngineError> {
        Ok(columnar::compute_signals(records, params))
    }

    async fn quarterly_trend(&self, closes: &[f64]) -> Result<Option<QuarterlyTrend>, EngineError> {
        Ok(columnar::from_closes(closes))
    }
}

/// Prefers the accelerated engine, falling back to the reference per call.
#[derive(Clone)]
pub struct EngineSelector {
    accelerated: Option<Arc<dyn SignalEngine>>,
}

impl EngineSelector {
    pub fn reference_only() -> Self {
        Self { accelerated: None }
    }

    pub fn with_accelerated(engine: Arc<dyn SignalEngine>) -> Self {
        Self {
            accelerated: Some(engine),
        }
    }

    /// Look for the engine binary once; the result holds for the process lifetime.
    pub fn detect(settings: &Settings) -> Self {
        match process::locate_engine(settings.engine_bin.as_deref()) {
            Some(path) => {
                let engine = process::ProcessEngine::new(path, settings.engine_timeout);
                info!(path = %engine.path().display(), "accelerated engine available");
                Self::with_accelerated(Arc::new(engine))
            }
            None => {
                info!("accelerated engine not found; using reference engine");
                Self::reference_only()
            }
        }
    }

    pub fn accelerated_name(&self) -> Option<&'static str> {
        self.accelerated.as_ref().map(|engine| engine.name())
    }

    /// Anomaly signals from the preferred engine. Never fails.
    pub async fn compute_signals(
        &self,
        records: &[InsiderSellRecord],
        params: &AnomalyParams,
    ) -> Vec<AnomalySignal> {
        if let Some(engine) = &self.accelerated {
            match engine.anomaly_signals(records, params).await {
                Ok(signals) if !signals.is_empty() => return signals,
                Ok(_) => debug!(engine = engine.name(), "no signals; using reference engine"),
                Err(err) => {
                    warn!(engine = engine.name(), %err, "accelerated engine failed; using reference")
                }
            }
        }
        anomaly::compute_signals(records, params)
    }

    /// Quarterly trend from the preferred engine. Never fails.
    pub async fn quarterly_trend(&self, closes: &[f64]) -> Option<QuarterlyTrend> {
        if let Some(engine) = &self.accelerated {
            match engine.quarterly_trend(closes).await {
                Ok(result) => return result,
                Err(err) => {
                    warn!(engine = engine.name(), %err, "accelerated trend failed; using reference")
                }
            }
        }
        trend::from_closes(closes)
    }
}

impl Default for EngineSelector {
    fn default() -> Self {
        Self::reference_only()
    }
}

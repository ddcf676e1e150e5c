use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{Duration as Days, NaiveDate};
use insider_pulse::{
    error::EngineError,
    models::{AnomalySignal, InsiderSellRecord, QuarterlyTrend},
    signals::{
        anomaly, columnar,
        process::{locate_engine, ProcessEngine},
        trend, AnomalyParams, EngineSelector, SignalEngine,
    },
};
use proptest::prelude::*;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
}

fn arb_records() -> impl Strategy<Value = Vec<InsiderSellRecord>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["AAPL", "msft", "NVDA", "ko", "XOM"]),
            0i64..140,
            1.0f64..50_000.0,
        ),
        0..200,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(ticker, back, shares)| {
                InsiderSellRecord::new(ticker, as_of() - Days::days(back), shares, "test")
            })
            .collect()
    })
}

fn assert_same_signals(reference: &[AnomalySignal], columnar: &[AnomalySignal]) {
    assert_eq!(reference.len(), columnar.len());
    for (a, b) in reference.iter().zip(columnar) {
        assert_eq!(a.ticker, b.ticker);
        assert_eq!(a.is_anomaly, b.is_anomaly, "{}", a.ticker);
        assert!((a.z_score - b.z_score).abs() <= 0.01, "{}: {} vs {}", a.ticker, a.z_score, b.z_score);
        assert!((a.current_shares_sold - b.current_shares_sold).abs() < 1e-6);
    }
}

proptest! {
    #[test]
    fn columnar_matches_reference(
        records in arb_records(),
        baseline_days in 30i64..120,
        current_days in 7i64..30,
        threshold in 1.0f64..5.0,
        min_points in 0usize..8,
    ) {
        let params = AnomalyParams::new(baseline_days, current_days, threshold, as_of())
            .with_min_baseline_points(min_points);
        let reference = anomaly::compute_signals(&records, &params);
        let fast = columnar::compute_signals(&records, &params);
        assert_same_signals(&reference, &fast);
    }

    #[test]
    fn trend_implementations_agree(closes in prop::collection::vec(-5.0f64..500.0, 0..200)) {
        let reference = trend::from_closes(&closes);
        let fast = columnar::from_closes(&closes);
        prop_assert_eq!(reference.is_some(), fast.is_some());
        if let (Some(a), Some(b)) = (reference, fast) {
            prop_assert!((a.quarter_pct - b.quarter_pct).abs() < 1e-9);
            prop_assert!((a.slope - b.slope).abs() < 1e-6 * (1.0 + a.slope.abs()));
            prop_assert_eq!(a.last, b.last);
        }
    }
}

#[test]
fn empty_input_yields_no_signals() {
    let params = AnomalyParams::new(365, 30, 2.0, as_of());
    assert!(anomaly::compute_signals(&[], &params).is_empty());
    assert!(columnar::compute_signals(&[], &params).is_empty());
}

struct Broken;

#[async_trait]
impl SignalEngine for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn anomaly_signals(
        &self,
        _records: &[InsiderSellRecord],
        _params: &AnomalyParams,
    ) -> Result<Vec<AnomalySignal>, EngineError> {
        Err(EngineError::Timeout(Duration::from_secs(1)))
    }

    async fn quarterly_trend(&self, _closes: &[f64]) -> Result<Option<QuarterlyTrend>, EngineError> {
        Err(EngineError::Unavailable)
    }
}

struct Silent;

#[async_trait]
impl SignalEngine for Silent {
    fn name(&self) -> &'static str {
        "silent"
    }

    async fn anomaly_signals(
        &self,
        _records: &[InsiderSellRecord],
        _params: &AnomalyParams,
    ) -> Result<Vec<AnomalySignal>, EngineError> {
        Ok(Vec::new())
    }

    async fn quarterly_trend(&self, _closes: &[f64]) -> Result<Option<QuarterlyTrend>, EngineError> {
        Ok(None)
    }
}

fn sample_records() -> Vec<InsiderSellRecord> {
    (0..40)
        .map(|i| InsiderSellRecord::new("AAPL", as_of() - Days::days(i * 3), 100.0 + i as f64, "test"))
        .collect()
}

#[tokio::test]
async fn selector_falls_back_when_engine_errors() {
    let params = AnomalyParams::new(365, 30, 2.0, as_of());
    let records = sample_records();
    let selector = EngineSelector::with_accelerated(Arc::new(Broken));
    let signals = selector.compute_signals(&records, &params).await;
    assert_eq!(signals, anomaly::compute_signals(&records, &params));

    let closes: Vec<f64> = (1..=40).map(f64::from).collect();
    assert_eq!(selector.quarterly_trend(&closes).await, trend::from_closes(&closes));
}

#[tokio::test]
async fn selector_falls_back_when_engine_returns_nothing() {
    let params = AnomalyParams::new(365, 30, 2.0, as_of());
    let records = sample_records();
    let selector = EngineSelector::with_accelerated(Arc::new(Silent));
    let signals = selector.compute_signals(&records, &params).await;
    assert_eq!(signals.len(), 1);
}

#[tokio::test]
async fn missing_engine_binary_is_recovered() {
    let engine = ProcessEngine::new("/nonexistent/insider-engine".into(), Duration::from_secs(2));
    let params = AnomalyParams::new(365, 30, 2.0, as_of());
    let err = engine.anomaly_signals(&sample_records(), &params).await.unwrap_err();
    assert!(matches!(err, EngineError::Spawn { .. }));

    let selector = EngineSelector::with_accelerated(Arc::new(engine));
    assert_eq!(selector.compute_signals(&sample_records(), &params).await.len(), 1);
}

#[test]
fn relative_engine_path_is_ignored() {
    let located = locate_engine(Some(Path::new("relative/insider-engine")));
    assert_ne!(located.as_deref(), Some(Path::new("relative/insider-engine")));
}

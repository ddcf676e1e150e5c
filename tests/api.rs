mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use insider_pulse::{
    api::{router, AppState},
    config::Settings,
    dashboard::{
        cache::DashboardCache, service::DashboardService, BuildSettings, MarketSnapshotBuilder,
    },
    data::{aggregate::Aggregator, InsiderSource, MarketSource},
    scan::Scanner,
    signals::EngineSelector,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use common::{company, day, snapshot, Behaviour, ScriptedInsiders, ScriptedMarket, StaticUniverse};

struct Harness {
    _dir: TempDir,
    cache: DashboardCache,
    app: Router,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let cache = DashboardCache::new(dir.path().join("dashboard.json"), Duration::from_secs(3600));
    let settings = Settings::default();
    let universe = Arc::new(StaticUniverse(vec![
        company("AAPL", "Information Technology"),
        company("XOM", "Energy"),
    ]));
    let insiders = || {
        let source: Arc<dyn InsiderSource> = Arc::new(ScriptedInsiders::new(Vec::new(), Vec::new()));
        Aggregator::new(vec![source])
    };
    let market: Arc<dyn MarketSource> =
        Arc::new(ScriptedMarket::new(insider_pulse::models::Source::Yahoo, Behaviour::Serve));

    let builder = MarketSnapshotBuilder::new(
        universe.clone(),
        None,
        market,
        insiders(),
        EngineSelector::reference_only(),
        BuildSettings::from_settings(&settings).unpaced(),
    );
    let dashboard = DashboardService::new(cache.clone(), Arc::new(builder), Duration::from_secs(300));
    let scanner = Scanner::new(universe, insiders(), EngineSelector::reference_only());

    let state = AppState {
        settings: Arc::new(settings),
        dashboard: Arc::new(dashboard),
        scanner: Arc::new(scanner),
    };
    Harness {
        _dir: dir,
        cache,
        app: router(state),
    }
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let served_from = response
        .headers()
        .get("x-served-from")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, served_from, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness();
    let (status, _, body) = call(&h.app, "GET", "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn bad_dashboard_queries_are_rejected() {
    let h = harness();
    for uri in [
        "/api/dashboard?limit=abc",
        "/api/dashboard?limit=601",
        "/api/dashboard?limit=-1",
        "/api/dashboard?sector=Crypto",
    ] {
        let (status, _, body) = call(&h.app, "GET", uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn sector_filter_builds_on_demand() {
    let h = harness();
    let (status, served_from, body) = call(&h.app, "GET", "/api/dashboard?sector=energy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served_from.as_deref(), Some("on-demand"));
    assert_eq!(body["total_companies"], 1);
    assert_eq!(body["sectors"][0]["name"], "Energy");
    assert!(h.cache.read(true).is_none());
}

#[tokio::test]
async fn empty_cache_reports_preparing() {
    let h = harness();
    let (status, served_from, body) = call(&h.app, "GET", "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert!(served_from.is_none());
    assert_eq!(
        body["error"],
        "Data is being prepared. Check back in a few minutes."
    );
    assert_eq!(body["sectors"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn fresh_cache_is_served_with_meta() {
    let h = harness();
    let stamp = h.cache.write_at(&snapshot(day(2024, 6, 28)), Utc::now()).unwrap();

    let (status, served_from, body) = call(&h.app, "GET", "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served_from.as_deref(), Some("cache"));
    assert_eq!(body["as_of"], "2024-06-28");
    assert!(body["_cached_at"].is_string());

    let (_, _, meta) = call(&h.app, "GET", "/api/dashboard/meta").await;
    let last: chrono::DateTime<Utc> = serde_json::from_value(meta["last_updated"].clone()).unwrap();
    assert_eq!(last, stamp);
}

#[tokio::test]
async fn meta_is_null_without_cache() {
    let h = harness();
    let (_, _, meta) = call(&h.app, "GET", "/api/dashboard/meta").await;
    assert!(meta["last_updated"].is_null());
}

#[tokio::test]
async fn refresh_returns_immediately() {
    let h = harness();
    let (status, _, body) = call(&h.app, "POST", "/api/dashboard/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "refresh started");
}

#[tokio::test]
async fn scan_clamps_parameters() {
    let h = harness();
    let (status, _, body) = call(
        &h.app,
        "POST",
        "/api/scan?baseline_days=5&current_days=500&std_threshold=9&as_of=2024-06-30&limit=0",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tickers_count"], 2);
    assert_eq!(body["params"]["baseline_days"], 30);
    assert_eq!(body["params"]["current_days"], 90);
    assert_eq!(body["params"]["std_threshold"], 5.0);
    assert_eq!(body["as_of"], "2024-06-30");
    assert_eq!(body["date_from"], "2024-03-02");
}

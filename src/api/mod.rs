//! HTTP layer exposing the dashboard, scans and health.

pub mod routes;
pub mod types;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    config::Settings, dashboard::service::DashboardService, scan::Scanner,
    signals::EngineSelector,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub dashboard: Arc<DashboardService>,
    pub scanner: Arc<Scanner>,
}

impl AppState {
    /// Detect the engine once and wire the dashboard and scanner from `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        if !settings.has_fmp_key() {
            warn!("FMP_API_KEY is not set; insider data will be empty");
        }
        let engines = EngineSelector::detect(&settings);
        info!(
            engine = engines.accelerated_name().unwrap_or("reference"),
            "signal engine selected"
        );
        let dashboard = DashboardService::from_settings(&settings, engines.clone())?;
        let scanner = Scanner::from_settings(&settings, engines)?;
        Ok(Self {
            settings: Arc::new(settings),
            dashboard: Arc::new(dashboard),
            scanner: Arc::new(scanner),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/dashboard", get(routes::dashboard))
        .route("/api/dashboard/refresh", post(routes::refresh))
        .route("/api/dashboard/meta", get(routes::meta))
        .route("/api/scan", post(routes::scan))
        .route("/api/health", get(routes::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(settings: Settings, host: String, port: u16) -> Result<()> {
    let state = AppState::from_settings(settings)?;

    let service = Arc::clone(&state.dashboard);
    tokio::spawn(async move {
        if let Some(outcome) = service.startup_refresh().await {
            info!(?outcome, "startup refresh finished");
        }
    });

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, "serving insider-pulse API");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

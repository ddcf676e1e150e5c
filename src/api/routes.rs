//! HTTP route handlers for Axum.

use axum::{
    extract::{Query, State},
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::{
    api::types::{DashboardQuery, ErrorBody, MetaBody, PreparingBody, StatusBody},
    dashboard::service::DashboardView,
    data::universe::is_known_sector,
    scan::{today, ScanRequest, MAX_SCAN_TICKERS},
};

use super::AppState;

pub const SERVED_FROM: HeaderName = HeaderName::from_static("x-served-from");

/// Row cap for a sector-only on-demand build.
const DEFAULT_ON_DEMAND_LIMIT: usize = 50;

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Cached dashboard, or a filtered on-demand build when `sector`/`limit` is given.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let sector = query
        .sector
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let limit = match query.limit.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => 0,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n <= MAX_SCAN_TICKERS => n,
            _ => {
                return error(
                    StatusCode::BAD_REQUEST,
                    format!("limit must be an integer between 0 and {MAX_SCAN_TICKERS}"),
                )
            }
        },
    };
    if let Some(sector) = &sector {
        if !is_known_sector(sector) {
            return error(StatusCode::BAD_REQUEST, format!("unknown sector: {sector:?}"));
        }
    }

    if sector.is_some() || limit > 0 {
        let limit = if limit == 0 { DEFAULT_ON_DEMAND_LIMIT } else { limit };
        return match state.dashboard.on_demand(sector, Some(limit)).await {
            Ok(snapshot) => ([(SERVED_FROM, "on-demand")], Json(snapshot)).into_response(),
            Err(err) => {
                warn!(%err, "on-demand dashboard build failed");
                error(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
        };
    }

    match state.dashboard.dashboard() {
        DashboardView::Cached(snapshot) => ([(SERVED_FROM, "cache")], Json(snapshot)).into_response(),
        DashboardView::Preparing => Json(PreparingBody::default()).into_response(),
    }
}

pub async fn refresh(State(state): State<AppState>) -> Json<StatusBody> {
    let status = match state.dashboard.trigger_refresh() {
        Some(_) => "refresh started",
        None => "refresh already running",
    };
    Json(StatusBody {
        status: status.to_string(),
    })
}

pub async fn meta(State(state): State<AppState>) -> Json<MetaBody> {
    Json(MetaBody {
        last_updated: state.dashboard.last_updated(),
    })
}

pub async fn scan(State(state): State<AppState>, Query(request): Query<ScanRequest>) -> Response {
    let params = request.resolve(&state.settings, today());
    match state.scanner.run_scan(&params).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => {
            warn!(%err, "scan failed");
            error(StatusCode::BAD_GATEWAY, err.to_string())
        }
    }
}

pub async fn health() -> Json<StatusBody> {
    Json(StatusBody {
        status: "ok".to_string(),
    })
}

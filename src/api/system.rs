//! Service-level endpoints: welcome payload, health checks and metrics.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, HealthReadinessChecks, HealthReadyResponse, HealthResponse,
    WelcomeResponse,
};
use crate::db::AccountStore;

/// `GET /`
pub async fn root(State(state): State<Arc<AppState>>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to ValidS API",
        docs: format!("{}/docs", state.config.server.api_prefix),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /health`
///
/// Liveness only; does not touch the account store.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// `GET /health/ready`
///
/// Pings the account store. 503 while it is unreachable.
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let database = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            false
        }
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(HealthReadyResponse {
            ready: database,
            uptime_seconds: state.start_time.elapsed().as_secs(),
            checks: HealthReadinessChecks {
                database,
                backend: state.store.backend_name(),
            },
        })),
    )
        .into_response()
}

/// `GET /metrics`
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    state
        .prometheus_handle
        .as_ref()
        .map(metrics_exporter_prometheus::PrometheusHandle::render)
        .ok_or_else(|| ApiError::NotFound("Metrics are not enabled".to_string()))
}

pub async fn fallback(uri: Uri) -> ApiError {
    ApiError::not_found("Route", uri.path())
}

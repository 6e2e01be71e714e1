use axum::{Router, http::HeaderValue, middleware, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;

mod error;
mod observability;
mod system;
mod types;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,

    pub config: Arc<Config>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

pub fn create_app_state(
    store: Store,
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        store,
        config: Arc::new(config),
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

/// Connects the configured store and wraps it in a fresh [`AppState`].
pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::connect(&config.database).await?;
    Ok(create_app_state(store, config, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = &state.config.server.cors_allowed_origins;

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/health/ready", get(system::health_ready))
        .route("/metrics", get(system::metrics))
        .fallback(system::fallback)
        .with_state(state)
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

// HTTP routes configuration
// Author: storecache contributors

use super::handlers::{health_handler, intercept_handler, message_handler, metrics_handler, status_handler};
use crate::config::AppConfig;
use crate::error::Result;
use crate::worker::CacheManager;
use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Path prefix reserved for the proxy's own endpoints. Everything else is
/// intercepted.
pub const CONTROL_PREFIX: &str = "/__storecache";

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub manager: Arc<CacheManager>,
}

pub fn create_router(config: AppConfig, manager: Arc<CacheManager>) -> Result<Router> {
    let body_limit = config.server.body_limit_bytes;
    let state = AppState { config, manager };

    let app = Router::new()
        .route(&format!("{}/health", CONTROL_PREFIX), get(health_handler))
        .route(&format!("{}/metrics", CONTROL_PREFIX), get(metrics_handler))
        .route(&format!("{}/status", CONTROL_PREFIX), get(status_handler))
        .route(&format!("{}/message", CONTROL_PREFIX), post(message_handler))
        .fallback(intercept_handler)
        .layer(tower_http::limit::RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state);

    Ok(app)
}

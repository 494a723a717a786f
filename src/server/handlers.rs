// HTTP request handlers
// Author: storecache contributors

use super::routes::AppState;
use crate::error::{ProxyError, Result};
use crate::metrics::gather_metrics;
use crate::models::{FetchRequest, FetchResponse};
use crate::network::is_hop_by_hop;
use crate::worker::{FetchDecision, MessageOutcome, ResponseSource, WorkerState, WorkerStatus};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Header naming where a response served by the cache manager came from.
pub const SOURCE_HEADER: &str = "x-storecache-source";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    // Active generation
    let generation_check = match state.manager.active() {
        Some(generation) if generation.state() == WorkerState::Activated => HealthCheck {
            status: "ok".to_string(),
            message: format!("Generation {} active", generation.version()),
        },
        _ => {
            overall_status = HealthStatus::Degraded;
            HealthCheck {
                status: "warning".to_string(),
                message: "No active generation, requests pass through".to_string(),
            }
        }
    };
    checks.insert("generation".to_string(), generation_check);

    // Cache storage
    let storage_check = match state.manager.storage().keys().await {
        Ok(keys) => HealthCheck {
            status: "ok".to_string(),
            message: format!("{} stores", keys.len()),
        },
        Err(e) => {
            overall_status = HealthStatus::Unhealthy;
            HealthCheck {
                status: "error".to_string(),
                message: e.to_string(),
            }
        }
    };
    checks.insert("storage".to_string(), storage_check);

    // Configuration
    let config_check = HealthCheck {
        status: "ok".to_string(),
        message: format!("Origin: {}", state.config.origin.base_url),
    };
    checks.insert("configuration".to_string(), config_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

pub async fn status_handler(State(state): State<AppState>) -> Result<Json<WorkerStatus>> {
    Ok(Json(state.manager.status().await?))
}

/// Control channel: the page posts `{"type": "SKIP_WAITING"}` here.
pub async fn message_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<MessageOutcome>> {
    let payload: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
        ProxyError::InvalidRequest(format!("control message is not JSON: {}", e))
    })?;

    let outcome = state.manager.message(&payload).await;
    debug!("Control message handled: {:?}", outcome);
    Ok(Json(outcome))
}

/// Every request outside the control routes: hand it to the cache
/// manager, or forward it when the manager does not intercept it.
pub async fn intercept_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.config.server.body_limit_bytes)
        .await
        .map_err(|e| ProxyError::InvalidRequest(format!("Failed to read request body: {}", e)))?;

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let request = FetchRequest::from_http(parts.method.as_str(), url, headers, body);

    match state.manager.fetch(request.clone()).await? {
        FetchDecision::Respond { route, served } => {
            if served.response.is_network_error() {
                warn!("{} unavailable via {}", request.url, route.as_str());
                return Err(ProxyError::Network(format!("{} is unavailable", request.url)));
            }
            to_http_response(served.response, Some(served.source))
        }
        FetchDecision::Passthrough(reason) => {
            debug!("Passing {} {} through ({})", request.method, request.url, reason.as_str());
            let response = state.manager.passthrough(&request, reason).await?;
            to_http_response(response, None)
        }
    }
}

fn to_http_response(response: FetchResponse, source: Option<ResponseSource>) -> Result<Response> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|_| ProxyError::Internal(format!("invalid upstream status {}", response.status)))?;

    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        if !is_hop_by_hop(name) {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    if let Some(source) = source {
        builder = builder.header(SOURCE_HEADER, source.as_str());
    }

    builder
        .body(Body::from(response.body))
        .map_err(|e| ProxyError::Internal(format!("Failed to build response: {}", e)))
}

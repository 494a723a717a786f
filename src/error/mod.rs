// Error types for the storecache proxy
// Author: storecache contributors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Invalid lifecycle transition: {from} -> {to}")]
    Lifecycle { from: &'static str, to: &'static str },

    #[error("No generation is {0}")]
    NoGeneration(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Convert ProxyError to HTTP responses for Axum
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ProxyError::Network(_) | ProxyError::Http(_) => {
                (StatusCode::BAD_GATEWAY, "network_error", self.to_string())
            }
            ProxyError::InvalidRequest(_) | ProxyError::Json(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error", self.to_string())
            }
            ProxyError::Config(_) | ProxyError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", self.to_string())
            }
            ProxyError::Lifecycle { .. } | ProxyError::NoGeneration(_) => {
                (StatusCode::CONFLICT, "lifecycle_error", self.to_string())
            }
            ProxyError::Storage(_) | ProxyError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", self.to_string())
            }
            ProxyError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "api_error", self.to_string())
            }
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

//! Gateway Error Types
//!
//! One taxonomy for everything that can terminate a request, plus the
//! mapping from each variant to its HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// The rate-limit dimension that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDimension {
    Minute,
    Day,
}

impl fmt::Display for LimitDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitDimension::Minute => write!(f, "minute"),
            LimitDimension::Day => write!(f, "day"),
        }
    }
}

/// Main error type for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration errors (invalid JSON, bad timezone, missing fields)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or unknown API key
    #[error("Invalid or missing API key")]
    Unauthorized,

    /// A per-minute or per-day quota was exhausted
    #[error("Rate limit exceeded (per {0})")]
    RateLimited(LimitDimension),

    /// Request body was structurally unusable
    #[error("{0}")]
    BadRequest(String),

    /// No registered provider serves the requested model
    #[error("Requested model '{0}' not available")]
    ModelNotAvailable(String),

    /// Every compatible provider was tried and none returned success
    #[error("Unable to process request with any available provider")]
    ProvidersExhausted,

    /// A single provider failed where no failover applies
    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// HTTP request to a provider failed at the transport level
    #[error("Request failed: {0}")]
    Request(String),

    /// Mid-stream relay failure
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Key store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// The HTTP status this error surfaces as.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            // The public surface collapses all routing failures to 400.
            GatewayError::BadRequest(_)
            | GatewayError::ModelNotAvailable(_)
            | GatewayError::ProvidersExhausted => StatusCode::BAD_REQUEST,
            GatewayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::Request(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Config(_)
            | GatewayError::Stream(_)
            | GatewayError::Store(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Request(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            GatewayError::Request(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            GatewayError::Request(format!("Failed to decode response: {}", err))
        } else {
            GatewayError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Config(format!("IO error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

//! Error types for the proxy
//!
//! Every failure that can reach an HTTP client is a [`ProxyError`]. Handlers
//! return `Result<_, ProxyError>` and rely on the [`IntoResponse`] impl to
//! render the `{"error": "..."}` body with the right status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Result alias used throughout the crate
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Errors surfaced by the proxy
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProxyError {
    /// A required query parameter is missing or malformed
    #[error("{0}")]
    Validation(String),

    /// The outbound request could not be completed
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The upstream server answered with a non-success status
    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    /// Anything unexpected while extracting content
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Shorthand for a missing query parameter
    pub fn missing_param(name: &str) -> Self {
        Self::Validation(format!("missing required query parameter `{}`", name))
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_)
            | ProxyError::UpstreamStatus(_)
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable label, used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Validation(_) => "validation",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::UpstreamStatus(_) => "upstream_status",
            ProxyError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ProxyError::UpstreamStatus(status.as_u16())
        } else {
            ProxyError::Upstream(err.to_string())
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Human-readable description
    pub error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(kind = self.kind(), "request failed: {}", self);
        } else {
            warn!(kind = self.kind(), "request rejected: {}", self);
        }
        counter!("proxy_errors_total", "kind" => self.kind()).increment(1);

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

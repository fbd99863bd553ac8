//! HTTP handlers for the proxy
//!
//! # Modules
//!
//! - [`search`] - `GET /search`, DuckDuckGo result extraction
//! - [`fetch`] - `GET /fetch`, main content extraction for any page
//! - [`index`] - `GET /`, human-readable usage page
//!
//! # Example
//!
//! ```rust,no_run
//! use ddg_proxy::config::ProxyConfig;
//! use ddg_proxy::crawler::WebCrawler;
//! use ddg_proxy::handlers::{build_router, AppState};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let crawler = WebCrawler::from_config(ProxyConfig::default())?;
//!     let app = build_router(Arc::new(AppState::new(crawler)));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8787").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod fetch;
pub mod index;
pub mod search;

use std::sync::Arc;

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::cors::{cors_layer, preflight};
use crate::crawler::WebCrawler;
use crate::tracing_middleware::{request_tracing_layer, RequestIdLayer};

pub use fetch::{fetch_handler, validate_url, ContentResponse, FetchParams};
pub use index::index_handler;
pub use search::{parse_max_results, search_handler, SearchParams, SearchResponse};

/// State shared by all handlers
pub struct AppState {
    /// Performs searches and fetches
    pub crawler: WebCrawler,
}

impl AppState {
    /// Wrap a crawler
    pub fn new(crawler: WebCrawler) -> Self {
        Self { crawler }
    }
}

/// Answer unknown paths: `204` for `OPTIONS`, `404` otherwise
pub async fn not_found(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Not Found").into_response()
    }
}

/// First value of `name` in a raw query string, percent-decoded
///
/// Repeated keys keep their first value, so parsing never rejects a
/// request.
pub fn query_value(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}


/// Build the application router with CORS and request tracing
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler).options(preflight))
        .route("/search", get(search_handler).options(preflight))
        .route("/fetch", get(fetch_handler).options(preflight))
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer())
        .layer(request_tracing_layer())
        .layer(RequestIdLayer::new())
}

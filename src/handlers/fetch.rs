//! `GET /fetch` handler
//!
//! Downloads a page and returns its main content as plain text.
//!
//! # Errors
//!
//! - `400 Bad Request` - `url` missing, malformed, not http(s) or without a host
//! - `500 Internal Server Error` - the page could not be fetched (network
//!   failure or non-2xx status)

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::{query_value, AppState};
use crate::error::{ProxyError, ProxyResult};

/// Query parameters of `/fetch`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    /// Page to fetch
    pub url: Option<String>,
}

impl FetchParams {
    /// Read the parameters from a raw query string
    pub fn from_query(query: Option<&str>) -> Self {
        Self {
            url: query_value(query, "url"),
        }
    }
}

/// Response body of `/fetch`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentResponse {
    /// The URL as requested
    pub url: String,
    /// Extracted main content
    pub content: String,
    /// Length of `content` in characters
    pub length: usize,
}

/// Validate a URL string
pub fn validate_url(url_str: &str) -> ProxyResult<Url> {
    if url_str.is_empty() {
        return Err(ProxyError::missing_param("url"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| ProxyError::Validation(format!("invalid URL: {}", e)))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ProxyError::Validation(format!(
                "invalid URL scheme '{}': only http and https are allowed",
                scheme
            )));
        }
    }

    if url.host().is_none() {
        return Err(ProxyError::Validation("URL must have a host".to_string()));
    }

    Ok(url)
}

/// Handle `GET /fetch?url=<page>`
#[instrument(skip_all)]
pub async fn fetch_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> ProxyResult<Json<ContentResponse>> {
    let url = FetchParams::from_query(raw.as_deref())
        .url
        .ok_or_else(|| ProxyError::missing_param("url"))?;
    let validated = validate_url(&url)?;
    debug!("URL validated: {}", validated);

    let extracted = state.crawler.fetch_content(validated.as_str()).await?;
    let length = extracted.text.chars().count();

    Ok(Json(ContentResponse {
        url,
        content: extracted.text,
        length,
    }))
}

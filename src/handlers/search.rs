//! `GET /search` handler
//!
//! Forwards the query to DuckDuckGo and returns the extracted results.
//!
//! # Errors
//!
//! - `400 Bad Request` - `query` missing or empty
//!
//! Upstream failures are not errors: the endpoint answers `200` with an
//! empty result list.

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{query_value, AppState};
use crate::error::{ProxyError, ProxyResult};
use crate::extraction::SearchResult;

/// Query parameters of `/search`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Search terms
    pub query: Option<String>,
    /// Maximum number of results, kept as text so bad values fall back to
    /// the default instead of rejecting the request
    pub max_results: Option<String>,
}

impl SearchParams {
    /// Read the parameters from a raw query string
    pub fn from_query(query: Option<&str>) -> Self {
        Self {
            query: query_value(query, "query"),
            max_results: query_value(query, "max_results"),
        }
    }
}

/// Response body of `/search`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResponse {
    /// Results in page order
    pub results: Vec<SearchResult>,
    /// Number of results
    pub count: usize,
}

/// Interpret the `max_results` parameter
///
/// Missing or unparseable values give `default`; negative values give 0.
pub fn parse_max_results(raw: Option<&str>, default: usize) -> usize {
    match raw.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(value)) => usize::try_from(value).unwrap_or(0),
        Some(Err(_)) | None => default,
    }
}

/// Handle `GET /search?query=<terms>&max_results=<n>`
#[instrument(skip_all)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> ProxyResult<Json<SearchResponse>> {
    let params = SearchParams::from_query(raw.as_deref());
    let query = params
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ProxyError::missing_param("query"))?;

    let max_results = parse_max_results(
        params.max_results.as_deref(),
        state.crawler.config().default_max_results,
    );
    debug!("Searching for {:?} with max_results={}", query, max_results);

    let results = state.crawler.search(query, max_results).await;

    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}

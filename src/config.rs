//! Proxy configuration
//!
//! [`ProxyConfig`] gathers every tunable of the proxy in one place. The binary
//! fills it from command-line arguments (which fall back to `PROXY_*`
//! environment variables); library users and tests build it with
//! [`ProxyConfig::default`] and the `with_*` builder methods.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extraction::content::MAX_CONTENT_CHARS;

/// DuckDuckGo's JavaScript-free results endpoint
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html";

/// User agent sent with search requests
pub const DEFAULT_SEARCH_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// User agent sent when fetching arbitrary pages
pub const DEFAULT_FETCH_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Default search operations admitted per minute
pub const DEFAULT_SEARCH_RPM: u32 = 30;

/// Default page fetches admitted per minute
pub const DEFAULT_FETCH_RPM: u32 = 20;

/// Default number of search results when `max_results` is absent
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Runtime configuration for the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Search operations admitted per rolling minute
    pub search_requests_per_minute: u32,

    /// Page fetches admitted per rolling minute
    pub fetch_requests_per_minute: u32,

    /// URL the search form is POSTed to
    pub search_endpoint: String,

    /// User agent for search requests
    pub search_user_agent: String,

    /// User agent for page fetches
    pub fetch_user_agent: String,

    /// Upper bound on a single outbound request (`None` = wait forever)
    pub fetch_timeout: Option<Duration>,

    /// Maximum characters of extracted page content
    pub max_content_chars: usize,

    /// Result count used when the caller gives none
    pub default_max_results: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            search_requests_per_minute: DEFAULT_SEARCH_RPM,
            fetch_requests_per_minute: DEFAULT_FETCH_RPM,
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            search_user_agent: DEFAULT_SEARCH_USER_AGENT.to_string(),
            fetch_user_agent: DEFAULT_FETCH_USER_AGENT.to_string(),
            fetch_timeout: Some(Duration::from_secs(30)),
            max_content_chars: MAX_CONTENT_CHARS,
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl ProxyConfig {
    /// Set the bind address
    pub fn with_bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the per-minute search limit
    pub fn with_search_rate(mut self, requests_per_minute: u32) -> Self {
        self.search_requests_per_minute = requests_per_minute;
        self
    }

    /// Set the per-minute fetch limit
    pub fn with_fetch_rate(mut self, requests_per_minute: u32) -> Self {
        self.fetch_requests_per_minute = requests_per_minute;
        self
    }

    /// Point searches at a different endpoint
    pub fn with_search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = endpoint.into();
        self
    }

    /// Set or clear the outbound request timeout
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

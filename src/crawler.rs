//! Search and fetch orchestration
//!
//! [`WebCrawler`] owns everything a request needs beyond its parameters: the
//! outbound [`Fetcher`], one [`RateLimiter`] per operation kind and the two
//! extractors. Handlers share a single instance through `Arc`.
//!
//! ```text
//! search(query) ──▶ search limiter ──▶ POST results page ──▶ SearchResultExtractor
//! fetch(url)    ──▶ fetch limiter  ──▶ GET page          ──▶ MainContentExtractor
//! ```

use std::sync::Arc;

use metrics::{counter, histogram};
use tracing::{info, instrument, warn};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::extraction::{ExtractedContent, MainContentExtractor, SearchResult, SearchResultExtractor};
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::upstream::{FetchRequest, Fetcher, HttpFetcher};

/// Performs rate limited searches and page fetches
pub struct WebCrawler {
    fetcher: Arc<dyn Fetcher>,
    search_limiter: RateLimiter,
    fetch_limiter: RateLimiter,
    search_extractor: SearchResultExtractor,
    content_extractor: MainContentExtractor,
    config: ProxyConfig,
}

impl WebCrawler {
    /// Create a crawler using `fetcher` for all outbound requests
    pub fn new(config: ProxyConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            search_limiter: RateLimiter::named(
                "search",
                RateLimitConfig::new(config.search_requests_per_minute),
            ),
            fetch_limiter: RateLimiter::named(
                "fetch",
                RateLimitConfig::new(config.fetch_requests_per_minute),
            ),
            search_extractor: SearchResultExtractor::new(),
            content_extractor: MainContentExtractor::with_max_chars(config.max_content_chars),
            config,
        }
    }

    /// Create a crawler with a `reqwest` backed fetcher
    pub fn from_config(config: ProxyConfig) -> ProxyResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Search DuckDuckGo, returning an empty list on any failure
    ///
    /// Search is best effort: upstream and network errors are logged and
    /// never reach the caller.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        counter!("search_requests_total").increment(1);

        match self.try_search(query, max_results).await {
            Ok(results) => {
                info!("Found {} results for {:?}", results.len(), query);
                results
            }
            Err(e) => {
                warn!("Search for {:?} failed: {}", query, e);
                counter!("search_failures_total", "kind" => e.kind()).increment(1);
                Vec::new()
            }
        }
    }

    /// Search DuckDuckGo, surfacing failures
    #[instrument(skip(self))]
    pub async fn try_search(&self, query: &str, max_results: usize) -> ProxyResult<Vec<SearchResult>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        self.search_limiter.acquire().await;
        info!("Searching DuckDuckGo for {:?}", query);

        let request = FetchRequest::post_form(
            self.config.search_endpoint.as_str(),
            [("q", query), ("b", ""), ("kl", "")],
        )
        .header("User-Agent", self.config.search_user_agent.as_str());

        let response = self.fetcher.fetch(request).await?;
        if !response.is_success() {
            return Err(ProxyError::UpstreamStatus(response.status));
        }

        Ok(self.search_extractor.extract(&response.body, max_results))
    }

    /// Fetch `url` and extract its main content
    #[instrument(skip(self))]
    pub async fn fetch_content(&self, url: &str) -> ProxyResult<ExtractedContent> {
        counter!("fetch_requests_total").increment(1);

        self.fetch_limiter.acquire().await;
        info!("Fetching {}", url);

        let request =
            FetchRequest::get(url).header("User-Agent", self.config.fetch_user_agent.as_str());

        let response = match self.fetcher.fetch(request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => return Err(self.fetch_failed(ProxyError::UpstreamStatus(response.status))),
            Err(e) => return Err(self.fetch_failed(e)),
        };

        let content = self.content_extractor.extract(&response.body);
        let length = content.text.chars().count();
        histogram!("fetch_content_length_chars").record(length as f64);
        info!("Extracted {} chars from {}", length, url);

        Ok(content)
    }

    fn fetch_failed(&self, error: ProxyError) -> ProxyError {
        counter!("fetch_errors_total", "kind" => error.kind()).increment(1);
        error
    }

    /// Rate limiter guarding searches
    pub fn search_limiter(&self) -> &RateLimiter {
        &self.search_limiter
    }

    /// Rate limiter guarding page fetches
    pub fn fetch_limiter(&self) -> &RateLimiter {
        &self.fetch_limiter
    }

    /// Configuration in use
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

//! DDG Proxy - Rate-limited web search and content extraction over HTTP
//!
//! This crate provides a small HTTP service that fronts DuckDuckGo's HTML
//! search page and arbitrary web pages, returning clean JSON for agents and
//! scripts.
//!
//! # Features
//!
//! - **Search**: `GET /search` posts the query to DuckDuckGo and extracts
//!   titles, links and snippets, skipping ads and unwrapping redirect links
//! - **Fetch**: `GET /fetch` downloads a page and extracts its main content
//!   as structured plain text, truncated to a fixed budget
//! - **Rate Limiting**: Independent sliding-window limiters per upstream;
//!   callers over the limit wait instead of failing
//! - **CORS**: Permissive cross-origin access for browser clients
//! - **Request Tracing**: Request IDs and JSON/pretty logging
//! - **Graceful Shutdown**: In-flight requests finish on SIGTERM/Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! Client ──▶ Router (/search, /fetch, /)
//!                  │
//!                  ▼
//!            ┌──────────────┐
//!            │  WebCrawler  │
//!            └──────┬───────┘
//!          ┌────────┴────────┐
//!          ▼                 ▼
//!   ┌─────────────┐   ┌─────────────┐
//!   │ RateLimiter │   │ RateLimiter │
//!   │  (search)   │   │   (fetch)   │
//!   └──────┬──────┘   └──────┬──────┘
//!          ▼                 ▼
//!      DuckDuckGo        Any page
//!          │                 │
//!          ▼                 ▼
//!   SearchResult-      MainContent-
//!     Extractor         Extractor
//!          │                 │
//!          └──────┬──────────┘
//!                 ▼
//!           TextSanitizer
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ddg_proxy::{ProxyConfig, WebCrawler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let crawler = WebCrawler::from_config(ProxyConfig::default())?;
//!
//!     for result in crawler.search("rust async", 5).await {
//!         println!("{}. {} <{}>", result.position, result.title, result.link);
//!     }
//!
//!     let page = crawler.fetch_content("https://example.com").await?;
//!     println!("{}", page.text);
//!     Ok(())
//! }
//! ```
//!
//! # Content Processing Example
//!
//! ```rust
//! use ddg_proxy::processing::TextSanitizer;
//!
//! let html = r#"<html><script>evil();</script><p>Hello &amp; world!</p></html>"#;
//! let text = TextSanitizer::shared().render_structured(html);
//!
//! assert!(text.contains("Hello & world!"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod cors;
pub mod crawler;
pub mod error;
pub mod extraction;
pub mod handlers;
pub mod processing;
pub mod rate_limit;
pub mod shutdown;
pub mod tracing_middleware;
pub mod upstream;

// Re-exports for convenience
pub use config::ProxyConfig;
pub use cors::cors_layer;
pub use crawler::WebCrawler;
pub use error::{ErrorBody, ProxyError, ProxyResult};
pub use extraction::{
    ExtractedContent, MainContentExtractor, SearchResult, SearchResultExtractor,
};
pub use handlers::{build_router, AppState};
pub use processing::TextSanitizer;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use shutdown::{shutdown_signal, ShutdownController};
pub use tracing_middleware::{
    init_tracing, init_tracing_with, request_tracing_layer, LogFormat, RequestId, RequestIdLayer,
};
pub use upstream::{FetchRequest, FetchResponse, Fetcher, HttpFetcher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! DDG Proxy server
//!
//! Rate-limited DuckDuckGo search and page content extraction over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ddg_proxy::{
    build_router,
    config::{DEFAULT_FETCH_RPM, DEFAULT_SEARCH_RPM},
    shutdown::shutdown_signal_with_controller,
    tracing_middleware::{init_tracing, init_tracing_with, LogFormat},
    AppState, ProxyConfig, ShutdownController, WebCrawler,
};

/// DDG Proxy server
#[derive(Parser, Debug)]
#[command(name = "ddg-proxy")]
#[command(version)]
#[command(about = "DDG Proxy - rate-limited web search and content extraction")]
#[command(long_about = r#"DDG Proxy - rate-limited web search and content extraction

Serves three endpoints:
  GET /search?query=<terms>&max_results=<n>   DuckDuckGo results as JSON
  GET /fetch?url=<page>                       Main page content as JSON
  GET /                                       Usage page

Each upstream has its own sliding one-minute rate limit. Requests over the
limit wait for capacity instead of failing.

EXAMPLES:
  # Start server on default port
  ddg-proxy

  # Custom port, stricter search limit, verbose logging
  ddg-proxy --port 9000 --search-rpm 10 --verbose
"#)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PROXY_PORT", default_value = "8787")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, env = "PROXY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Searches admitted per rolling minute
    #[arg(long, env = "PROXY_SEARCH_RPM", default_value_t = DEFAULT_SEARCH_RPM)]
    search_rpm: u32,

    /// Page fetches admitted per rolling minute
    #[arg(long, env = "PROXY_FETCH_RPM", default_value_t = DEFAULT_FETCH_RPM)]
    fetch_rpm: u32,

    /// Outbound request timeout in seconds (0 disables the timeout)
    #[arg(long, env = "PROXY_FETCH_TIMEOUT_SECS", default_value = "30")]
    fetch_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> ProxyConfig {
        let timeout = (self.fetch_timeout_secs > 0)
            .then(|| Duration::from_secs(self.fetch_timeout_secs));

        ProxyConfig::default()
            .with_bind(self.host, self.port)
            .with_search_rate(self.search_rpm)
            .with_fetch_rate(self.fetch_rpm)
            .with_fetch_timeout(timeout)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        init_tracing_with(LogFormat::from_env(), Some("debug"));
    } else {
        init_tracing();
    }

    let config = args.into_config();
    tracing::info!(
        search_rpm = config.search_requests_per_minute,
        fetch_rpm = config.fetch_requests_per_minute,
        "DDG Proxy starting on {}:{}",
        config.host,
        config.port
    );

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

    let crawler = WebCrawler::from_config(config).context("failed to build HTTP client")?;
    let app = build_router(Arc::new(AppState::new(crawler)));

    tracing::info!("Listening on {}", listener.local_addr()?);

    let controller = ShutdownController::new();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal_with_controller(controller))
    .await
    .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

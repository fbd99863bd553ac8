//! Request tracing and log initialisation
//!
//! - Request ID generation and propagation (`X-Request-ID`)
//! - A `tower-http` trace layer whose spans carry the request ID and an
//!   anonymised client IP
//! - Subscriber setup with JSON, pretty or compact output
//!
//! ```text
//! Request ──> RequestIdLayer ──> TraceLayer ──> CorsLayer ──> Handler
//!                  │                  │
//!                  ▼                  ▼
//!           X-Request-ID       Structured Logs
//! ```

use std::{
    fmt,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use axum::{
    extract::ConnectInfo,
    http::{header::HeaderName, HeaderValue, Request, Response},
};
use tower::{Layer, Service};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{MakeSpan, OnRequest, OnResponse, TraceLayer},
};
use tracing::{info_span, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Header carrying the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Environment variable selecting the log format
pub const LOG_FORMAT_ENV: &str = "PROXY_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info,tower_http=debug,hyper=info";

// ============================================================================
// Request ID
// ============================================================================

/// A unique identifier for a request
#[derive(Clone, Debug)]
pub struct RequestId(Arc<str>);

impl RequestId {
    /// Generate a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    /// Use an ID supplied by the client
    pub fn from_string<S: Into<String>>(id: S) -> Self {
        Self(id.into().into())
    }

    /// Get the request ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layer that attaches a [`RequestId`] to every request and echoes it on
/// the response
#[derive(Clone, Debug)]
pub struct RequestIdLayer {
    header_name: HeaderName,
}

impl RequestIdLayer {
    /// Use the `X-Request-ID` header
    pub fn new() -> Self {
        Self {
            header_name: HeaderName::from_static(REQUEST_ID_HEADER),
        }
    }
}

impl Default for RequestIdLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService {
            inner,
            header_name: self.header_name.clone(),
        }
    }
}

/// Service behind [`RequestIdLayer`]
#[derive(Clone, Debug)]
pub struct RequestIdService<S> {
    inner: S,
    header_name: HeaderName,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = RequestIdFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let request_id = request
            .headers()
            .get(&self.header_name)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(RequestId::from_string)
            .unwrap_or_default();

        request.extensions_mut().insert(request_id.clone());

        RequestIdFuture {
            future: self.inner.call(request),
            request_id,
            header_name: self.header_name.clone(),
        }
    }
}

/// Future for [`RequestIdService`]
#[pin_project::pin_project]
pub struct RequestIdFuture<F> {
    #[pin]
    future: F,
    request_id: RequestId,
    header_name: HeaderName,
}

impl<F, ResBody, E> Future for RequestIdFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let mut response = match this.future.poll(cx) {
            Poll::Ready(Ok(response)) => response,
            Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
            Poll::Pending => return Poll::Pending,
        };

        if let Ok(value) = HeaderValue::from_str(this.request_id.as_str()) {
            response
                .headers_mut()
                .insert(this.header_name.clone(), value);
        }
        Poll::Ready(Ok(response))
    }
}

// ============================================================================
// Trace layer
// ============================================================================

/// Span maker including request ID and anonymised client IP
#[derive(Clone, Debug)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map_or("unknown", RequestId::as_str);

        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| anonymize_ip(*addr))
            .unwrap_or_else(|| "unknown".to_string());

        info_span!(
            "http_request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
            client_ip = %client_ip,
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        )
    }
}

/// Drop the host part of a client address before it reaches the logs
///
/// - IPv4: last octet zeroed (192.168.1.100 -> 192.168.1.0)
/// - IPv6: all but the first three segments zeroed
fn anonymize_ip(addr: SocketAddr) -> String {
    match addr {
        SocketAddr::V4(v4) => {
            let [a, b, c, _] = v4.ip().octets();
            format!("{}.{}.{}.0", a, b, c)
        }
        SocketAddr::V6(v6) => {
            let segments = v6.ip().segments();
            format!(
                "{:x}:{:x}:{:x}:0:0:0:0:0",
                segments[0], segments[1], segments[2]
            )
        }
    }
}

/// Logs each incoming request
#[derive(Clone, Debug)]
pub struct OnRequestLog;

impl<B> OnRequest<B> for OnRequestLog {
    fn on_request(&mut self, request: &Request<B>, _span: &Span) {
        tracing::info!(
            target: "http::request",
            method = %request.method(),
            uri = %request.uri(),
            "incoming request"
        );
    }
}

/// Logs each response with its latency, at a level matching the status
#[derive(Clone, Debug, Default)]
pub struct OnResponseLog;

impl<B> OnResponse<B> for OnResponseLog {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();
        let duration_ms = latency.as_secs_f64() * 1000.0;

        span.record("status", status);
        span.record("duration_ms", duration_ms);

        if status >= 500 {
            tracing::error!(target: "http::response", status, duration_ms, "server error response");
        } else if status >= 400 {
            tracing::warn!(target: "http::response", status, duration_ms, "client error response");
        } else {
            tracing::info!(target: "http::response", status, duration_ms, "response completed");
        }
    }
}

/// The request tracing layer used by the router
pub fn request_tracing_layer(
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan, OnRequestLog, OnResponseLog>
{
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(OnRequestLog)
        .on_response(OnResponseLog)
}

// ============================================================================
// Subscriber initialisation
// ============================================================================

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-line, coloured
    #[default]
    Pretty,
    /// Single line, minimal
    Compact,
}

impl LogFormat {
    /// Read [`LOG_FORMAT_ENV`]; JSON in release builds and pretty in debug
    /// builds when unset or unrecognised
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|s| Self::parse(&s))
            .unwrap_or(if cfg!(debug_assertions) {
                LogFormat::Pretty
            } else {
                LogFormat::Json
            })
    }

    /// Parse `json`, `pretty` or `compact` (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Initialise tracing from `RUST_LOG` and [`LOG_FORMAT_ENV`]
pub fn init_tracing() {
    init_tracing_with(LogFormat::from_env(), None);
}

/// Initialise tracing with an explicit format
///
/// `level_override` replaces `RUST_LOG` when given (e.g. `"debug"` for
/// `--verbose`).
pub fn init_tracing_with(format: LogFormat, level_override: Option<&str>) {
    let filter = match level_override {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use tower::ServiceExt;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();

        assert_ne!(id1.as_str(), id2.as_str());
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::from_string("test-id-123");
        assert_eq!(id.to_string(), "test-id-123");
    }

    #[test]
    fn test_anonymize_ipv4() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)), 8080);
        assert_eq!(anonymize_ip(addr), "192.168.1.0");
    }

    #[test]
    fn test_anonymize_ipv6() {
        let addr = SocketAddr::new(
            IpAddr::V6(Ipv6Addr::new(
                0x2001, 0x0db8, 0x85a3, 0x0000, 0x0000, 0x8a2e, 0x0370, 0x7334,
            )),
            8080,
        );
        assert_eq!(anonymize_ip(addr), "2001:db8:85a3:0:0:0:0:0");
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" JSON "), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let service = RequestIdLayer::new().layer(tower::service_fn(
            |request: Request<String>| async move {
                let id = request.extensions().get::<RequestId>().unwrap().to_string();
                Ok::<_, Infallible>(Response::new(id))
            },
        ));

        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(String::new())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
        assert_eq!(response.body(), "abc-123");
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let service = RequestIdLayer::new().layer(tower::service_fn(|_: Request<String>| async {
            Ok::<_, Infallible>(Response::new(String::new()))
        }));

        let response = service
            .oneshot(Request::new(String::new()))
            .await
            .unwrap();

        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert_eq!(id.len(), 36);
    }
}

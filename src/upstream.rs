//! Outbound HTTP
//!
//! The proxy talks to the outside world through the [`Fetcher`] trait so the
//! orchestration code can be exercised without network access. The
//! production implementation, [`HttpFetcher`], is a thin wrapper around a
//! shared `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::ProxyResult;

/// HTTP method of an outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    /// Plain GET
    Get,
    /// POST with a url-encoded form body
    Post,
}

/// An outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Request method
    pub method: FetchMethod,
    /// Absolute target URL
    pub url: String,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// Form fields, sent url-encoded for POST requests
    pub form: Vec<(String, String)>,
}

impl FetchRequest {
    /// A GET request for `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: FetchMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            form: Vec::new(),
        }
    }

    /// A form POST to `url`
    pub fn post_form<K, V>(url: impl Into<String>, form: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: FetchMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            form: form.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Add a request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Value of the first header called `name` (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of an upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body decoded as text
    pub body: String,
}

impl FetchResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to perform an outbound HTTP request
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform `request` and return the response, whatever its status
    ///
    /// Only transport failures are errors; callers decide what a non-2xx
    /// status means.
    async fn fetch(&self, request: FetchRequest) -> ProxyResult<FetchResponse>;
}

/// [`Fetcher`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client following redirects, with an optional overall timeout
    pub fn new(timeout: Option<Duration>) -> ProxyResult<Self> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::limited(10));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn fetch(&self, request: FetchRequest) -> ProxyResult<FetchResponse> {
        let mut builder = match request.method {
            FetchMethod::Get => self.client.get(&request.url),
            FetchMethod::Post => self.client.post(&request.url).form(&request.form),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, body_len = body.len(), "Upstream responded");
        Ok(FetchResponse { status, body })
    }
}

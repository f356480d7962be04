//! The pluggable HTTP transport.
//!
//! # Design
//! The client never talks to the network itself. It hands an `HttpRequest`
//! to an `HttpTransport` and gets back a `RawResponse` whose body is still a
//! stream. `ReqwestTransport` is the production implementation; tests swap
//! in their own.
//!
//! A single `ReqwestTransport` is shared process-wide through
//! `default_transport()`, so every client built without an explicit
//! transport reuses one connection pool.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::{HeaderName, HeaderValue};

use crate::error::TransportError;
use crate::http::{HttpRequest, RawResponse};

/// Sends requests and returns raw responses.
///
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}

/// The shared transport used by clients built without `with_http_client`.
///
/// Built from `TransportConfig::default()`. Every call returns a handle to
/// the same instance.
pub fn default_transport() -> Arc<dyn HttpTransport> {
    static DEFAULT: OnceLock<Arc<dyn HttpTransport>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(configured_or_plain(TransportConfig::default())))
        .clone()
}

/// Falls back to a plain `reqwest::Client` if the configured one cannot be built.
fn configured_or_plain(config: TransportConfig) -> ReqwestTransport {
    ReqwestTransport::with_config(config).unwrap_or_else(|error| {
        tracing::warn!(%error, "falling back to an unconfigured HTTP client");
        ReqwestTransport::default()
    })
}

/// Settings for `ReqwestTransport::with_config`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("linepay-core/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
        }
    }
}

/// `HttpTransport` backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    pub fn with_config(config: TransportConfig) -> Result<Self, TransportError> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(TransportError::Request)?;
        Ok(Self { inner })
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self.inner.request(reqwest::Method::from(request.method), request.url);
        for (name, value) in &request.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| TransportError::Custom(Box::new(e)))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| TransportError::Custom(Box::new(e)))?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes_stream().map_err(TransportError::from);
        Ok(RawResponse::from_stream(status, headers, Box::pin(body)))
    }
}

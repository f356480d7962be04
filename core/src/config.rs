//! Client construction.
//!
//! # Design
//! `Client::new` takes an ordered list of `ClientOption`s and applies them to
//! a `ClientBuilder`, later options overriding earlier ones. The builder is
//! the only mutable stage; `build` turns it into an immutable `Client`. An
//! option that fails consumes the builder, so a half-configured client is
//! never observable.

use std::fmt;
use std::sync::Arc;

use crate::client::Client;
use crate::endpoint::{Endpoint, SANDBOX_ENDPOINT};
use crate::error::ConfigError;
use crate::transport::{default_transport, HttpTransport};

pub const ENV_CHANNEL_ID: &str = "LINEPAY_CHANNEL_ID";
pub const ENV_CHANNEL_SECRET: &str = "LINEPAY_CHANNEL_SECRET";
pub const ENV_ENDPOINT: &str = "LINEPAY_ENDPOINT";
pub const ENV_SANDBOX: &str = "LINEPAY_SANDBOX";

/// A single configuration override for `Client::new`.
#[derive(Clone)]
pub enum ClientOption {
    /// Replace the base URL.
    Endpoint(String),
    /// Replace the transport used for dispatch.
    HttpClient(Arc<dyn HttpTransport>),
}

impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientOption::Endpoint(url) => f.debug_tuple("Endpoint").field(url).finish(),
            ClientOption::HttpClient(_) => f.write_str("HttpClient(..)"),
        }
    }
}

pub fn with_endpoint(url: impl Into<String>) -> ClientOption {
    ClientOption::Endpoint(url.into())
}

pub fn with_sandbox() -> ClientOption {
    ClientOption::Endpoint(SANDBOX_ENDPOINT.to_string())
}

pub fn with_http_client(transport: Arc<dyn HttpTransport>) -> ClientOption {
    ClientOption::HttpClient(transport)
}

/// Mutable construction state for a `Client`.
pub struct ClientBuilder {
    channel_id: String,
    channel_secret: String,
    endpoint: Endpoint,
    transport: Arc<dyn HttpTransport>,
}

impl ClientBuilder {
    pub fn new(channel_id: impl Into<String>, channel_secret: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            channel_secret: channel_secret.into(),
            endpoint: Endpoint::default(),
            transport: default_transport(),
        }
    }

    pub fn apply(&mut self, option: ClientOption) -> Result<(), ConfigError> {
        match option {
            ClientOption::Endpoint(url) => self.endpoint = Endpoint::parse(&url)?,
            ClientOption::HttpClient(transport) => self.transport = transport,
        }
        Ok(())
    }

    pub fn endpoint(mut self, url: &str) -> Result<Self, ConfigError> {
        self.apply(with_endpoint(url))?;
        Ok(self)
    }

    pub fn sandbox(mut self) -> Result<Self, ConfigError> {
        self.apply(with_sandbox())?;
        Ok(self)
    }

    pub fn http_client(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn build(self) -> Client {
        Client {
            channel_id: self.channel_id,
            channel_secret: self.channel_secret,
            endpoint: self.endpoint,
            transport: self.transport,
        }
    }
}

impl Client {
    /// Build a client from credentials and options, applied in order.
    pub fn new<I>(
        channel_id: impl Into<String>,
        channel_secret: impl Into<String>,
        options: I,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = ClientOption>,
    {
        let mut builder = ClientBuilder::new(channel_id, channel_secret);
        for option in options {
            builder.apply(option)?;
        }
        Ok(builder.build())
    }

    pub fn builder(channel_id: impl Into<String>, channel_secret: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(channel_id, channel_secret)
    }

    /// Build a client from `LINEPAY_*` environment variables.
    ///
    /// `LINEPAY_ENDPOINT` takes precedence over `LINEPAY_SANDBOX`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let channel_id = lookup(ENV_CHANNEL_ID).ok_or(ConfigError::MissingVar(ENV_CHANNEL_ID))?;
        let channel_secret =
            lookup(ENV_CHANNEL_SECRET).ok_or(ConfigError::MissingVar(ENV_CHANNEL_SECRET))?;

        let mut options = Vec::new();
        let sandbox = lookup(ENV_SANDBOX)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if sandbox {
            options.push(with_sandbox());
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            options.push(with_endpoint(endpoint));
        }

        let client = Self::new(channel_id, channel_secret, options)?;
        tracing::debug!(endpoint = %client.endpoint(), "loaded client configuration from environment");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::DEFAULT_ENDPOINT;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, RawResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use url::Url;

    struct NullTransport;

    #[async_trait]
    impl HttpTransport for NullTransport {
        async fn send(&self, _request: HttpRequest) -> Result<RawResponse, TransportError> {
            Ok(RawResponse::from_bytes(204, Vec::new(), ""))
        }
    }

    fn same_transport(a: &Arc<dyn HttpTransport>, b: &Arc<dyn HttpTransport>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
    }

    #[test]
    fn new_without_options_uses_defaults() {
        let client = Client::new("testid", "testsecret", []).unwrap();
        assert_eq!(client.channel_id, "testid");
        assert_eq!(client.channel_secret, "testsecret");
        assert_eq!(client.endpoint().url(), &Url::parse(DEFAULT_ENDPOINT).unwrap());
        assert!(same_transport(client.transport(), &default_transport()));
    }

    #[test]
    fn new_with_options_overrides_endpoint_and_transport() {
        let transport: Arc<dyn HttpTransport> = Arc::new(NullTransport);
        let client = Client::new(
            "testid",
            "testsecret",
            [
                with_http_client(transport.clone()),
                with_endpoint("https://example.test/"),
            ],
        )
        .unwrap();
        assert_eq!(client.endpoint().url(), &Url::parse("https://example.test/").unwrap());
        assert!(same_transport(client.transport(), &transport));
    }

    #[test]
    fn later_options_win() {
        let client = Client::new(
            "id",
            "secret",
            [
                with_endpoint("https://first.test/"),
                with_sandbox(),
                with_endpoint("https://last.test/"),
            ],
        )
        .unwrap();
        assert_eq!(client.endpoint().url().as_str(), "https://last.test/");
    }

    #[test]
    fn later_http_client_replaces_earlier_one() {
        let first: Arc<dyn HttpTransport> = Arc::new(NullTransport);
        let last: Arc<dyn HttpTransport> = Arc::new(NullTransport);
        let client = Client::new(
            "id",
            "secret",
            [
                with_http_client(first.clone()),
                with_endpoint("https://example.test/"),
                with_http_client(last.clone()),
            ],
        )
        .unwrap();
        assert!(same_transport(client.transport(), &last));
        assert!(!same_transport(client.transport(), &first));
    }

    #[test]
    fn invalid_endpoint_fails_construction() {
        let err = Client::new(
            "id",
            "secret",
            [with_endpoint("https://ok.test/"), with_endpoint("::nope::")],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn invalid_endpoint_fails_even_when_overridden_later() {
        let err = Client::new(
            "id",
            "secret",
            [with_endpoint("::nope::"), with_endpoint("https://ok.test/")],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn builder_chain_matches_options() {
        let transport: Arc<dyn HttpTransport> = Arc::new(NullTransport);
        let client = Client::builder("id", "secret")
            .sandbox()
            .unwrap()
            .http_client(transport.clone())
            .build();
        let from_options = Client::new(
            "id",
            "secret",
            [with_sandbox(), with_http_client(transport.clone())],
        )
        .unwrap();
        assert_eq!(client.endpoint(), from_options.endpoint());
        assert_eq!(client.endpoint().url().as_str(), "https://sandbox-api-pay.line.me/");
        assert!(same_transport(client.transport(), &transport));

        assert!(Client::builder("id", "secret").endpoint("bad url").is_err());
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn from_env_reads_credentials() {
        let client = Client::from_lookup(lookup(&[
            (ENV_CHANNEL_ID, "env-id"),
            (ENV_CHANNEL_SECRET, "env-secret"),
        ]))
        .unwrap();
        assert_eq!(client.channel_id(), "env-id");
        assert_eq!(client.channel_secret, "env-secret");
        assert_eq!(client.endpoint().url().as_str(), "https://api-pay.line.me/");
    }

    #[test]
    fn from_env_requires_credentials() {
        let err = Client::from_lookup(lookup(&[(ENV_CHANNEL_ID, "env-id")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ENV_CHANNEL_SECRET)));
    }

    #[test]
    fn from_env_endpoint_beats_sandbox() {
        let client = Client::from_lookup(lookup(&[
            (ENV_CHANNEL_ID, "id"),
            (ENV_CHANNEL_SECRET, "secret"),
            (ENV_SANDBOX, "true"),
            (ENV_ENDPOINT, "http://127.0.0.1:9999"),
        ]))
        .unwrap();
        assert_eq!(client.endpoint().url().as_str(), "http://127.0.0.1:9999/");
    }

    #[test]
    fn from_env_sandbox_flag() {
        let client = Client::from_lookup(lookup(&[
            (ENV_CHANNEL_ID, "id"),
            (ENV_CHANNEL_SECRET, "secret"),
            (ENV_SANDBOX, "1"),
        ]))
        .unwrap();
        assert_eq!(client.endpoint().url().as_str(), "https://sandbox-api-pay.line.me/");
    }
}

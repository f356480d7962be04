//! Client core for the LINE Pay JSON API.
//!
//! # Overview
//! Builds authenticated JSON requests against a configurable base endpoint,
//! sends them through a pluggable transport and decodes the responses into
//! caller-chosen types. Concrete API operations live on top of this crate.
//!
//! # Design
//! - `Client` is immutable after construction and holds only credentials,
//!   the base `Endpoint` and an `Arc<dyn HttpTransport>`.
//! - Request building (`new_request*`, `merge_query`) is synchronous and
//!   pure; dispatch (`execute*`) is the only async step.
//! - Every dispatch runs under a `Context` that can cancel it or bound it
//!   with a deadline.
//! - Non-2xx responses become `Error::Api`; undecodable 2xx bodies become
//!   `Error::Decode`. Both keep the raw `HttpResponse`.

pub mod client;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod query;
pub mod transport;

pub use client::Client;
pub use config::{with_endpoint, with_http_client, with_sandbox, ClientBuilder, ClientOption};
pub use context::{CancelHandle, Context};
pub use endpoint::{Endpoint, DEFAULT_ENDPOINT, SANDBOX_ENDPOINT};
pub use error::{ApiErrorBody, ConfigError, EncodingError, Error, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RawResponse, UnknownMethod};
pub use query::merge_query;
pub use transport::{default_transport, HttpTransport, ReqwestTransport, TransportConfig};

//! Error types for the LINE Pay client core.
//!
//! # Design
//! Failures are split by the stage that produced them. `ConfigError` only
//! comes out of client construction, so `Client::new` returns it directly.
//! Everything else surfaces through the top-level `Error`. The two variants
//! produced after a response arrived (`Api` and `Decode`) carry that
//! response so callers can still inspect status, headers and body.

use serde::Deserialize;

use crate::http::HttpResponse;

/// Invalid client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint URL {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("endpoint URL {url:?} cannot be used as a base URL")]
    UnsupportedEndpoint { url: String },

    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
}

/// A request body or query could not be serialized.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("failed to encode request body: {0}")]
    Body(#[source] serde_json::Error),

    #[error("failed to encode query parameters: {0}")]
    Query(#[source] serde_urlencoded::ser::Error),
}

/// The request never produced a response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("transport failure: {0}")]
    Custom(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e)
        }
    }
}

/// Errors returned by `Client` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot resolve request path {path:?}: {source}")]
    Url {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        response: Box<HttpResponse>,
    },

    /// A 2xx body did not match the destination type.
    #[error("failed to decode response body (HTTP {}): {source}", .response.status)]
    Decode {
        response: Box<HttpResponse>,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// The raw response, for errors raised after one was received.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Error::Api { response, .. } | Error::Decode { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }

    /// The request was abandoned because its context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Cancelled))
    }

    /// The context deadline passed before the response was read.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Error::Transport(TransportError::DeadlineExceeded))
    }

    /// Either of the above: the failure came from the context, not the server.
    pub fn is_context_error(&self) -> bool {
        self.is_cancelled() || self.is_deadline_exceeded()
    }

    pub(crate) fn api(response: HttpResponse) -> Self {
        let ApiErrorBody { code, message } = ApiErrorBody::from_response(&response);
        Error::Api {
            status: response.status,
            code,
            message,
            response: Box::new(response),
        }
    }
}

/// Error envelope returned by the API on non-2xx responses.
///
/// Accepts both `code`/`message` and LINE Pay's `returnCode`/`returnMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(alias = "returnCode", default)]
    pub code: String,
    #[serde(alias = "returnMessage", default)]
    pub message: String,
}

impl ApiErrorBody {
    /// Decode the error envelope, falling back to the status code and raw
    /// text when the body is empty or not the expected JSON.
    pub fn from_response(response: &HttpResponse) -> Self {
        let parsed = serde_json::from_slice::<ApiErrorBody>(&response.body)
            .ok()
            .filter(|body| !body.code.is_empty() || !body.message.is_empty());
        if let Some(body) = parsed {
            return body;
        }

        let text = response.text();
        let message = match text.trim() {
            "" => reqwest::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unknown error")
                .to_string(),
            trimmed => trimmed.to_string(),
        };
        ApiErrorBody {
            code: response.status.to_string(),
            message,
        }
    }
}

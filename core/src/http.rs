//! HTTP request and response types exchanged with the transport.
//!
//! # Design
//! Requests are plain data: the client builds an `HttpRequest` and hands it
//! to an `HttpTransport`, which is the only place that touches the network.
//! This keeps request building deterministic and lets tests inspect exactly
//! what would be sent.
//!
//! Responses come back from the transport as a `RawResponse` whose body is
//! still a stream. The dispatcher reads it into an `HttpResponse` with the
//! body fully buffered; that is what callers see.

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use bytes::Bytes;
use futures_util::Stream;
use url::Url;

use crate::error::TransportError;

/// HTTP method for a request.
///
/// Any valid method token is accepted, including extension methods. The
/// common methods are available as associated constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpMethod(reqwest::Method);

impl HttpMethod {
    pub const GET: HttpMethod = HttpMethod(reqwest::Method::GET);
    pub const POST: HttpMethod = HttpMethod(reqwest::Method::POST);
    pub const PUT: HttpMethod = HttpMethod(reqwest::Method::PUT);
    pub const PATCH: HttpMethod = HttpMethod(reqwest::Method::PATCH);
    pub const DELETE: HttpMethod = HttpMethod(reqwest::Method::DELETE);
    pub const HEAD: HttpMethod = HttpMethod(reqwest::Method::HEAD);
    pub const OPTIONS: HttpMethod = HttpMethod(reqwest::Method::OPTIONS);

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<reqwest::Method> for HttpMethod {
    fn from(method: reqwest::Method) -> Self {
        HttpMethod(method)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        method.0
    }
}

/// Returned when a string is not a valid HTTP method token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid HTTP method: {0:?}")]
pub struct UnknownMethod(pub String);

/// Methods whose names are matched case-insensitively when parsing.
const STANDARD_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "CONNECT", "TRACE",
];

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    /// Standard method names are normalized to upper case. Extension
    /// methods are case-sensitive and kept exactly as written.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = if STANDARD_METHODS.iter().any(|m| m.eq_ignore_ascii_case(s)) {
            s.to_ascii_uppercase()
        } else {
            s.to_string()
        };
        reqwest::Method::from_bytes(token.as_bytes())
            .map(HttpMethod)
            .map_err(|_| UnknownMethod(s.to_string()))
    }
}

/// An HTTP request described as plain data.
///
/// Built by `Client::new_request` / `Client::new_request_with_body`. The
/// URL is always absolute. `body`, when present, is a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Chunked response body as produced by a transport.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A response as returned by the transport, body not yet read.
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: BodyStream,
}

impl RawResponse {
    pub fn from_stream(status: u16, headers: Vec<(String, String)>, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A response whose body is already in memory.
    pub fn from_bytes(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        let stream = futures_util::stream::once(async move { Ok(body) });
        Self::from_stream(status, headers, Box::pin(stream))
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// A response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::GET);
        assert_eq!("POST".parse::<HttpMethod>().unwrap(), HttpMethod::POST);
        assert_eq!("Patch".parse::<HttpMethod>().unwrap(), HttpMethod::PATCH);
        assert_eq!("head".parse::<HttpMethod>().unwrap(), HttpMethod::HEAD);
        assert_eq!("OPTIONS".parse::<HttpMethod>().unwrap(), HttpMethod::OPTIONS);
    }

    #[test]
    fn extension_method_is_kept_verbatim() {
        let method = "PURGE".parse::<HttpMethod>().unwrap();
        assert_eq!(method.as_str(), "PURGE");
        let method = "Brew".parse::<HttpMethod>().unwrap();
        assert_eq!(method.as_str(), "Brew");
    }

    #[test]
    fn invalid_method_token_is_rejected() {
        let err = "BAD METHOD".parse::<HttpMethod>().unwrap_err();
        assert_eq!(err, UnknownMethod("BAD METHOD".to_string()));
        assert!("".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn method_converts_to_and_from_reqwest() {
        assert_eq!(HttpMethod::DELETE.to_string(), "DELETE");
        assert_eq!(reqwest::Method::from(HttpMethod::PUT), reqwest::Method::PUT);
        assert_eq!(HttpMethod::from(reqwest::Method::HEAD), HttpMethod::HEAD);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Bytes::new(),
        };
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn success_range_is_2xx_only() {
        let mut response = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: Bytes::new(),
        };
        assert!(response.is_success());
        response.status = 302;
        assert!(!response.is_success());
        response.status = 199;
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn raw_response_from_bytes_yields_one_chunk() {
        use futures_util::StreamExt;

        let mut raw = RawResponse::from_bytes(200, Vec::new(), "hello");
        let chunk = raw.body.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from_static(b"hello"));
        assert!(raw.body.next().await.is_none());
    }
}

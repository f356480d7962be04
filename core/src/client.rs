//! Request building and dispatch.
//!
//! # Design
//! `Client` holds credentials, a base `Endpoint` and a shared transport, and
//! never changes after construction. Building a request is synchronous and
//! pure: resolve the path, encode the body, stamp the auth headers. Dispatch
//! is the only async step; it runs the transport send and the body read
//! under the caller's `Context` and classifies the result by status.

use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{field, instrument, Span};

use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::error::{EncodingError, Error, TransportError};
use crate::http::{BodyStream, HttpMethod, HttpRequest, HttpResponse};
use crate::query;
use crate::transport::HttpTransport;

pub const HEADER_CHANNEL_ID: &str = "X-LINE-ChannelId";
pub const HEADER_CHANNEL_SECRET: &str = "X-LINE-ChannelSecret";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Client for the LINE Pay JSON API.
///
/// Cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct Client {
    pub(crate) channel_id: String,
    pub(crate) channel_secret: String,
    pub(crate) endpoint: Endpoint,
    pub(crate) transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("channel_id", &self.channel_id)
            .field("channel_secret", &"<redacted>")
            .field("endpoint", &self.endpoint.url().as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Append `params` as a query string to `path`. See [`query::merge_query`].
    pub fn merge_query<P>(&self, path: &str, params: Option<&P>) -> Result<String, EncodingError>
    where
        P: Serialize + ?Sized,
    {
        query::merge_query(path, params)
    }

    /// Build a request without a body.
    pub fn new_request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest, Error> {
        self.build_request(method, path, None)
    }

    /// Build a request whose body is `body` encoded as JSON.
    ///
    /// The body is compact JSON followed by a single newline.
    pub fn new_request_with_body<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, Error>
    where
        B: Serialize + ?Sized,
    {
        let mut encoded = serde_json::to_string(body).map_err(EncodingError::Body)?;
        encoded.push('\n');
        self.build_request(method, path, Some(encoded))
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
    ) -> Result<HttpRequest, Error> {
        let url = self.endpoint.resolve(path).map_err(|source| Error::Url {
            path: path.to_string(),
            source,
        })?;

        let mut headers = Vec::with_capacity(3);
        if body.is_some() {
            headers.push(("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()));
        }
        headers.push((HEADER_CHANNEL_ID.to_string(), self.channel_id.clone()));
        headers.push((HEADER_CHANNEL_SECRET.to_string(), self.channel_secret.clone()));

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send `request` and discard the response body.
    ///
    /// The body is still read to the end so the connection can be reused.
    /// Non-2xx responses become [`Error::Api`].
    pub async fn execute(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, Error> {
        self.dispatch(ctx, request).await
    }

    /// Send `request` and decode a 2xx JSON body into `dest`.
    ///
    /// `dest` is written only on success. On [`Error::Api`] and
    /// [`Error::Decode`] the raw response is available via
    /// [`Error::response`].
    pub async fn execute_into<T>(
        &self,
        ctx: &Context,
        request: HttpRequest,
        dest: &mut T,
    ) -> Result<HttpResponse, Error>
    where
        T: DeserializeOwned,
    {
        let response = self.dispatch(ctx, request).await?;
        match serde_json::from_slice::<T>(&response.body) {
            Ok(decoded) => {
                *dest = decoded;
                Ok(response)
            }
            Err(source) => Err(Error::Decode {
                response: Box::new(response),
                source,
            }),
        }
    }

    #[instrument(
        name = "linepay_request",
        skip_all,
        fields(
            http.method = %request.method,
            http.url = %request.url,
            http.status_code = field::Empty,
        )
    )]
    async fn dispatch(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, Error> {
        tracing::debug!("sending request");
        let raw = ctx.run(self.transport.send(request)).await??;
        Span::current().record("http.status_code", raw.status);

        let body = ctx.run(read_body(raw.body)).await??;
        let response = HttpResponse {
            status: raw.status,
            headers: raw.headers,
            body,
        };

        if !response.is_success() {
            let err = Error::api(response);
            tracing::warn!(error = %err, "request rejected");
            return Err(err);
        }
        tracing::debug!(bytes = response.body.len(), "request succeeded");
        Ok(response)
    }
}

/// Collect a body stream. The stream is dropped on return, read or not.
async fn read_body(mut stream: BodyStream) -> Result<bytes::Bytes, TransportError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

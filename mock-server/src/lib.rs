use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const CHANNEL_ID_HEADER: &str = "x-line-channelid";
pub const CHANNEL_SECRET_HEADER: &str = "x-line-channelsecret";

pub const DEFAULT_CHANNEL_ID: &str = "testid";
pub const DEFAULT_CHANNEL_SECRET: &str = "testsecret";

/// First transaction id handed out by `/v3/payments/request`.
pub const FIRST_TRANSACTION_ID: i64 = 2024_0000_0001;

#[derive(Clone)]
pub struct AppState {
    channel_id: String,
    channel_secret: String,
    next_transaction: Arc<AtomicI64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRequest {
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInfo {
    #[serde(rename = "transactionId")]
    pub transaction_id: i64,
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

/// Standard success/failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(rename = "returnCode")]
    pub return_code: String,
    #[serde(rename = "returnMessage")]
    pub return_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<T>,
}

#[derive(Deserialize)]
struct PaymentLookup {
    #[serde(rename = "orderId")]
    order_id: Option<String>,
    #[serde(rename = "transactionId")]
    transaction_id: Option<i64>,
}

#[derive(Deserialize)]
struct SlowParams {
    #[serde(default = "default_delay_ms")]
    ms: u64,
}

fn default_delay_ms() -> u64 {
    2_000
}

pub fn app() -> Router {
    app_with_credentials(DEFAULT_CHANNEL_ID, DEFAULT_CHANNEL_SECRET)
}

pub fn app_with_credentials(channel_id: &str, channel_secret: &str) -> Router {
    let state = AppState {
        channel_id: channel_id.to_string(),
        channel_secret: channel_secret.to_string(),
        next_transaction: Arc::new(AtomicI64::new(FIRST_TRANSACTION_ID)),
    };
    Router::new()
        .route("/do", get(do_handler))
        .route("/echo", any(echo))
        .route("/slow", get(slow))
        .route("/status/{code}", any(status))
        .route("/v3/payments", get(lookup_payments))
        .route("/v3/payments/request", post(request_payment))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = Envelope::<Value> {
        return_code: code.to_string(),
        return_message: message.to_string(),
        info: None,
    };
    (status, Json(body)).into_response()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if header(CHANNEL_ID_HEADER) == Some(state.channel_id.as_str())
        && header(CHANNEL_SECRET_HEADER) == Some(state.channel_secret.as_str())
    {
        return Ok(());
    }
    tracing::info!("rejecting request with bad channel credentials");
    Err(error_response(
        StatusCode::UNAUTHORIZED,
        "1106",
        "Header information error.",
    ))
}

async fn do_handler() -> Json<Value> {
    Json(json!({ "A": "a" }))
}

async fn echo(
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "channelId": header(CHANNEL_ID_HEADER),
        "channelSecret": header(CHANNEL_SECRET_HEADER),
        "contentType": header("content-type"),
        "userAgent": header("user-agent"),
        "body": body,
    }))
}

async fn slow(Query(params): Query<SlowParams>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(json!({}))
}

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    if status.is_success() {
        return (status, Json(json!({ "status": code }))).into_response();
    }
    let reason = status.canonical_reason().unwrap_or("error");
    error_response(status, &code.to_string(), reason)
}

async fn request_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<PaymentRequest>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    if input.amount <= 0 {
        return error_response(StatusCode::BAD_REQUEST, "1124", "Amount info error.");
    }
    let transaction_id = state.next_transaction.fetch_add(1, Ordering::SeqCst);
    tracing::info!(transaction_id, order_id = %input.order_id, "payment requested");
    let body = Envelope {
        return_code: "0000".to_string(),
        return_message: "Success.".to_string(),
        info: Some(PaymentInfo {
            transaction_id,
            order_id: input.order_id,
            amount: input.amount,
            currency: input.currency,
        }),
    };
    Json(body).into_response()
}

async fn lookup_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(lookup): Query<PaymentLookup>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let info = vec![json!({
        "transactionId": lookup.transaction_id,
        "orderId": lookup.order_id,
    })];
    let body = Envelope {
        return_code: "0000".to_string(),
        return_message: "Success.".to_string(),
        info: Some(info),
    };
    Json(body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_line_pay_field_names() {
        let envelope = Envelope::<Value> {
            return_code: "1106".to_string(),
            return_message: "Header information error.".to_string(),
            info: None,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["returnCode"], "1106");
        assert_eq!(json["returnMessage"], "Header information error.");
        assert!(json.get("info").is_none());
    }

    #[test]
    fn payment_request_uses_camel_case_order_id() {
        let input: PaymentRequest =
            serde_json::from_str(r#"{"amount":100,"currency":"JPY","orderId":"o-1"}"#).unwrap();
        assert_eq!(input.order_id, "o-1");
    }

    #[test]
    fn payment_request_rejects_missing_amount() {
        let result: Result<PaymentRequest, _> =
            serde_json::from_str(r#"{"currency":"JPY","orderId":"o-1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn authorize_checks_both_headers() {
        let state = AppState {
            channel_id: "id".to_string(),
            channel_secret: "secret".to_string(),
            next_transaction: Arc::new(AtomicI64::new(1)),
        };
        let mut headers = HeaderMap::new();
        headers.insert(CHANNEL_ID_HEADER, "id".parse().unwrap());
        assert!(authorize(&state, &headers).is_err());
        headers.insert(CHANNEL_SECRET_HEADER, "secret".parse().unwrap());
        assert!(authorize(&state, &headers).is_ok());
    }
}

//! Per-request correlation id
//!
//! Each inbound request gets a fresh 8-hex-char id. Handler work runs inside a
//! `request` span carrying it, so every log line (background refreshes
//! included, see [`crate::pipeline`]) can be tied back to the request. The id
//! is echoed in the `x-request-id` response header.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use rand::Rng;
use tracing::Instrument;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// New random id, 4 random bytes as lowercase hex
pub fn new_request_id() -> String {
    let bytes: [u8; 4] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub async fn correlation_middleware(request: Request<Body>, next: Next) -> Response {
    let req_id = new_request_id();

    let span = tracing::info_span!(
        "request",
        req_id = %req_id,
        method = %request.method(),
        uri = %request.uri(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&req_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

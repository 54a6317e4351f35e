//! Responses produced by the relay itself.
//!
//! Upstream responses are relayed untouched; only the rejection and failure
//! paths below synthesize anything.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub const ACCESS_DENIED_BODY: &str = "Access Denied: Malicious bot detected.";
pub const ORIGIN_UNAVAILABLE_BODY: &str =
    "The origin server is currently unavailable. Please try again later.";
pub const BAD_REQUEST_BODY: &str = "Bad Request: missing or invalid Host header.";

/// 403 for a request whose User-Agent is on the deny list.
pub fn access_denied() -> Response {
    (StatusCode::FORBIDDEN, ACCESS_DENIED_BODY).into_response()
}

/// 503 for any transport failure talking to the destination.
pub fn origin_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, ORIGIN_UNAVAILABLE_BODY).into_response()
}

/// 400 for a request the relay cannot turn into a URL.
pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, BAD_REQUEST_BODY).into_response()
}

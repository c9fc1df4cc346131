// Unified error formatting for synthesized relay failures.
// Transport-level failures are the only condition the relay converts into a
// response of its own; everything the upstream actually returned passes
// through unmodified.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors raised by the upstream client before a usable response exists.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{}", describe_transport_error(.0))]
    Transport(#[from] reqwest::Error),
    #[error("upstream produced no response within {0}s")]
    ResponseTimeout(u64),
}

/// Build the fixed 502 gateway-failure response, with a message naming the
/// underlying transport error.
pub fn gateway_error(message: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": message })),
    )
        .into_response()
}

/// Word a [`reqwest::Error`] into a human-readable message. The category only
/// affects the wording; the synthesized status is always 502.
pub fn describe_transport_error(error: &reqwest::Error) -> String {
    let text = error.to_string().to_lowercase();

    if error.is_timeout() {
        return format!("upstream request timed out: {}", error);
    }

    if error.is_connect() {
        if text.contains("dns") || text.contains("resolve") || text.contains("getaddrinfo") {
            return format!("upstream DNS resolution failed: {}", error);
        }
        if text.contains("ssl") || text.contains("tls") || text.contains("certificate") {
            return format!("upstream TLS handshake failed: {}", error);
        }
        return format!("upstream connection failed: {}", error);
    }

    format!("upstream request failed: {}", error)
}

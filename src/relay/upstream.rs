// Upstream HTTP client: one outbound POST per relay call, either streamed or
// buffered. Nothing is retried.

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::RelayError;
use crate::models::endpoint::Endpoint;

/// Shared pooled client. Per-request deadlines come from the descriptor;
/// pooling across calls is an internal optimization only.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .connect_timeout(Duration::from_secs(30))
        .build()
}

/// 单轮对话载荷：{"model": identity, "messages": [{"role": "user", "content": prompt}]}
pub fn chat_payload(endpoint: &Endpoint, prompt: &str) -> Value {
    json!({
        "model": endpoint.identity(),
        "messages": [
            {
                "role": "user",
                "content": prompt,
            }
        ],
    })
}

fn relay_headers(endpoint: &Endpoint, streaming: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
    headers.insert(
        AUTHORIZATION,
        format!("Bearer {}", endpoint.api_key.trim()).parse().unwrap(),
    );
    if streaming {
        headers.insert(ACCEPT, "text/event-stream".parse().unwrap());
    }
    headers
}

/// Issue the streaming POST. Fails before any stream exists when the
/// transport cannot produce response headers within the descriptor timeout;
/// once this returns Ok the body is a lazy, non-restartable chunk stream.
pub async fn open_stream(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    payload: &Value,
) -> Result<reqwest::Response, RelayError> {
    let timeout_secs = endpoint.timeout_secs();
    let request = client
        .post(&endpoint.endpoint)
        .headers(relay_headers(endpoint, true))
        .json(payload)
        .send();

    match tokio::time::timeout(Duration::from_secs(timeout_secs), request).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(RelayError::Transport(e)),
        Err(_) => Err(RelayError::ResponseTimeout(timeout_secs)),
    }
}

/// Non-streaming mode: block until the full response is in, forward the
/// upstream status verbatim, and fall back to an error envelope when the
/// body is not JSON.
pub async fn call_once(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    payload: &Value,
) -> Result<(StatusCode, Value), RelayError> {
    let response = client
        .post(&endpoint.endpoint)
        .headers(relay_headers(endpoint, false))
        .json(payload)
        .timeout(Duration::from_secs(endpoint.timeout_secs()))
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    Ok((status, parse_upstream_body(status, &body)))
}

/// JSON 解析失败时回退为 {"error": <原文或 "HTTP <status>">}
pub fn parse_upstream_body(status: StatusCode, body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => v,
        Err(_) => {
            let msg = if body.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                body.to_string()
            };
            json!({ "error": msg })
        }
    }
}

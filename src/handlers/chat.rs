// 对话转发处理器：流式 SSE 转码 + 非流式单次转发

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::{info, warn};

use crate::errors::gateway_error;
use crate::models::endpoint::Endpoint;
use crate::relay::decode::Utf8Carry;
use crate::relay::sse::{Heartbeat, SseLineFramer};
use crate::relay::upstream;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub stream: Option<String>,
}

fn new_trace_id() -> String {
    rand::Rng::sample_iter(rand::thread_rng(), &rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

pub async fn handle_chat(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    Query(query): Query<ChatQuery>,
    Json(body): Json<ChatRequest>,
) -> Response {
    let trace_id = new_trace_id();

    let Some(endpoint) = state.registry.get(&model_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "模型不存在" })),
        )
            .into_response();
    };

    let streaming = query.stream.as_deref() == Some("1");
    let payload = upstream::chat_payload(&endpoint, &body.prompt);

    info!(
        "[{}] Chat Request | Model: {} | Stream: {} | Timeout: {}s",
        trace_id,
        endpoint.name,
        streaming,
        endpoint.timeout_secs()
    );

    if streaming {
        stream_to_client(&state, &endpoint, payload, trace_id).await
    } else {
        call_model_once(&state, &endpoint, payload, trace_id).await
    }
}

/// 流式模式：打开上游字节流，经 解码 → SSE 成帧 → 心跳插入 逐帧转发。
/// 客户端断开时响应体被丢弃，上游请求随之中止。
async fn stream_to_client(
    state: &AppState,
    endpoint: &Endpoint,
    payload: serde_json::Value,
    trace_id: String,
) -> Response {
    let resp = match upstream::open_stream(&state.http_client, endpoint, &payload).await {
        Ok(r) => r,
        Err(e) => {
            warn!("[{}] Upstream unreachable: {}", trace_id, e);
            return gateway_error(&e.to_string());
        }
    };

    // 非 2xx 状态原样透传，本组件不解释上游结果
    let status = resp.status();
    let heartbeat_secs = state.heartbeat_interval_secs;

    let sse_stream = async_stream::stream! {
        let mut decoder = Utf8Carry::new();
        let mut framer = SseLineFramer::new();
        let mut heartbeat = Heartbeat::new(heartbeat_secs);
        let mut chunk_count: usize = 0;
        let mut total_bytes: usize = 0;

        let mut byte_stream = resp.bytes_stream();
        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    chunk_count += 1;
                    total_bytes += bytes.len();

                    if heartbeat.tick(Instant::now()) {
                        yield Ok::<Bytes, std::io::Error>(Bytes::from_static(
                            Heartbeat::FRAME.as_bytes(),
                        ));
                    }

                    let text = decoder.decode(&bytes);
                    for frame in framer.push(&text) {
                        yield Ok::<Bytes, std::io::Error>(Bytes::from(frame));
                    }
                }
                Err(e) => {
                    // 中途传输失败：流提前结束，已缓冲内容仍然冲出
                    warn!(
                        "[{}] Stream chunk error after {} chunks ({} bytes): {}",
                        trace_id, chunk_count, total_bytes, e
                    );
                    break;
                }
            }
        }

        if let Some(tail) = framer.finish() {
            yield Ok::<Bytes, std::io::Error>(Bytes::from(tail));
        }

        info!(
            "[{}] Stream ended after {} chunks, {} bytes",
            trace_id, chunk_count, total_bytes
        );
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(sse_stream))
        .unwrap()
}

/// 非流式模式：一次性请求并转发状态码与 JSON 结果。
async fn call_model_once(
    state: &AppState,
    endpoint: &Endpoint,
    payload: serde_json::Value,
    trace_id: String,
) -> Response {
    match upstream::call_once(&state.http_client, endpoint, &payload).await {
        Ok((status, body)) => {
            info!("[{}] Upstream responded {}", trace_id, status.as_u16());
            (status, Json(body)).into_response()
        }
        Err(e) => {
            warn!("[{}] Upstream unreachable: {}", trace_id, e);
            gateway_error(&e.to_string())
        }
    }
}

// Axum 服务器装配：路由、共享状态、CORS

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::AppConfig;
use crate::handlers::{chat, endpoints};
use crate::models::endpoint::EndpointRegistry;
use crate::relay::upstream;

/// Axum 应用状态
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EndpointRegistry>,
    pub http_client: reqwest::Client,
    /// SSE 心跳间隔（秒），启动时定值，转发调用不再查全局配置
    pub heartbeat_interval_secs: u64,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/models/create", post(endpoints::create_endpoint))
        .route("/api/v1/models/get", get(endpoints::list_endpoints))
        .route(
            "/api/v1/models/:model_id",
            get(endpoints::get_endpoint)
                .put(endpoints::update_endpoint)
                .delete(endpoints::delete_endpoint),
        )
        .route("/api/v1/models/chat/:model_id", post(chat::handle_chat))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn serve(config: AppConfig) -> Result<(), String> {
    let http_client = upstream::build_http_client()
        .map_err(|e| format!("HTTP 客户端构建失败: {}", e))?;

    let state = AppState {
        registry: Arc::new(EndpointRegistry::new()),
        http_client,
        heartbeat_interval_secs: config.relay.heartbeat_interval_secs,
    };

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("地址 {} 绑定失败: {}", addr, e))?;

    info!("模型转发服务启动在 http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("服务异常退出: {}", e))
}

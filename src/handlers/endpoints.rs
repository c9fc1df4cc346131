// 模型端点 CRUD 处理器

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::models::endpoint::{validate_api_key, EndpointCreate, EndpointUpdate};
use crate::models::response::ApiResponse;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

pub async fn create_endpoint(
    State(state): State<AppState>,
    Json(req): Json<EndpointCreate>,
) -> ApiResponse {
    if let Err(msg) = validate_api_key(&req.api_key) {
        return ApiResponse::error(422, msg);
    }
    if state.registry.name_taken(&req.name, None) {
        return ApiResponse::error(409, "模型名称已存在");
    }
    let endpoint = state.registry.insert(req);
    ApiResponse::success(endpoint, "成功创建模型")
}

pub async fn get_endpoint(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> ApiResponse {
    match state.registry.get(&model_id) {
        Some(endpoint) => ApiResponse::success(endpoint, "查询成功"),
        None => ApiResponse::error(404, "模型不存在"),
    }
}

pub async fn list_endpoints(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResponse {
    let all = state.registry.list();
    let total = all.len();
    let page = query.page.max(1);
    let page_size = query.page_size.max(1);
    let items: Vec<_> = all
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    ApiResponse::success(
        json!({
            "list": items,
            "total": total,
            "page": page,
            "page_size": page_size,
        }),
        "查询模型列表成功",
    )
}

pub async fn update_endpoint(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    Json(req): Json<EndpointUpdate>,
) -> ApiResponse {
    if state.registry.get(&model_id).is_none() {
        return ApiResponse::error(404, "模型不存在");
    }
    if let Some(api_key) = &req.api_key {
        if let Err(msg) = validate_api_key(api_key) {
            return ApiResponse::error(422, msg);
        }
    }
    if let Some(name) = &req.name {
        if state.registry.name_taken(name, Some(&model_id)) {
            return ApiResponse::error(409, "模型名称已存在");
        }
    }
    match state.registry.update(&model_id, req) {
        Some(endpoint) => ApiResponse::success(endpoint, "成功更新模型"),
        None => ApiResponse::error(404, "模型不存在"),
    }
}

pub async fn delete_endpoint(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> ApiResponse {
    match state.registry.remove(&model_id) {
        Some(endpoint) => ApiResponse::success(endpoint, "成功删除模型"),
        None => ApiResponse::error(404, "模型不存在"),
    }
}

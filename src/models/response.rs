// CRUD 接口统一响应信封：{status, data, msg}

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Option<Value>,
    pub msg: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T, msg: impl Into<String>) -> Self {
        Self {
            status: 200,
            data: serde_json::to_value(data).ok(),
            msg: msg.into(),
        }
    }

    pub fn error(status: u16, msg: impl Into<String>) -> Self {
        Self {
            status,
            data: None,
            msg: msg.into(),
        }
    }
}

// HTTP 层恒为 200，业务状态在信封里
impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

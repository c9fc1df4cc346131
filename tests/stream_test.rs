/// 转发服务完整性测试
///
/// 用法:
///   cargo test --test stream_test -- --nocapture
///
/// 环境变量:
///   RELAY_TEST_HOST  (默认 http://127.0.0.1:3000)
///
/// 测试内容:
///   1. 端点 CRUD 生命周期
///   2. 非流式转发 — 状态码透传与错误信封回退
///   3. 流式转发 — SSE 响应头与状态码透传
///   4. 下游不可达 — 固定 502 网关错误
///
/// 服务未启动时各测试打印提示并跳过。

use std::time::Duration;

fn base_url() -> String {
    std::env::var("RELAY_TEST_HOST").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
}

fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// 服务可达性探测；不可达返回 None（测试跳过）
async fn probe(client: &reqwest::Client) -> Option<()> {
    match client
        .get(format!("{}/health", base_url()))
        .timeout(Duration::from_secs(2))
        .send()
        .await
    {
        Ok(_) => Some(()),
        Err(e) => {
            println!("⚠ 服务不可达，跳过测试: {}", e);
            println!("  请确保服务运行在 {}", base_url());
            None
        }
    }
}

/// 注册一个端点，返回 model_id
async fn create_endpoint(
    client: &reqwest::Client,
    name: &str,
    endpoint: &str,
    timeout: i64,
) -> String {
    let resp: serde_json::Value = client
        .post(format!("{}/api/v1/models/create", base_url()))
        .json(&serde_json::json!({
            "name": name,
            "endpoint": endpoint,
            "api_key": "sk-test",
            "timeout": timeout,
        }))
        .send()
        .await
        .expect("创建请求失败")
        .json()
        .await
        .expect("创建响应解析失败");

    assert_eq!(resp["status"], 200, "创建失败: {}", resp);
    resp["data"]["model_id"]
        .as_str()
        .expect("缺少 model_id")
        .to_string()
}

async fn delete_endpoint(client: &reqwest::Client, model_id: &str) {
    let _ = client
        .delete(format!("{}/api/v1/models/{}", base_url(), model_id))
        .send()
        .await;
}

// ============================================================================
// 测试 1: 端点 CRUD 生命周期
// ============================================================================
#[tokio::test]
async fn test_endpoint_crud_lifecycle() {
    let client = reqwest::Client::new();
    if probe(&client).await.is_none() {
        return;
    }

    let name = unique_name("crud");
    let model_id = create_endpoint(&client, &name, "http://127.0.0.1:9/v1", 30).await;

    // 按 id 查询
    let resp: serde_json::Value = client
        .get(format!("{}/api/v1/models/{}", base_url(), model_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["status"], 200);
    assert_eq!(resp["data"]["name"], name.as_str());

    // 重名创建被拒绝
    let resp: serde_json::Value = client
        .post(format!("{}/api/v1/models/create", base_url()))
        .json(&serde_json::json!({
            "name": name,
            "endpoint": "http://127.0.0.1:9/v1",
            "api_key": "sk-test",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["status"], 409);

    // 更新超时
    let resp: serde_json::Value = client
        .put(format!("{}/api/v1/models/{}", base_url(), model_id))
        .json(&serde_json::json!({ "timeout": 60 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["status"], 200);
    assert_eq!(resp["data"]["timeout"], 60);

    // 删除后查询 404
    delete_endpoint(&client, &model_id).await;
    let resp: serde_json::Value = client
        .get(format!("{}/api/v1/models/{}", base_url(), model_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["status"], 404);
}

// ============================================================================
// 测试 2: 非法 api_key 被拒绝
// ============================================================================
#[tokio::test]
async fn test_create_rejects_bad_api_key() {
    let client = reqwest::Client::new();
    if probe(&client).await.is_none() {
        return;
    }

    for bad_key in ["", "sk has space", "sk\ttab"] {
        let resp: serde_json::Value = client
            .post(format!("{}/api/v1/models/create", base_url()))
            .json(&serde_json::json!({
                "name": unique_name("badkey"),
                "endpoint": "http://127.0.0.1:9/v1",
                "api_key": bad_key,
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp["status"], 422, "api_key {:?} 应被拒绝", bad_key);
    }
}

// ============================================================================
// 测试 3: 未知模型对话返回 404
// ============================================================================
#[tokio::test]
async fn test_chat_unknown_model_404() {
    let client = reqwest::Client::new();
    if probe(&client).await.is_none() {
        return;
    }

    let resp = client
        .post(format!("{}/api/v1/models/chat/no-such-model", base_url()))
        .json(&serde_json::json!({ "prompt": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

// ============================================================================
// 测试 4: 非流式 — 上游状态码透传与非 JSON 错误信封
//
// 以服务自身的 /health 作为"下游"：POST 命中 405 且响应体为空，
// 转发结果应为 405 + {"error": "HTTP 405"}。
// ============================================================================
#[tokio::test]
async fn test_non_stream_forwards_status_with_error_envelope() {
    let client = reqwest::Client::new();
    if probe(&client).await.is_none() {
        return;
    }

    let model_id = create_endpoint(
        &client,
        &unique_name("nonstream"),
        &format!("{}/health", base_url()),
        10,
    )
    .await;

    let resp = client
        .post(format!("{}/api/v1/models/chat/{}", base_url(), model_id))
        .json(&serde_json::json!({ "prompt": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 405, "上游 405 应原样透传");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "HTTP 405");

    delete_endpoint(&client, &model_id).await;
}

// ============================================================================
// 测试 5: 流式 — SSE 响应头与状态码透传
// ============================================================================
#[tokio::test]
async fn test_stream_sets_sse_headers_and_forwards_status() {
    let client = reqwest::Client::new();
    if probe(&client).await.is_none() {
        return;
    }

    let model_id = create_endpoint(
        &client,
        &unique_name("stream"),
        &format!("{}/health", base_url()),
        10,
    )
    .await;

    let resp = client
        .post(format!(
            "{}/api/v1/models/chat/{}?stream=1",
            base_url(),
            model_id
        ))
        .json(&serde_json::json!({ "prompt": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 405);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(
        content_type.starts_with("text/event-stream"),
        "意外的 content-type: {}",
        content_type
    );
    assert_eq!(
        resp.headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );

    // 上游 405 响应体为空，SSE 流应直接结束且无内容
    let body = resp.text().await.unwrap();
    assert!(body.is_empty(), "意外的流内容: {:?}", body);

    delete_endpoint(&client, &model_id).await;
}

// ============================================================================
// 测试 6: 下游不可达 — 固定 502 网关错误
// ============================================================================
#[tokio::test]
async fn test_unreachable_downstream_returns_502() {
    let client = reqwest::Client::new();
    if probe(&client).await.is_none() {
        return;
    }

    // 127.0.0.1:9 (discard) 正常环境无人监听
    let model_id = create_endpoint(
        &client,
        &unique_name("unreachable"),
        "http://127.0.0.1:9/v1/chat/completions",
        2,
    )
    .await;

    let resp = client
        .post(format!("{}/api/v1/models/chat/{}", base_url(), model_id))
        .json(&serde_json::json!({ "prompt": "hi" }))
        .timeout(Duration::from_secs(30))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("upstream"),
        "错误信息应指明上游失败: {}",
        body
    );

    delete_endpoint(&client, &model_id).await;
}

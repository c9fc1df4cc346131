// 下游模型端点的配置实体与内存注册表。
// 重启丢数据；持久化不在本服务范围内。

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 一条下游模型端点记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub model_id: String,
    /// 模型名称（注册表内唯一）
    pub name: String,
    /// 大模型 HTTP 接口地址
    pub endpoint: String,
    /// 访问下游的 API Key
    pub api_key: String,
    /// 请求超时（秒）
    pub timeout: Option<i64>,
    /// 下游路由标识，缺省时回退到 name
    #[serde(rename = "type")]
    pub model_type: Option<String>,
    /// 向量维度等
    pub dimensions: Option<u32>,
}

impl Endpoint {
    /// 生效超时：非正或缺省时回退 30 秒。
    pub fn timeout_secs(&self) -> u64 {
        match self.timeout {
            Some(t) if t > 0 => t as u64,
            _ => 30,
        }
    }

    /// 发往下游的 model 字段
    pub fn identity(&self) -> &str {
        self.model_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointCreate {
    pub name: String,
    pub endpoint: String,
    pub api_key: String,
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default, rename = "type")]
    pub model_type: Option<String>,
    #[serde(default)]
    pub dimensions: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default, rename = "type")]
    pub model_type: Option<String>,
    #[serde(default)]
    pub dimensions: Option<u32>,
}

/// API Key 校验：非空，且不含空白/控制字符。
/// 转发器假定凭证已在这里洗干净，之后不再检查。
pub fn validate_api_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("api_key 不能为空".to_string());
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("api_key 不能包含空白或控制字符".to_string());
    }
    Ok(())
}

/// 内存端点注册表
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    entries: DashMap<String, Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, req: EndpointCreate) -> Endpoint {
        let endpoint = Endpoint {
            model_id: Uuid::new_v4().to_string(),
            name: req.name,
            endpoint: req.endpoint,
            api_key: req.api_key,
            timeout: req.timeout,
            model_type: req.model_type,
            dimensions: req.dimensions,
        };
        self.entries
            .insert(endpoint.model_id.clone(), endpoint.clone());
        endpoint
    }

    pub fn get(&self, model_id: &str) -> Option<Endpoint> {
        self.entries.get(model_id).map(|e| e.value().clone())
    }

    /// 按名称排序的全量列表（保证分页稳定）
    pub fn list(&self) -> Vec<Endpoint> {
        let mut all: Vec<Endpoint> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn update(&self, model_id: &str, req: EndpointUpdate) -> Option<Endpoint> {
        let mut entry = self.entries.get_mut(model_id)?;
        if let Some(name) = req.name {
            entry.name = name;
        }
        if let Some(endpoint) = req.endpoint {
            entry.endpoint = endpoint;
        }
        if let Some(api_key) = req.api_key {
            entry.api_key = api_key;
        }
        if let Some(timeout) = req.timeout {
            entry.timeout = Some(timeout);
        }
        if let Some(model_type) = req.model_type {
            entry.model_type = Some(model_type);
        }
        if let Some(dimensions) = req.dimensions {
            entry.dimensions = Some(dimensions);
        }
        Some(entry.value().clone())
    }

    pub fn remove(&self, model_id: &str) -> Option<Endpoint> {
        self.entries.remove(model_id).map(|(_, e)| e)
    }

    /// 名称是否已被占用（更新时排除自身）
    pub fn name_taken(&self, name: &str, exclude_id: Option<&str>) -> bool {
        self.entries
            .iter()
            .any(|e| e.name == name && Some(e.model_id.as_str()) != exclude_id)
    }
}

//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件
//!
//! Backend sections are kept as raw JSON objects; each backend factory
//! deserializes its own section. Environment variables named
//! `VECTOR_SEARCH_APP_<BACKEND>_<KEY>` override single keys.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::vector::BackendKind;

/// Environment variable prefix / 环境变量前缀
pub const ENV_PREFIX: &str = "VECTOR_SEARCH_APP_";

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// Embedding configuration / 向量模型配置
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Per-backend configuration (backend id -> object) / 后端配置
    #[serde(default = "default_backends")]
    pub backends: BTreeMap<String, Value>,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Embedding configuration / 向量模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "fastembed" (default) or "hash" for offline use without a model
    pub provider: String,
    /// Vector size for the hash provider; fastembed uses the model's size
    pub dimension: usize,
    /// Model download directory for fastembed / 模型缓存目录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_cache_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            backends: default_backends(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            dimension: 384,
            model_cache_dir: None,
        }
    }
}

fn default_backends() -> BTreeMap<String, Value> {
    let mut backends = BTreeMap::new();
    backends.insert(
        BackendKind::Milvus.as_str().to_string(),
        json!({
            "uri": "http://localhost:19530",
            "collection_name": "documents",
            "metric_type": "COSINE",
        }),
    );
    backends.insert(
        BackendKind::Pinecone.as_str().to_string(),
        json!({
            "api_key": "",
            "index_name": "documents",
            "namespace": "namespace",
        }),
    );
    backends.insert(
        BackendKind::MongoDb.as_str().to_string(),
        json!({
            "uri": "mongodb://localhost:27017",
            "db_name": "vector_search",
            "collection_name": "documents",
            "vector_index": "default",
            "num_candidates": 100,
        }),
    );
    backends.insert(
        BackendKind::Qdrant.as_str().to_string(),
        json!({
            "location": ":memory:",
            "collection_name": "documents",
        }),
    );
    backends
}

impl AppConfig {
    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Config section for one backend (empty object if absent) / 获取后端配置
    pub fn backend_config(&self, kind: BackendKind) -> Value {
        self.backends
            .get(kind.as_str())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Apply `VECTOR_SEARCH_APP_*` overrides / 应用环境变量覆盖
    pub fn apply_env_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let rest = rest.to_lowercase();

            match rest.as_str() {
                "server_host" => {
                    self.server.host = value;
                    continue;
                }
                "server_port" => {
                    match value.parse() {
                        Ok(port) => self.server.port = port,
                        Err(_) => tracing::warn!("Ignoring invalid port override: {}", value),
                    }
                    continue;
                }
                "embedding_provider" => {
                    self.embedding.provider = value;
                    continue;
                }
                _ => {}
            }

            let Some((kind, key)) = BackendKind::ALL.iter().find_map(|kind| {
                rest.strip_prefix(kind.as_str())
                    .and_then(|r| r.strip_prefix('_'))
                    .filter(|key| !key.is_empty())
                    .map(|key| (*kind, key.to_string()))
            }) else {
                continue;
            };

            let section = self
                .backends
                .entry(kind.as_str().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(obj) = section.as_object_mut() {
                tracing::debug!("Config override from environment: {}.{}", kind.as_str(), key);
                let typed = override_value(obj.get(&key), &value);
                obj.insert(key, typed);
            }
        }
    }
}

/// Keep the type of the value being replaced; new keys are strings / 保持原值类型
fn override_value(current: Option<&Value>, raw: &str) -> Value {
    match current {
        Some(Value::Bool(_)) => raw
            .parse::<bool>()
            .map(Value::Bool)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some(Value::Number(_)) => raw
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    let config_path = get_config_path();

    let mut config = if config_path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        config
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::default();
        save_config(&config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        config
    };

    config.apply_env_overrides(std::env::vars());
    Ok(config)
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    let config_path = get_config_path();

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(&config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_has_every_backend() {
        let config = AppConfig::default();
        for kind in BackendKind::ALL {
            assert!(config.backend_config(kind).is_object());
        }
        assert_eq!(config.get_bind_address(), "0.0.0.0:8501");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(vars(&[
            ("VECTOR_SEARCH_APP_PINECONE_API_KEY", "12345"),
            ("VECTOR_SEARCH_APP_MONGODB_NUM_CANDIDATES", "200"),
            ("VECTOR_SEARCH_APP_SERVER_PORT", "9000"),
            ("VECTOR_SEARCH_APP_QDRANT_", "ignored"),
            ("UNRELATED", "x"),
        ]));

        assert_eq!(config.backend_config(BackendKind::Pinecone)["api_key"], "12345");
        assert_eq!(config.backend_config(BackendKind::MongoDb)["num_candidates"], 200);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.backend_config(BackendKind::Qdrant)["location"], ":memory:");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"server":{"host":"127.0.0.1","port":1}}"#).unwrap();
        assert_eq!(config.embedding.provider, "fastembed");
        assert_eq!(config.backends.len(), 4);
    }
}

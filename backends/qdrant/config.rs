//! Qdrant backend configuration

use serde::{Deserialize, Serialize};

/// In-process location / 进程内存储
pub const MEMORY_LOCATION: &str = ":memory:";

/// Qdrant配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// ":memory:" or a server URL such as http://localhost:6333
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_collection")]
    pub collection_name: String,
    /// Only sent to remote servers / 远程服务 API key
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_location() -> String {
    MEMORY_LOCATION.to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            collection_name: default_collection(),
            api_key: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl QdrantConfig {
    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }
}

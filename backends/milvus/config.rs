//! Milvus backend configuration

use serde::{Deserialize, Serialize};

use crate::models::ScoreKind;

/// Milvus配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilvusConfig {
    /// REST endpoint, e.g. http://localhost:19530
    #[serde(default = "default_uri")]
    pub uri: String,
    /// "user:password" or API key; empty disables auth
    #[serde(default)]
    pub token: String,
    /// Database name; empty uses the server default
    #[serde(default)]
    pub db_name: String,
    #[serde(default = "default_collection")]
    pub collection_name: String,
    /// COSINE, IP or L2
    #[serde(default = "default_metric")]
    pub metric_type: String,
    /// Request timeout (seconds) / 请求超时
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_uri() -> String {
    "http://localhost:19530".to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_metric() -> String {
    "COSINE".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            token: String::new(),
            db_name: String::new(),
            collection_name: default_collection(),
            metric_type: default_metric(),
            timeout_secs: default_timeout(),
        }
    }
}

impl MilvusConfig {
    /// Milvus reports a "distance" field whatever the metric; COSINE and IP are similarities
    pub fn score_kind(&self) -> ScoreKind {
        match self.metric_type.to_uppercase().as_str() {
            "COSINE" | "IP" => ScoreKind::Similarity,
            _ => ScoreKind::Distance,
        }
    }
}

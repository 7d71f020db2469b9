//! Pinecone backend configuration

use serde::{Deserialize, Serialize};

/// Pinecone配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_cloud")]
    pub cloud: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Integrated embedding model / 托管向量模型
    #[serde(default = "default_model")]
    pub model: String,
    /// Control plane base URL / 控制面地址
    #[serde(default = "default_control_url")]
    pub control_url: String,
    /// How long to wait for a new index to become ready (seconds)
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_index_name() -> String {
    "documents".to_string()
}

fn default_namespace() -> String {
    "namespace".to_string()
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_model() -> String {
    "llama-text-embed-v2".to_string()
}

fn default_control_url() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_ready_timeout() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_timeout() -> u64 {
    60
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            index_name: default_index_name(),
            namespace: default_namespace(),
            cloud: default_cloud(),
            region: default_region(),
            model: default_model(),
            control_url: default_control_url(),
            ready_timeout_secs: default_ready_timeout(),
            poll_interval_ms: default_poll_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

//! Pinecone 托管向量服务后端
//!
//! The index is created for an integrated embedding model, so records are
//! written and searched as raw text.

mod config;
mod driver;

pub use config::PineconeConfig;
pub use driver::PineconeBackend;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::models::ScoreKind;
use crate::vector::{BackendContext, BackendFactory, BackendKind, Capability, ConfigItem, VectorBackend};

/// Pinecone 后端工厂
pub struct PineconeBackendFactory;

#[async_trait]
impl BackendFactory for PineconeBackendFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Pinecone
    }

    fn description(&self) -> &'static str {
        "Managed vector service with an integrated embedding model"
    }

    fn capabilities(&self, _config: &Value) -> Capability {
        Capability {
            embeds_text: true,
            score_kind: ScoreKind::Similarity,
        }
    }

    fn config_items(&self) -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("api_key", "password")
                .required()
                .help("Pinecone API key"),
            ConfigItem::new("index_name", "string")
                .default("documents"),
            ConfigItem::new("namespace", "string")
                .default("namespace"),
            ConfigItem::new("cloud", "string")
                .default("aws"),
            ConfigItem::new("region", "string")
                .default("us-east-1"),
            ConfigItem::new("model", "string")
                .default("llama-text-embed-v2")
                .help("Embedding model used when the index is created"),
        ]
    }

    async fn create_backend(&self, ctx: BackendContext) -> Result<Box<dyn VectorBackend>> {
        let config: PineconeConfig = serde_json::from_value(ctx.config)
            .map_err(|e| anyhow!("配置解析失败: {}", e))?;
        Ok(Box::new(PineconeBackend::new(config)?))
    }
}

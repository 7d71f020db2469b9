//! Milvus 向量数据库后端
//!
//! Talks to the Milvus REST API (v2). Vectors are computed by the caller.

mod config;
mod driver;

pub use config::MilvusConfig;
pub use driver::MilvusBackend;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::vector::{BackendContext, BackendFactory, BackendKind, Capability, ConfigItem, VectorBackend};

/// Milvus 后端工厂
pub struct MilvusBackendFactory;

fn parse_config(config: &Value) -> Result<MilvusConfig> {
    serde_json::from_value(config.clone()).map_err(|e| anyhow!("配置解析失败: {}", e))
}

#[async_trait]
impl BackendFactory for MilvusBackendFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Milvus
    }

    fn description(&self) -> &'static str {
        "Self-hosted vector engine; vectors are computed by this service"
    }

    fn capabilities(&self, config: &Value) -> Capability {
        let config = parse_config(config).unwrap_or_default();
        Capability {
            embeds_text: false,
            score_kind: config.score_kind(),
        }
    }

    fn config_items(&self) -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("uri", "string")
                .required()
                .default("http://localhost:19530")
                .help("Milvus REST endpoint"),
            ConfigItem::new("token", "password")
                .help("user:password or API key (optional)"),
            ConfigItem::new("db_name", "string")
                .help("Database name (optional)"),
            ConfigItem::new("collection_name", "string")
                .default("documents"),
            ConfigItem::new("metric_type", "select")
                .default("COSINE")
                .help("COSINE, IP or L2"),
        ]
    }

    async fn create_backend(&self, ctx: BackendContext) -> Result<Box<dyn VectorBackend>> {
        let config = parse_config(&ctx.config)?;
        Ok(Box::new(MilvusBackend::new(config, ctx.embedder.dimension())?))
    }
}

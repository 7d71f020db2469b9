//! MongoDB Atlas Vector Search 后端

mod config;
mod driver;

pub use config::MongoConfig;
pub use driver::MongoBackend;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::models::ScoreKind;
use crate::vector::{BackendContext, BackendFactory, BackendKind, Capability, ConfigItem, VectorBackend};

/// MongoDB 后端工厂
pub struct MongoBackendFactory;

#[async_trait]
impl BackendFactory for MongoBackendFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::MongoDb
    }

    fn description(&self) -> &'static str {
        "Document database with Atlas Vector Search"
    }

    fn capabilities(&self, _config: &Value) -> Capability {
        Capability {
            embeds_text: false,
            score_kind: ScoreKind::Similarity,
        }
    }

    fn config_items(&self) -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("uri", "string")
                .required()
                .default("mongodb://localhost:27017")
                .help("Connection string (mongodb:// or mongodb+srv://)"),
            ConfigItem::new("db_name", "string")
                .default("vector_search"),
            ConfigItem::new("collection_name", "string")
                .default("documents"),
            ConfigItem::new("vector_index", "string")
                .default("default")
                .help("Vector Search index on the embedding field"),
            ConfigItem::new("num_candidates", "number")
                .default("100"),
        ]
    }

    async fn create_backend(&self, ctx: BackendContext) -> Result<Box<dyn VectorBackend>> {
        let config: MongoConfig = serde_json::from_value(ctx.config)
            .map_err(|e| anyhow!("配置解析失败: {}", e))?;
        Ok(Box::new(MongoBackend::connect(config).await?))
    }
}

//! Qdrant 向量检索后端
//!
//! Accepts raw text and embeds it with the shared embedder. The default
//! location `:memory:` keeps points in the process; an http(s) location talks
//! to a Qdrant server.

mod config;
mod memory;
mod rest;

pub use config::QdrantConfig;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::embedding::Embedder;
use crate::error::VectorError;
use crate::models::{ScoreKind, SearchResult};
use crate::vector::{
    BackendContext, BackendFactory, BackendKind, Capability, ConfigItem, Record, VectorBackend,
    VectorQuery,
};
use config::MEMORY_LOCATION;
use memory::MemoryStore;
use rest::QdrantRest;

/// Stored point: vector plus `{document, title}` payload / 点
#[derive(Debug, Clone)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub score: f32,
    pub document: String,
    pub title: String,
}

enum Store {
    Memory(MemoryStore),
    Remote(QdrantRest),
}

pub struct QdrantBackend {
    store: Store,
    embedder: Arc<dyn Embedder>,
}

impl QdrantBackend {
    pub fn new(config: &QdrantConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = if config.location == MEMORY_LOCATION {
            Store::Memory(MemoryStore::new())
        } else if config.is_remote() {
            Store::Remote(QdrantRest::new(config)?)
        } else {
            return Err(VectorError::ConnectionFailed(format!(
                "unsupported Qdrant location: {}",
                config.location
            ))
            .into());
        };
        Ok(Self { store, embedder })
    }

    async fn embed(&self, texts: &[String], classify: fn(String) -> VectorError) -> Result<Vec<Vec<f32>>> {
        let vectors = self
            .embedder
            .embed(texts)
            .await
            .map_err(|e| classify(format!("embedding: {:#}", e)))?;
        if vectors.len() != texts.len() {
            return Err(classify(format!(
                "embedding returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            ))
            .into());
        }
        Ok(vectors)
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Qdrant
    }

    fn capabilities(&self) -> Capability {
        Capability {
            embeds_text: true,
            score_kind: ScoreKind::Similarity,
        }
    }

    async fn ensure_ready(&self) -> Result<()> {
        match &self.store {
            Store::Memory(_) => {
                tracing::info!("Qdrant running in memory");
                Ok(())
            }
            Store::Remote(rest) => rest.ensure_collection(self.embedder.dimension()).await,
        }
    }

    async fn write_batch(&self, records: Vec<Record>) -> Result<()> {
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embed(&texts, VectorError::WriteFailed).await?;

        let points: Vec<Point> = records
            .into_iter()
            .zip(vectors)
            .map(|(record, vector)| Point {
                id: uuid::Uuid::new_v4().to_string(),
                vector,
                document: record.text,
                title: record.title,
            })
            .collect();

        let count = points.len();
        match &self.store {
            Store::Memory(store) => {
                store.upsert(points);
                tracing::debug!("Qdrant stored {} points ({} in memory)", count, store.len());
            }
            Store::Remote(rest) => {
                rest.upsert(points).await?;
                tracing::debug!("Qdrant stored {} points", count);
            }
        }
        Ok(())
    }

    async fn query(&self, query: VectorQuery, top_k: usize) -> Result<Vec<SearchResult>> {
        let text = query.into_text()?;
        let mut vectors = self.embed(&[text], VectorError::QueryFailed).await?;
        let vector = vectors.remove(0);

        let hits = match &self.store {
            Store::Memory(store) => store.search(&vector, top_k),
            Store::Remote(rest) => rest.search(vector, top_k).await?,
        };
        Ok(hits
            .into_iter()
            .map(|hit| SearchResult::new(hit.title, hit.document, hit.score))
            .collect())
    }
}

/// Qdrant 后端工厂
pub struct QdrantBackendFactory;

#[async_trait]
impl BackendFactory for QdrantBackendFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Qdrant
    }

    fn description(&self) -> &'static str {
        "Vector search engine; in memory by default, or a Qdrant server"
    }

    fn capabilities(&self, _config: &Value) -> Capability {
        Capability {
            embeds_text: true,
            score_kind: ScoreKind::Similarity,
        }
    }

    fn config_items(&self) -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("location", "string")
                .required()
                .default(MEMORY_LOCATION)
                .help(":memory: or a server URL such as http://localhost:6333"),
            ConfigItem::new("collection_name", "string")
                .default("documents"),
            ConfigItem::new("api_key", "password")
                .help("Server API key (optional)"),
        ]
    }

    async fn create_backend(&self, ctx: BackendContext) -> Result<Box<dyn VectorBackend>> {
        let config: QdrantConfig = serde_json::from_value(ctx.config)
            .map_err(|e| anyhow!("配置解析失败: {}", e))?;
        Ok(Box::new(QdrantBackend::new(&config, ctx.embedder)?))
    }
}

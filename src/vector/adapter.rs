//! Document adapter - turns documents and queries into backend calls / 文档适配器
//!
//! - index: embed (when the backend needs vectors) and write one batch
//! - search: embed the query (same condition) and normalize hits
//!
//! Results keep the order the backend returned; nothing is re-ranked.

use std::sync::Arc;
use anyhow::Result;

use super::{Record, VectorBackend, VectorQuery};
use crate::embedding::Embedder;
use crate::error::VectorError;
use crate::models::{Document, SearchResult};

/// Default number of search results / 默认返回条数
pub const DEFAULT_TOP_K: usize = 3;

/// Backend-agnostic index/search operations / 与后端无关的索引和搜索
#[derive(Clone)]
pub struct DocumentAdapter {
    embedder: Arc<dyn Embedder>,
}

impl DocumentAdapter {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Embed texts and check count and dimensions / 生成并校验向量
    async fn embed_checked(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed(texts).await?;

        if vectors.len() != texts.len() {
            return Err(VectorError::EmbeddingFailed(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            ))
            .into());
        }

        let expected = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(VectorError::DimensionMismatch {
                expected,
                actual: bad.len(),
            }
            .into());
        }

        Ok(vectors)
    }

    /// Index a document batch / 索引一批文档
    ///
    /// An empty batch never reaches the backend.
    pub async fn index(&self, backend: &dyn VectorBackend, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            tracing::debug!("Empty batch, nothing to index on {}", backend.kind().as_str());
            return Ok(());
        }

        let records = if backend.capabilities().embeds_text {
            documents
                .iter()
                .map(|doc| Record {
                    title: doc.title.clone(),
                    text: doc.text.clone(),
                    vector: None,
                })
                .collect()
        } else {
            let texts: Vec<String> = documents.iter().map(|doc| doc.text.clone()).collect();
            let vectors = self.embed_checked(&texts).await?;
            documents
                .iter()
                .zip(vectors)
                .map(|(doc, vector)| Record {
                    title: doc.title.clone(),
                    text: doc.text.clone(),
                    vector: Some(vector),
                })
                .collect()
        };

        backend.write_batch(records).await?;
        tracing::info!("Indexed {} documents on {}", documents.len(), backend.kind().as_str());
        Ok(())
    }

    /// Similarity search / 相似度搜索
    pub async fn search(
        &self,
        backend: &dyn VectorBackend,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query = if backend.capabilities().embeds_text {
            VectorQuery::Text(query.to_string())
        } else {
            let mut vectors = self.embed_checked(&[query.to_string()]).await?;
            VectorQuery::Vector(vectors.remove(0))
        };

        let mut results = backend.query(query, top_k).await?;
        results.truncate(top_k);
        tracing::debug!("Search on {} returned {} hits", backend.kind().as_str(), results.len());
        Ok(results)
    }
}

//! FastEmbed ONNX embedder / 本地 ONNX 向量模型
//!
//! Uses `BAAI/bge-small-en-v1.5` (384 dimensions). The model is downloaded on
//! first use into the cache directory. Inference runs on the blocking pool.

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::Embedder;
use crate::error::VectorError;

const MODEL_NAME: &str = "BAAI/bge-small-en-v1.5";
const MODEL_DIMENSION: usize = 384;

pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
}

impl FastEmbedder {
    pub fn new(cache_dir: Option<&str>) -> Result<Self> {
        let mut options = InitOptions::new(EmbeddingModel::BGESmallENV15)
            .with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(PathBuf::from(dir));
        }

        let model = TextEmbedding::try_new(options)
            .with_context(|| format!("loading embedding model {}", MODEL_NAME))?;
        Ok(Self {
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        MODEL_DIMENSION
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .context("embedding task panicked")?
            .map_err(|e| VectorError::EmbeddingFailed(e.to_string()).into())
    }
}

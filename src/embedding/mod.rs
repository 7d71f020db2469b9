//! Embedding providers / 向量模型
//!
//! - `fastembed`: local BGE-small ONNX model (default, cargo feature `fastembed`)
//! - `hash`: deterministic feature hashing, offline fallback with no semantic signal

pub mod hash;
#[cfg(feature = "fastembed")]
pub mod fastembed_embedder;

pub use hash::HashEmbedder;

use std::sync::Arc;
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::config::EmbeddingConfig;

/// Text to fixed-length vector, order preserving / 文本转定长向量
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name for logs / 模型名称
    fn model_name(&self) -> &str;

    /// Vector size of every output / 向量维度
    fn dimension(&self) -> usize;

    /// One vector per input, same order / 批量生成向量
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Build the configured embedder / 根据配置创建向量模型
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.provider.to_lowercase().as_str() {
        "hash" => Arc::new(HashEmbedder::new(config.dimension)),
        #[cfg(feature = "fastembed")]
        "fastembed" => Arc::new(fastembed_embedder::FastEmbedder::new(config.model_cache_dir.as_deref())?),
        #[cfg(not(feature = "fastembed"))]
        "fastembed" => {
            return Err(anyhow!(
                "embedding provider 'fastembed' requires building with --features fastembed"
            ))
        }
        other => return Err(anyhow!("Unknown embedding provider: {}", other)),
    };

    tracing::info!(
        "Embedding model ready: {} ({} dimensions)",
        embedder.model_name(),
        embedder.dimension()
    );
    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_hash_embedder() {
        let config = EmbeddingConfig {
            provider: "hash".to_string(),
            ..Default::default()
        };
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn test_default_provider_is_fastembed() {
        assert_eq!(EmbeddingConfig::default().provider, "fastembed");
    }

    #[cfg(not(feature = "fastembed"))]
    #[test]
    fn test_fastembed_requires_feature() {
        assert!(build_embedder(&EmbeddingConfig::default()).is_err());
    }

    #[test]
    fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..Default::default()
        };
        assert!(build_embedder(&config).is_err());
    }
}

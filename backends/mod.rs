// Backend package / 后端包
pub mod milvus;
pub mod pinecone;
pub mod mongo;
pub mod qdrant;

use crate::vector::ConnectionRegistry;

/// Register all backends to ConnectionRegistry / 注册所有后端
pub async fn register_all(registry: &ConnectionRegistry) -> anyhow::Result<()> {
    // Register Milvus (self-hosted, vectors computed by us) / 注册 Milvus
    registry.register_factory(Box::new(milvus::MilvusBackendFactory)).await?;
    // Register Pinecone (integrated embedding model) / 注册 Pinecone
    registry.register_factory(Box::new(pinecone::PineconeBackendFactory)).await?;
    // Register MongoDB Atlas Vector Search / 注册 MongoDB
    registry.register_factory(Box::new(mongo::MongoBackendFactory)).await?;
    // Register Qdrant (embeds text itself) / 注册 Qdrant
    registry.register_factory(Box::new(qdrant::QdrantBackendFactory)).await?;
    Ok(())
}

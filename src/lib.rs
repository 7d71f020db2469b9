pub mod config;
pub mod error;
pub mod models;
pub mod archive;
pub mod embedding;
pub mod vector;

// Backend modules (point to project root backends via path attribute) / 后端模块
#[path = "../backends/mod.rs"]
pub mod backends;

// Register all vector backends (call unified registration function from backends module) / 注册所有向量后端
pub async fn register_vector_backends(registry: &vector::ConnectionRegistry) -> anyhow::Result<()> {
    backends::register_all(registry).await
}

use thiserror::Error;

/// Failure classes surfaced to the HTTP layer / 错误分类
///
/// Functions still return `anyhow::Result`; callers use `downcast_ref` to
/// recover the class when they need it.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),
    #[error("Backend connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Write operation failed: {0}")]
    WriteFailed(String),
    #[error("Query operation failed: {0}")]
    QueryFailed(String),
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),
    #[error("Invalid vector dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Archive could not be read: {0}")]
    Archive(String),
}

impl VectorError {
    /// Find the classified error anywhere in an anyhow chain
    pub fn find(err: &anyhow::Error) -> Option<&VectorError> {
        err.chain().find_map(|cause| cause.downcast_ref::<VectorError>())
    }
}

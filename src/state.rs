use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use vector_search_app::models::Document;
use vector_search_app::vector::{ConnectionRegistry, DocumentAdapter};

/// Shared application state / 应用状态
pub struct AppState {
    /// One live handle per backend / 后端连接
    pub registry: ConnectionRegistry,
    pub adapter: DocumentAdapter,
    /// Documents from the last upload, replaced by every upload / 上传槽
    pub documents: RwLock<Vec<Document>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(registry: ConnectionRegistry, adapter: DocumentAdapter) -> Self {
        Self {
            registry,
            adapter,
            documents: RwLock::new(Vec::new()),
            started_at: Utc::now(),
        }
    }

    /// Replace the upload slot, returning the titles / 替换上传内容
    pub fn replace_documents(&self, documents: Vec<Document>) -> Vec<String> {
        let titles = documents.iter().map(|d| d.title.clone()).collect();
        *self.documents.write() = documents;
        titles
    }

    pub fn documents_snapshot(&self) -> Vec<Document> {
        self.documents.read().clone()
    }
}

//! MongoDB backend configuration

use serde::{Deserialize, Serialize};

/// MongoDB Atlas 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_collection")]
    pub collection_name: String,
    /// Atlas Vector Search index over the `embedding` field
    #[serde(default = "default_vector_index")]
    pub vector_index: String,
    /// Candidates considered by $vectorSearch; raised to the limit when smaller
    #[serde(default = "default_num_candidates")]
    pub num_candidates: u32,
    #[serde(default = "default_selection_timeout")]
    pub server_selection_timeout_secs: u64,
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_db_name() -> String {
    "vector_search".to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_vector_index() -> String {
    "default".to_string()
}

fn default_num_candidates() -> u32 {
    100
}

fn default_selection_timeout() -> u64 {
    10
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            db_name: default_db_name(),
            collection_name: default_collection(),
            vector_index: default_vector_index(),
            num_candidates: default_num_candidates(),
            server_selection_timeout_secs: default_selection_timeout(),
        }
    }
}

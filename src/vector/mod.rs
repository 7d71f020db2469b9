use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VectorError;
use crate::models::{ScoreKind, SearchResult};

/// Supported vector database backends / 支持的向量数据库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Milvus,
    Pinecone,
    #[serde(rename = "mongodb")]
    MongoDb,
    Qdrant,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Milvus,
        BackendKind::Pinecone,
        BackendKind::MongoDb,
        BackendKind::Qdrant,
    ];

    /// Identifier used in config keys and URLs / 标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Milvus => "milvus",
            BackendKind::Pinecone => "pinecone",
            BackendKind::MongoDb => "mongodb",
            BackendKind::Qdrant => "qdrant",
        }
    }

    /// Name shown in the front end / 显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            BackendKind::Milvus => "Milvus",
            BackendKind::Pinecone => "Pinecone",
            BackendKind::MongoDb => "MongoDB",
            BackendKind::Qdrant => "QDrant",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BackendKind {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| VectorError::UnknownBackend(s.to_string()))
    }
}

/// Configuration item definition / 配置项定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ConfigItem {
    pub fn new(name: &str, item_type: &str) -> Self {
        Self {
            name: name.to_string(),
            item_type: item_type.to_string(),
            default: None,
            required: false,
            help: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, val: &str) -> Self {
        self.default = Some(val.to_string());
        self
    }

    pub fn help(mut self, val: &str) -> Self {
        self.help = Some(val.to_string());
        self
    }
}

/// Backend capability declaration / 后端能力声明
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Backend computes embeddings from raw text itself / 后端自行生成向量
    pub embeds_text: bool,
    /// Meaning of the reported score / 分数含义
    pub score_kind: ScoreKind,
}

/// Complete backend information for the front end / 后端完整信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    pub id: BackendKind,
    pub name: String,
    pub description: String,
    pub capabilities: Capability,
    pub config_items: Vec<ConfigItem>,
}

/// One record handed to `write_batch` / 写入记录
///
/// `vector` is set exactly when the backend does not embed text itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub title: String,
    pub text: String,
    pub vector: Option<Vec<f32>>,
}

/// Query handed to `query` / 查询输入
#[derive(Debug, Clone, PartialEq)]
pub enum VectorQuery {
    Vector(Vec<f32>),
    Text(String),
}

impl VectorQuery {
    /// Raw text of a text query; errors for backends that got a vector / 取文本
    pub fn into_text(self) -> Result<String> {
        match self {
            VectorQuery::Text(text) => Ok(text),
            VectorQuery::Vector(_) => Err(VectorError::QueryFailed(
                "backend expects a text query".to_string(),
            )
            .into()),
        }
    }

    /// Query vector; errors for backends that got raw text / 取向量
    pub fn into_vector(self) -> Result<Vec<f32>> {
        match self {
            VectorQuery::Vector(vector) => Ok(vector),
            VectorQuery::Text(_) => Err(VectorError::QueryFailed(
                "backend expects a query vector".to_string(),
            )
            .into()),
        }
    }
}

/// Vector backend interface (provides only primitive operations) / 向量后端接口
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Backend identifier / 后端标识
    fn kind(&self) -> BackendKind;

    /// Backend capabilities / 后端能力
    fn capabilities(&self) -> Capability;

    /// Create collection/index or open the connection / 准备集合或连接
    async fn ensure_ready(&self) -> Result<()>;

    /// Write all records in one logical batch / 批量写入
    async fn write_batch(&self, records: Vec<Record>) -> Result<()>;

    /// Nearest-neighbour query, results in backend order / 相似度查询
    async fn query(&self, query: VectorQuery, top_k: usize) -> Result<Vec<SearchResult>>;

    /// Release resources held by the handle / 关闭连接
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub mod manager;
pub mod adapter;

pub use manager::{ConnectionRegistry, BackendFactory, BackendContext, BackendHandle};
pub use adapter::{DocumentAdapter, DEFAULT_TOP_K};

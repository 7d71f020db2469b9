use serde::{Deserialize, Serialize};

/// Uploaded document / 上传的文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Display label, usually the file name / 显示名称
    pub title: String,
    pub text: String,
}

impl Document {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Normalized search hit / 统一的搜索结果
///
/// `score` is whatever the backend reports. Distances and similarities are not
/// converted into each other, see [`ScoreKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub text: String,
    pub score: f32,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            score,
        }
    }
}

/// How a backend's score should be read / 分数含义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Higher is more relevant
    Similarity,
    /// Lower is more relevant
    Distance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub title: String,
    pub chars: usize,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            chars: doc.text.chars().count(),
        }
    }
}

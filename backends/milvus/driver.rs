//! Milvus REST 客户端
//!
//! Endpoints used (all POST, JSON in and out):
//! - /v2/vectordb/collections/has
//! - /v2/vectordb/collections/create
//! - /v2/vectordb/entities/insert
//! - /v2/vectordb/entities/search
//!
//! Every response carries a `code`; anything other than 0 (or 200 on older
//! servers) is an error even with HTTP 200.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::config::MilvusConfig;
use crate::error::VectorError;
use crate::models::SearchResult;
use crate::vector::{BackendKind, Capability, Record, VectorBackend, VectorQuery};

/// Vector field name / 向量字段名
const VECTOR_FIELD: &str = "vector";

pub struct MilvusBackend {
    config: MilvusConfig,
    client: Client,
    dimension: usize,
    /// Primary keys for inserted rows, seeded from the clock so reconnects do not collide
    next_id: AtomicI64,
}

impl MilvusBackend {
    pub fn new(config: MilvusConfig, dimension: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self {
            config,
            client,
            dimension,
            next_id: AtomicI64::new(chrono::Utc::now().timestamp_millis() * 1000),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/vectordb/{}", self.config.uri.trim_end_matches('/'), path)
    }

    /// Body fields shared by every request / 公共请求字段
    fn base_body(&self) -> serde_json::Map<String, Value> {
        let mut body = serde_json::Map::new();
        if !self.config.db_name.is_empty() {
            body.insert("dbName".to_string(), json!(self.config.db_name));
        }
        body.insert("collectionName".to_string(), json!(self.config.collection_name));
        body
    }

    /// POST and unwrap the `code` envelope; failures are classified by `classify`
    async fn call(
        &self,
        path: &str,
        body: serde_json::Map<String, Value>,
        classify: fn(String) -> VectorError,
    ) -> Result<Value> {
        let url = self.url(path);
        tracing::debug!("Milvus request: {}", url);

        let mut req = self.client.post(&url).json(&Value::Object(body));
        if !self.config.token.is_empty() {
            req = req.bearer_auth(&self.config.token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| classify(format!("{}: {}", path, e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| classify(format!("{}: {}", path, e)))?;

        if !status.is_success() {
            return Err(classify(format!("{} returned HTTP {}: {}", path, status, text)).into());
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| classify(format!("{}: invalid JSON: {}", path, e)))?;
        check_code(&value).map_err(|msg| classify(format!("{}: {}", path, msg)))?;
        Ok(value)
    }

    async fn has_collection(&self) -> Result<bool> {
        let resp = self
            .call("collections/has", self.base_body(), VectorError::ConnectionFailed)
            .await?;
        Ok(resp["data"]["has"].as_bool().unwrap_or(false))
    }

    fn allocate_ids(&self, count: usize) -> i64 {
        self.next_id.fetch_add(count as i64, Ordering::SeqCst)
    }
}

/// Check the response envelope / 检查响应码
fn check_code(resp: &Value) -> std::result::Result<(), String> {
    match resp.get("code").and_then(|c| c.as_i64()) {
        None | Some(0) | Some(200) => Ok(()),
        Some(code) => {
            let message = resp["message"].as_str().unwrap_or("unknown error");
            Err(format!("code {}: {}", code, message))
        }
    }
}

/// Rows for entities/insert / 构造插入行
fn insert_rows(records: &[Record], first_id: i64) -> Result<Vec<Value>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| -> Result<Value> {
            let vector = record.vector.as_ref().ok_or_else(|| {
                VectorError::WriteFailed(format!("record {} has no vector", record.title))
            })?;
            Ok(json!({
                "id": first_id + i as i64,
                VECTOR_FIELD: vector,
                "title": record.title,
                "text": record.text,
            }))
        })
        .collect()
}

/// Hits from entities/search / 解析搜索结果
///
/// `data` is a flat hit list for one query vector; some server versions nest
/// it one level per query.
fn parse_hits(resp: &Value) -> Vec<SearchResult> {
    let Some(data) = resp["data"].as_array() else {
        return Vec::new();
    };

    let hits: Vec<&Value> = if data.first().map(|d| d.is_array()).unwrap_or(false) {
        data[0].as_array().map(|a| a.iter().collect()).unwrap_or_default()
    } else {
        data.iter().collect()
    };

    hits.into_iter()
        .map(|hit| {
            let field = |name: &str| {
                hit.get(name)
                    .or_else(|| hit.get("entity").and_then(|e| e.get(name)))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            let score = hit["distance"].as_f64().unwrap_or(0.0) as f32;
            SearchResult::new(field("title"), field("text"), score)
        })
        .collect()
}

#[async_trait]
impl VectorBackend for MilvusBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Milvus
    }

    fn capabilities(&self) -> Capability {
        Capability {
            embeds_text: false,
            score_kind: self.config.score_kind(),
        }
    }

    async fn ensure_ready(&self) -> Result<()> {
        if self.has_collection().await? {
            tracing::debug!("Milvus collection exists: {}", self.config.collection_name);
            return Ok(());
        }

        let mut body = self.base_body();
        body.insert("dimension".to_string(), json!(self.dimension));
        body.insert("metricType".to_string(), json!(self.config.metric_type));
        self.call("collections/create", body, VectorError::ConnectionFailed)
            .await?;

        tracing::info!(
            "Milvus collection created: {} (dim={}, metric={})",
            self.config.collection_name,
            self.dimension,
            self.config.metric_type
        );
        Ok(())
    }

    async fn write_batch(&self, records: Vec<Record>) -> Result<()> {
        let first_id = self.allocate_ids(records.len());
        let rows = insert_rows(&records, first_id)?;

        let mut body = self.base_body();
        body.insert("data".to_string(), Value::Array(rows));
        let resp = self
            .call("entities/insert", body, VectorError::WriteFailed)
            .await?;

        tracing::debug!(
            "Milvus inserted {} rows",
            resp["data"]["insertCount"].as_u64().unwrap_or(records.len() as u64)
        );
        Ok(())
    }

    async fn query(&self, query: VectorQuery, top_k: usize) -> Result<Vec<SearchResult>> {
        let vector = query.into_vector()?;

        let mut body = self.base_body();
        body.insert("data".to_string(), json!([vector]));
        body.insert("annsField".to_string(), json!(VECTOR_FIELD));
        body.insert("limit".to_string(), json!(top_k));
        body.insert("outputFields".to_string(), json!(["title", "text"]));

        let resp = self
            .call("entities/search", body, VectorError::QueryFailed)
            .await?;
        Ok(parse_hits(&resp))
    }
}

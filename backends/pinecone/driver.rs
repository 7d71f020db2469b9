//! Pinecone REST 客户端
//!
//! Control plane: describe / create-for-model on `control_url`.
//! Data plane: records upsert (NDJSON) and search on the index host.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};

use super::config::PineconeConfig;
use crate::error::VectorError;
use crate::models::{ScoreKind, SearchResult};
use crate::vector::{BackendKind, Capability, Record, VectorBackend, VectorQuery};

const API_VERSION: &str = "2025-01";
/// Max records per upsert request / 单次写入上限
pub const UPSERT_CHUNK: usize = 96;

pub struct PineconeBackend {
    config: PineconeConfig,
    client: Client,
    /// Data plane base URL, known once the index is described
    host: RwLock<Option<String>>,
}

impl PineconeBackend {
    pub fn new(config: PineconeConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(VectorError::ConnectionFailed(
                "Pinecone API key is not configured".to_string(),
            )
            .into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self {
            config,
            client,
            host: RwLock::new(None),
        })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn control_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.control_url.trim_end_matches('/'), path)
    }

    /// Records endpoint with the namespace as one encoded path segment
    fn data_url(&self, action: &str) -> Result<Url> {
        let host = self.host.read().clone().ok_or_else(|| {
            VectorError::ConnectionFailed("Pinecone index host is unknown".to_string())
        })?;
        let mut url = Url::parse(&host)
            .map_err(|e| VectorError::ConnectionFailed(format!("invalid index host {}: {}", host, e)))?;
        url.path_segments_mut()
            .map_err(|_| VectorError::ConnectionFailed(format!("invalid index host {}", host)))?
            .pop_if_empty()
            .extend(["records", "namespaces", self.config.namespace.as_str(), action]);
        Ok(url)
    }

    /// Describe the index; `None` when it does not exist / 查询索引
    async fn describe_index(&self) -> Result<Option<Value>> {
        let url = self.control_url(&format!("indexes/{}", self.config.index_name));
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|e| VectorError::ConnectionFailed(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = read_json(resp, VectorError::ConnectionFailed).await?;
        Ok(Some(body))
    }

    async fn create_index(&self) -> Result<()> {
        let body = json!({
            "name": self.config.index_name,
            "cloud": self.config.cloud,
            "region": self.config.region,
            "embed": {
                "model": self.config.model,
                "field_map": {"text": "text"},
            },
        });

        let resp = self
            .authed(self.client.post(self.control_url("indexes/create-for-model")))
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorError::ConnectionFailed(e.to_string()))?;
        read_json(resp, VectorError::ConnectionFailed).await?;

        tracing::info!(
            "Pinecone index created: {} ({} {}/{})",
            self.config.index_name,
            self.config.model,
            self.config.cloud,
            self.config.region
        );
        Ok(())
    }

    /// Poll until the index reports ready / 等待索引就绪
    async fn wait_ready(&self) -> Result<Value> {
        let deadline = Instant::now() + Duration::from_secs(self.config.ready_timeout_secs);
        loop {
            if let Some(desc) = self.describe_index().await? {
                if desc["status"]["ready"].as_bool().unwrap_or(false) {
                    return Ok(desc);
                }
            }
            if Instant::now() >= deadline {
                return Err(VectorError::ConnectionFailed(format!(
                    "index {} not ready after {}s",
                    self.config.index_name, self.config.ready_timeout_secs
                ))
                .into());
            }
            tracing::debug!("Waiting for Pinecone index {}", self.config.index_name);
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    async fn upsert_chunk(&self, url: &Url, chunk: &[Record]) -> Result<()> {
        let resp = self
            .authed(self.client.post(url.clone()))
            .header("Content-Type", "application/x-ndjson")
            .body(ndjson_records(chunk)?)
            .send()
            .await
            .map_err(|e| VectorError::WriteFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(VectorError::WriteFailed(format!("HTTP {}: {}", status, text)).into());
        }
        Ok(())
    }
}

/// Read a JSON body, classifying non-2xx and decode failures / 读取响应
async fn read_json(resp: reqwest::Response, classify: fn(String) -> VectorError) -> Result<Value> {
    let status = resp.status();
    let text = resp.text().await.map_err(|e| classify(e.to_string()))?;
    if !status.is_success() {
        return Err(classify(format!("HTTP {}: {}", status, text)).into());
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).map_err(|e| classify(format!("invalid JSON: {}", e)))?)
}

/// Data plane host as a URL / 数据面地址
fn host_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// One JSON object per line with a fresh id / 构造 NDJSON
fn ndjson_records(records: &[Record]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        let line = json!({
            "_id": uuid::Uuid::new_v4().to_string(),
            "title": record.title,
            "text": record.text,
        });
        out.push_str(&serde_json::to_string(&line)?);
        out.push('\n');
    }
    Ok(out)
}

fn parse_hits(resp: &Value) -> Vec<SearchResult> {
    resp["result"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .map(|hit| {
                    let fields = &hit["fields"];
                    SearchResult::new(
                        fields["title"].as_str().unwrap_or_default(),
                        fields["text"].as_str().unwrap_or_default(),
                        hit["_score"].as_f64().unwrap_or(0.0) as f32,
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorBackend for PineconeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Pinecone
    }

    fn capabilities(&self) -> Capability {
        Capability {
            embeds_text: true,
            score_kind: ScoreKind::Similarity,
        }
    }

    async fn ensure_ready(&self) -> Result<()> {
        if self.describe_index().await?.is_none() {
            self.create_index().await?;
        }
        let desc = self.wait_ready().await?;

        let host = desc["host"].as_str().ok_or_else(|| {
            VectorError::ConnectionFailed("index description has no host".to_string())
        })?;
        let host = host_url(host);
        tracing::debug!("Pinecone index {} at {}", self.config.index_name, host);
        *self.host.write() = Some(host);
        Ok(())
    }

    async fn write_batch(&self, records: Vec<Record>) -> Result<()> {
        let url = self.data_url("upsert")?;
        for chunk in records.chunks(UPSERT_CHUNK) {
            self.upsert_chunk(&url, chunk).await?;
        }
        tracing::debug!(
            "Pinecone upserted {} records into namespace {}",
            records.len(),
            self.config.namespace
        );
        Ok(())
    }

    async fn query(&self, query: VectorQuery, top_k: usize) -> Result<Vec<SearchResult>> {
        let text = query.into_text()?;
        let body = json!({
            "query": {
                "inputs": {"text": text},
                "top_k": top_k,
            },
            "fields": ["title", "text"],
        });

        let resp = self
            .authed(self.client.post(self.data_url("search")?))
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorError::QueryFailed(e.to_string()))?;
        let value = read_json(resp, VectorError::QueryFailed).await?;
        Ok(parse_hits(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::testing::serve;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as HttpStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakePinecone {
        base: String,
        exists: bool,
        /// describe calls left before the index reports ready
        pending: usize,
        create_body: Option<Value>,
        upsert_calls: usize,
        records: Vec<Value>,
        namespaces: Vec<String>,
        search_body: Option<Value>,
        api_keys: Vec<String>,
    }

    type Shared = Arc<Mutex<FakePinecone>>;

    fn note_key(s: &mut FakePinecone, headers: &HeaderMap) {
        if let Some(key) = headers.get("Api-Key").and_then(|v| v.to_str().ok()) {
            s.api_keys.push(key.to_string());
        }
    }

    async fn describe(
        State(s): State<Shared>,
        Path(name): Path<String>,
        headers: HeaderMap,
    ) -> axum::response::Response {
        let mut s = s.lock();
        note_key(&mut s, &headers);
        if !s.exists {
            return (HttpStatus::NOT_FOUND, Json(json!({"error": "not found"}))).into_response();
        }
        let ready = s.pending == 0;
        s.pending = s.pending.saturating_sub(1);
        Json(json!({"name": name, "host": s.base, "status": {"ready": ready}})).into_response()
    }

    async fn create(State(s): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
        let mut s = s.lock();
        s.exists = true;
        s.pending = 2;
        s.create_body = Some(body);
        (HttpStatus::CREATED, Json(json!({})))
    }

    async fn upsert(
        State(s): State<Shared>,
        Path(ns): Path<String>,
        headers: HeaderMap,
        body: String,
    ) -> HttpStatus {
        let mut s = s.lock();
        assert_eq!(headers["content-type"], "application/x-ndjson");
        s.upsert_calls += 1;
        s.namespaces.push(ns);
        for line in body.lines() {
            s.records.push(serde_json::from_str(line).unwrap());
        }
        HttpStatus::CREATED
    }

    /// Scores records by words shared with the query
    async fn search(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
        let mut s = s.lock();
        let query = body["query"]["inputs"]["text"].as_str().unwrap().to_lowercase();
        let top_k = body["query"]["top_k"].as_u64().unwrap() as usize;
        s.search_body = Some(body.clone());

        let mut hits: Vec<Value> = s
            .records
            .iter()
            .map(|r| {
                let text = r["text"].as_str().unwrap().to_lowercase();
                let shared = query.split_whitespace().filter(|w| text.contains(w)).count();
                json!({
                    "_id": r["_id"],
                    "_score": shared as f64,
                    "fields": {"title": r["title"], "text": r["text"]},
                })
            })
            .collect();
        hits.sort_by(|a, b| b["_score"].as_f64().unwrap().total_cmp(&a["_score"].as_f64().unwrap()));
        hits.truncate(top_k);
        Json(json!({"result": {"hits": hits}, "usage": {"read_units": 1}}))
    }

    async fn fake_pinecone() -> (PineconeConfig, Shared) {
        let state = Shared::default();
        let router = Router::new()
            .route("/indexes/:name", get(describe))
            .route("/indexes/create-for-model", post(create))
            .route("/records/namespaces/:ns/upsert", post(upsert))
            .route("/records/namespaces/:ns/search", post(search))
            .with_state(state.clone());
        let base = serve(router).await;
        state.lock().base = base.clone();

        let config = PineconeConfig {
            api_key: "test-key".to_string(),
            control_url: base,
            poll_interval_ms: 10,
            ..Default::default()
        };
        (config, state)
    }

    fn record(title: &str, text: &str) -> Record {
        Record { title: title.to_string(), text: text.to_string(), vector: None }
    }

    #[tokio::test]
    async fn test_missing_index_is_created_and_awaited() {
        let (config, state) = fake_pinecone().await;
        let pinecone = PineconeBackend::new(config).unwrap();

        pinecone.ensure_ready().await.unwrap();

        let s = state.lock();
        let body = s.create_body.as_ref().unwrap();
        assert_eq!(body["name"], "documents");
        assert_eq!(body["cloud"], "aws");
        assert_eq!(body["region"], "us-east-1");
        assert_eq!(body["embed"]["model"], "llama-text-embed-v2");
        assert_eq!(body["embed"]["field_map"]["text"], "text");
        assert_eq!(s.pending, 0);
        assert!(s.api_keys.iter().all(|k| k == "test-key"));
    }

    #[tokio::test]
    async fn test_upsert_in_chunks_and_search() {
        let (config, state) = fake_pinecone().await;
        state.lock().exists = true;
        let pinecone = PineconeBackend::new(config).unwrap();
        pinecone.ensure_ready().await.unwrap();
        assert!(state.lock().create_body.is_none());

        let mut records: Vec<Record> = (0..100)
            .map(|i| record(&format!("filler{}.txt", i), "lorem ipsum"))
            .collect();
        records.push(record("a.txt", "cats are mammals"));
        pinecone.write_batch(records).await.unwrap();

        {
            let s = state.lock();
            assert_eq!(s.upsert_calls, 2);
            assert_eq!(s.records.len(), 101);
            assert_ne!(s.records[0]["_id"], s.records[1]["_id"]);
        }

        let hits = pinecone
            .query(VectorQuery::Text("cats mammals".to_string()), 1)
            .await
            .unwrap();
        assert_eq!(hits, vec![SearchResult::new("a.txt", "cats are mammals", 2.0)]);

        let s = state.lock();
        let body = s.search_body.as_ref().unwrap();
        assert_eq!(body["query"]["top_k"], 1);
        assert_eq!(body["fields"], json!(["title", "text"]));
    }

    #[tokio::test]
    async fn test_ready_timeout() {
        let (mut config, state) = fake_pinecone().await;
        {
            let mut s = state.lock();
            s.exists = true;
            s.pending = usize::MAX;
        }
        config.ready_timeout_secs = 0;
        let pinecone = PineconeBackend::new(config).unwrap();

        let err = pinecone.ensure_ready().await.unwrap_err();
        assert!(matches!(VectorError::find(&err), Some(VectorError::ConnectionFailed(_))));
    }

    #[test]
    fn test_requires_api_key() {
        let err = PineconeBackend::new(PineconeConfig::default()).err().unwrap();
        assert!(matches!(VectorError::find(&err), Some(VectorError::ConnectionFailed(_))));
    }

    #[test]
    fn test_host_url() {
        assert_eq!(host_url("docs-abc.svc.pinecone.io"), "https://docs-abc.svc.pinecone.io");
        assert_eq!(host_url("http://127.0.0.1:5080/"), "http://127.0.0.1:5080");
    }

    #[tokio::test]
    async fn test_write_before_ready_fails() {
        let pinecone = PineconeBackend::new(PineconeConfig {
            api_key: "k".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(pinecone.write_batch(vec![record("a.txt", "x")]).await.is_err());
    }

    #[test]
    fn test_namespace_is_one_encoded_segment() {
        let pinecone = PineconeBackend::new(PineconeConfig {
            api_key: "k".to_string(),
            namespace: "team a/b?x".to_string(),
            ..Default::default()
        })
        .unwrap();
        *pinecone.host.write() = Some(host_url("http://127.0.0.1:5080/"));

        let url = pinecone.data_url("upsert").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:5080/records/namespaces/team%20a%2Fb%3Fx/upsert"
        );
        assert_eq!(url.query(), None);
    }

    #[tokio::test]
    async fn test_upsert_reaches_namespace_with_reserved_characters() {
        let (mut config, state) = fake_pinecone().await;
        state.lock().exists = true;
        config.namespace = "team a/b?x".to_string();
        let pinecone = PineconeBackend::new(config).unwrap();
        pinecone.ensure_ready().await.unwrap();

        pinecone.write_batch(vec![record("a.txt", "cats")]).await.unwrap();

        let s = state.lock();
        assert_eq!(s.namespaces, vec!["team a/b?x".to_string()]);
        assert_eq!(s.records.len(), 1);
    }
}

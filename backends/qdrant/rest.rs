//! Qdrant server REST client / 远程 Qdrant
//!
//! - GET  /collections/{name}/exists
//! - PUT  /collections/{name}
//! - PUT  /collections/{name}/points?wait=true
//! - POST /collections/{name}/points/search

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::config::QdrantConfig;
use super::{Point, ScoredPoint};
use crate::error::VectorError;

pub struct QdrantRest {
    client: Client,
    base_url: String,
    collection: String,
    api_key: String,
}

impl QdrantRest {
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self {
            client,
            base_url: config.location.trim_end_matches('/').to_string(),
            collection: config.collection_name.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            req
        } else {
            req.header("api-key", &self.api_key)
        }
    }

    async fn send(&self, req: RequestBuilder, classify: fn(String) -> VectorError) -> Result<Value> {
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| classify(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| classify(e.to_string()))?;
        if !status.is_success() {
            return Err(classify(format!("HTTP {}: {}", status, text)).into());
        }
        Ok(serde_json::from_str(&text).map_err(|e| classify(format!("invalid JSON: {}", e)))?)
    }

    /// Create the collection when missing / 确保集合存在
    pub async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let resp = self
            .send(self.client.get(self.url("/exists")), VectorError::ConnectionFailed)
            .await?;
        if resp["result"]["exists"].as_bool().unwrap_or(false) {
            tracing::debug!("Qdrant collection exists: {}", self.collection);
            return Ok(());
        }

        let body = json!({"vectors": {"size": dimension, "distance": "Cosine"}});
        self.send(self.client.put(self.url("")).json(&body), VectorError::ConnectionFailed)
            .await?;
        tracing::info!("Qdrant collection created: {} (dim={})", self.collection, dimension);
        Ok(())
    }

    pub async fn upsert(&self, points: Vec<Point>) -> Result<()> {
        let points: Vec<Value> = points
            .into_iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "vector": p.vector,
                    "payload": {"document": p.document, "title": p.title},
                })
            })
            .collect();

        let req = self
            .client
            .put(self.url("/points?wait=true"))
            .json(&json!({ "points": points }));
        self.send(req, VectorError::WriteFailed).await?;
        Ok(())
    }

    pub async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredPoint>> {
        let body = json!({"vector": vector, "limit": limit, "with_payload": true});
        let resp = self
            .send(self.client.post(self.url("/points/search")).json(&body), VectorError::QueryFailed)
            .await?;

        Ok(resp["result"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .map(|hit| ScoredPoint {
                        score: hit["score"].as_f64().unwrap_or(0.0) as f32,
                        document: hit["payload"]["document"].as_str().unwrap_or_default().to_string(),
                        title: hit["payload"]["title"].as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::testing::serve;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeQdrant {
        collection: Option<Value>,
        points: Vec<Value>,
        api_keys: Vec<String>,
    }

    type Shared = Arc<Mutex<FakeQdrant>>;

    async fn exists(State(s): State<Shared>, headers: HeaderMap) -> Json<Value> {
        let mut s = s.lock();
        if let Some(key) = headers.get("api-key").and_then(|v| v.to_str().ok()) {
            s.api_keys.push(key.to_string());
        }
        Json(json!({"result": {"exists": s.collection.is_some()}, "status": "ok"}))
    }

    async fn create(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
        s.lock().collection = Some(body);
        Json(json!({"result": true, "status": "ok"}))
    }

    async fn upsert(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
        let points = body["points"].as_array().cloned().unwrap_or_default();
        s.lock().points.extend(points);
        Json(json!({"result": {"operation_id": 0, "status": "completed"}, "status": "ok"}))
    }

    /// Returns every stored point, scored by dot product, best first
    async fn search(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
        let s = s.lock();
        let query: Vec<f64> = serde_json::from_value(body["vector"].clone()).unwrap();
        let limit = body["limit"].as_u64().unwrap() as usize;
        assert_eq!(body["with_payload"], true);

        let mut hits: Vec<Value> = s
            .points
            .iter()
            .map(|p| {
                let v: Vec<f64> = serde_json::from_value(p["vector"].clone()).unwrap();
                let score: f64 = v.iter().zip(&query).map(|(a, b)| a * b).sum();
                json!({"id": p["id"], "version": 0, "score": score, "payload": p["payload"]})
            })
            .collect();
        hits.sort_by(|a, b| b["score"].as_f64().unwrap().total_cmp(&a["score"].as_f64().unwrap()));
        hits.truncate(limit);
        Json(json!({"result": hits, "status": "ok"}))
    }

    async fn fake_qdrant() -> (QdrantConfig, Shared) {
        let state = Shared::default();
        let router = Router::new()
            .route("/collections/documents/exists", get(exists))
            .route("/collections/documents", put(create))
            .route("/collections/documents/points", put(upsert))
            .route("/collections/documents/points/search", post(search))
            .with_state(state.clone());

        let config = QdrantConfig {
            location: serve(router).await,
            api_key: "secret".to_string(),
            ..Default::default()
        };
        (config, state)
    }

    fn point(title: &str, vector: Vec<f32>) -> Point {
        Point {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            document: format!("{} text", title),
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn test_collection_created_once() {
        let (config, state) = fake_qdrant().await;
        let rest = QdrantRest::new(&config).unwrap();

        rest.ensure_collection(4).await.unwrap();
        rest.ensure_collection(4).await.unwrap();

        let s = state.lock();
        assert_eq!(
            s.collection.as_ref().unwrap(),
            &json!({"vectors": {"size": 4, "distance": "Cosine"}})
        );
        assert_eq!(s.api_keys, vec!["secret".to_string(), "secret".to_string()]);
    }

    #[tokio::test]
    async fn test_upsert_and_search_payload() {
        let (config, state) = fake_qdrant().await;
        let rest = QdrantRest::new(&config).unwrap();
        rest.ensure_collection(2).await.unwrap();

        rest.upsert(vec![point("a.txt", vec![1.0, 0.0]), point("b.txt", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(state.lock().points[0]["payload"]["title"], "a.txt");

        let hits = rest.search(vec![0.2, 0.8], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "b.txt");
        assert_eq!(hits[0].document, "b.txt text");
        assert!((hits[0].score - 0.8).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_missing_collection_on_search() {
        let router = Router::new();
        let config = QdrantConfig { location: serve(router).await, ..Default::default() };
        let rest = QdrantRest::new(&config).unwrap();

        let err = rest.search(vec![1.0], 3).await.unwrap_err();
        assert!(matches!(VectorError::find(&err), Some(VectorError::QueryFailed(_))));
    }
}

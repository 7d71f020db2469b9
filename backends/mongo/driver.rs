//! MongoDB 客户端
//!
//! Documents are stored as `{text, title, embedding}` with server-generated
//! ObjectIds and searched through an `$vectorSearch` aggregation.

use std::time::Duration;

use ::mongodb::bson::{doc, Bson, Document as BsonDocument};
use ::mongodb::options::ClientOptions;
use ::mongodb::{Client, Collection};
use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;

use super::config::MongoConfig;
use crate::error::VectorError;
use crate::models::{ScoreKind, SearchResult};
use crate::vector::{BackendKind, Capability, Record, VectorBackend, VectorQuery};

/// Field holding the document vector, must match the Vector Search index / 向量字段
const EMBEDDING_FIELD: &str = "embedding";

pub struct MongoBackend {
    config: MongoConfig,
    client: Client,
}

impl MongoBackend {
    /// Parse the connection string and build the client; no round trip yet
    pub async fn connect(config: MongoConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| VectorError::ConnectionFailed(e.to_string()))?;
        options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));
        options.app_name = Some("vector-search-app".to_string());

        let client = Client::with_options(options)
            .map_err(|e| VectorError::ConnectionFailed(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn collection(&self) -> Collection<BsonDocument> {
        self.client
            .database(&self.config.db_name)
            .collection(&self.config.collection_name)
    }
}

/// Stored document for one record / 构造写入文档
fn build_document(record: &Record) -> Result<BsonDocument> {
    let vector = record.vector.as_ref().ok_or_else(|| {
        VectorError::WriteFailed(format!("record {} has no vector", record.title))
    })?;
    let embedding: Vec<Bson> = vector.iter().map(|v| Bson::Double(*v as f64)).collect();

    Ok(doc! {
        "text": record.text.as_str(),
        "title": record.title.as_str(),
        "embedding": embedding,
    })
}

/// $vectorSearch + $project pipeline / 构造检索管道
fn build_pipeline(config: &MongoConfig, vector: &[f32], limit: usize) -> Vec<BsonDocument> {
    let limit = limit as i64;
    let num_candidates = (config.num_candidates as i64).max(limit);
    let query_vector: Vec<Bson> = vector.iter().map(|v| Bson::Double(*v as f64)).collect();

    vec![
        doc! {
            "$vectorSearch": {
                "index": config.vector_index.as_str(),
                "path": EMBEDDING_FIELD,
                "queryVector": query_vector,
                "numCandidates": num_candidates,
                "limit": limit,
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "title": 1,
                "text": 1,
                "score": { "$meta": "vectorSearchScore" },
            }
        },
    ]
}

fn parse_hit(doc: &BsonDocument) -> SearchResult {
    let score = match doc.get("score") {
        Some(Bson::Double(v)) => *v as f32,
        Some(Bson::Int32(v)) => *v as f32,
        Some(Bson::Int64(v)) => *v as f32,
        _ => 0.0,
    };
    SearchResult::new(
        doc.get_str("title").unwrap_or_default(),
        doc.get_str("text").unwrap_or_default(),
        score,
    )
}

#[async_trait]
impl VectorBackend for MongoBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MongoDb
    }

    fn capabilities(&self) -> Capability {
        Capability {
            embeds_text: false,
            score_kind: ScoreKind::Similarity,
        }
    }

    async fn ensure_ready(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| VectorError::ConnectionFailed(e.to_string()))?;

        tracing::info!(
            "MongoDB connected: {}.{}",
            self.config.db_name,
            self.config.collection_name
        );
        Ok(())
    }

    async fn write_batch(&self, records: Vec<Record>) -> Result<()> {
        let docs = records
            .iter()
            .map(build_document)
            .collect::<Result<Vec<_>>>()?;

        let result = self
            .collection()
            .insert_many(docs, None)
            .await
            .map_err(|e| VectorError::WriteFailed(e.to_string()))?;

        tracing::debug!("MongoDB inserted {} documents", result.inserted_ids.len());
        Ok(())
    }

    async fn query(&self, query: VectorQuery, top_k: usize) -> Result<Vec<SearchResult>> {
        let vector = query.into_vector()?;
        let pipeline = build_pipeline(&self.config, &vector, top_k);

        let mut cursor = self
            .collection()
            .aggregate(pipeline, None)
            .await
            .map_err(|e| VectorError::QueryFailed(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| VectorError::QueryFailed(e.to_string()))?
        {
            results.push(parse_hit(&doc));
        }
        Ok(results)
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

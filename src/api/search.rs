use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{api_error, bad_request, parse_backend, ApiResponse, ApiResult};
use crate::state::AppState;
use vector_search_app::models::{ScoreKind, SearchResult};
use vector_search_app::vector::{BackendKind, DEFAULT_TOP_K};

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub backend: String,
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub backend: BackendKind,
    /// Whether higher or lower scores are better / 分数含义
    pub score_kind: ScoreKind,
    pub results: Vec<SearchResult>,
}

/// POST /api/search - 相似度搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    if req.query.trim().is_empty() {
        return Err(bad_request("Please enter a search query first"));
    }
    let kind = parse_backend(&req.backend)?;

    let handle = state.registry.get_connection(kind).await.map_err(api_error)?;
    let results = state
        .adapter
        .search(handle.as_ref(), &req.query, req.top_k)
        .await
        .map_err(api_error)?;

    Ok(Json(ApiResponse::success(SearchResponse {
        backend: kind,
        score_kind: handle.capabilities().score_kind,
        results,
    })))
}

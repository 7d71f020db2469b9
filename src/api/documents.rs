use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{api_error, bad_request, parse_backend, ApiResponse, ApiResult};
use crate::state::AppState;
use vector_search_app::archive;
use vector_search_app::models::DocumentSummary;
use vector_search_app::vector::BackendKind;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub count: usize,
    pub titles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub backend: String,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub backend: BackendKind,
    pub indexed: usize,
}

/// POST /api/documents/upload - 上传 ZIP 文档包
pub async fn upload_documents(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&e.to_string()))?
    {
        if field.name() == Some("file") {
            data = Some(field.bytes().await.map_err(|e| bad_request(&e.to_string()))?);
            break;
        }
    }

    let data = data.ok_or_else(|| bad_request("Please upload a .zip file"))?;
    tracing::debug!("Received upload of {} bytes", data.len());

    let documents = archive::extract_documents_async(data)
        .await
        .map_err(api_error)?;
    let titles = state.replace_documents(documents);
    tracing::info!("Upload slot now holds {} documents", titles.len());

    Ok(Json(ApiResponse::success(UploadResponse {
        count: titles.len(),
        titles,
    })))
}

/// GET /api/documents - 当前上传的文档
pub async fn list_documents(State(state): State<Arc<AppState>>) -> ApiResult<Vec<DocumentSummary>> {
    let summaries = state
        .documents
        .read()
        .iter()
        .map(DocumentSummary::from)
        .collect();
    Ok(Json(ApiResponse::success(summaries)))
}

/// POST /api/documents/index - 将上传的文档写入后端
pub async fn index_documents(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IndexRequest>,
) -> ApiResult<IndexResponse> {
    let kind = parse_backend(&req.backend)?;
    let documents = state.documents_snapshot();
    if documents.is_empty() {
        return Err(bad_request("Please upload documents first"));
    }

    let handle = state.registry.get_connection(kind).await.map_err(api_error)?;
    state
        .adapter
        .index(handle.as_ref(), &documents)
        .await
        .map_err(api_error)?;

    Ok(Json(ApiResponse::success(IndexResponse {
        backend: kind,
        indexed: documents.len(),
    })))
}

pub mod backends;
pub mod documents;
pub mod search;
pub mod server;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;
use vector_search_app::error::VectorError;
use vector_search_app::vector::BackendKind;

/// Largest accepted upload / 上传大小上限
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self {
            code: status.as_u16() as i32,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Handler error: status plus envelope / 错误响应
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(StatusCode::BAD_REQUEST, message)))
}

/// Status code for a failure / 错误状态码
pub fn status_for(err: &anyhow::Error) -> StatusCode {
    match VectorError::find(err) {
        Some(VectorError::UnknownBackend(_)) => StatusCode::NOT_FOUND,
        Some(VectorError::ConnectionFailed(_))
        | Some(VectorError::WriteFailed(_))
        | Some(VectorError::QueryFailed(_)) => StatusCode::BAD_GATEWAY,
        Some(VectorError::Archive(_)) => StatusCode::BAD_REQUEST,
        Some(VectorError::EmbeddingFailed(_))
        | Some(VectorError::DimensionMismatch { .. })
        | None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map an operation failure to a response, logging it / 转换错误
pub fn api_error(err: anyhow::Error) -> ApiError {
    let status = status_for(&err);
    let message = format!("{:#}", err);
    if status.is_server_error() {
        tracing::error!("Request failed ({}): {}", status, message);
    } else {
        tracing::warn!("Request rejected ({}): {}", status, message);
    }
    (status, Json(ApiResponse::error(status, &message)))
}

/// Parse a backend id from the path or body / 解析后端标识
pub fn parse_backend(id: &str) -> Result<BackendKind, ApiError> {
    id.parse::<BackendKind>()
        .map_err(|e| api_error(anyhow::Error::new(e)))
}

/// API routes; the front end fallback is added by the caller / API 路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(server::health_check))
        .route("/api/backends", get(backends::list_backends))
        .route("/api/backends/:kind/connect", post(backends::connect_backend))
        .route("/api/backends/:kind/close", post(backends::close_backend))
        .route("/api/documents", get(documents::list_documents))
        .route("/api/documents/upload", post(documents::upload_documents))
        .route("/api/documents/index", post(documents::index_documents))
        .route("/api/search", post(search::search))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::{api_error, parse_backend, ApiResponse, ApiResult};
use crate::state::AppState;
use vector_search_app::vector::{BackendInfo, BackendKind, Capability};

#[derive(Debug, Serialize)]
pub struct BackendStatus {
    #[serde(flatten)]
    pub info: BackendInfo,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub id: BackendKind,
    pub connected: bool,
    pub capabilities: Capability,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub id: BackendKind,
    pub closed: bool,
}

/// GET /api/backends - 已注册后端列表
pub async fn list_backends(State(state): State<Arc<AppState>>) -> ApiResult<Vec<BackendStatus>> {
    let connected = state.registry.connected().await;
    let backends = state
        .registry
        .backend_infos()
        .await
        .into_iter()
        .map(|info| BackendStatus {
            connected: connected.contains(&info.id),
            info,
        })
        .collect();
    Ok(Json(ApiResponse::success(backends)))
}

/// POST /api/backends/:kind/connect - 建立连接
pub async fn connect_backend(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<ConnectResponse> {
    let kind = parse_backend(&kind)?;
    let handle = state.registry.get_connection(kind).await.map_err(api_error)?;

    Ok(Json(ApiResponse::success(ConnectResponse {
        id: kind,
        connected: true,
        capabilities: handle.capabilities(),
    })))
}

/// POST /api/backends/:kind/close - 关闭连接
pub async fn close_backend(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<CloseResponse> {
    let kind = parse_backend(&kind)?;
    let closed = state.registry.close(kind).await.map_err(api_error)?;
    Ok(Json(ApiResponse::success(CloseResponse { id: kind, closed })))
}

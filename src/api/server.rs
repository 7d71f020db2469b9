use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

/// GET /api/health - 健康检查
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let embedder = state.registry.embedder();
    let backends = state.registry.list_backend_kinds().await;
    let connected = state.registry.connected().await;
    Json(json!({
        "status": "ok",
        "message": "Vector search service is running",
        "version": env!("CARGO_PKG_VERSION"),
        "build_time": env!("BUILD_TIME"),
        "started_at": state.started_at.to_rfc3339(),
        "embedding_model": embedder.model_name(),
        "embedding_dimension": embedder.dimension(),
        "backends": backends,
        "connected": connected,
    }))
}

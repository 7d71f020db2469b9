use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Embed frontend static files (compile-time embed from frontend/dist) / 嵌入前端静态文件
#[derive(RustEmbed)]
#[folder = "frontend/dist"]
struct FrontendAssets;

mod api;
mod state;

use state::AppState;
use vector_search_app::config;
use vector_search_app::embedding;
use vector_search_app::vector::{BackendKind, ConnectionRegistry, DocumentAdapter};

fn embedded_response(content_type: &str, data: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, content_type.to_string())], data).into_response()
}

/// Handle embedded static file requests / 处理嵌入的静态文件请求
async fn serve_embedded_file(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    if let Some(content) = FrontendAssets::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        return embedded_response(mime.as_ref(), content.data.into_owned());
    }

    // Unknown paths get the single page / 其余路径返回首页
    if let Some(content) = FrontendAssets::get("index.html") {
        return embedded_response("text/html; charset=utf-8", content.data.into_owned());
    }

    (StatusCode::NOT_FOUND, Body::from("Not Found")).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vector_search_app=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);

    let embedder = embedding::build_embedder(&app_config.embedding)?;

    let configs: HashMap<BackendKind, serde_json::Value> = BackendKind::ALL
        .into_iter()
        .map(|kind| (kind, app_config.backend_config(kind)))
        .collect();
    let registry = ConnectionRegistry::new(configs, embedder.clone());

    // Register all vector backend factories / 注册所有向量后端工厂
    vector_search_app::register_vector_backends(&registry).await?;

    let state = Arc::new(AppState::new(registry.clone(), DocumentAdapter::new(embedder)));

    let app = api::router(state)
        .fallback(serve_embedded_file)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.close_all().await;
    tracing::info!("All backend connections closed");
    Ok(())
}

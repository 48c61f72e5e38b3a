//! 设备控制 HTTP API：单设备执行、批量执行、标签触发、控制日志。

mod handlers;
mod middleware;
mod routes;
mod utils;

use axum::{Router, middleware as axum_middleware};
use fm_config::AppConfig;
use fm_control::ControlService;
use fm_protocol::{ProtocolTransport, TransportConfig};
use fm_storage::{
    CatalogStore, ControlLogStore, InMemoryCatalogStore, InMemoryControlLogStore,
    PgControlLogStore, connect_pool, ensure_schema,
};
use fm_telemetry::init_tracing;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlService>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing(&config.log_level);

    // 目录由外部系统维护，这里只加载只读快照
    let catalog: Arc<dyn CatalogStore> = match &config.catalog_path {
        Some(path) => {
            info!(path = %path.display(), "catalog snapshot: file");
            Arc::new(InMemoryCatalogStore::load_snapshot(path)?)
        }
        None => {
            info!("catalog snapshot: empty (FM_CATALOG_PATH not set)");
            Arc::new(InMemoryCatalogStore::new())
        }
    };

    let logs: Arc<dyn ControlLogStore> = match &config.database_url {
        Some(url) => {
            let pool = connect_pool(url).await?;
            ensure_schema(&pool).await?;
            info!("control log store: postgres");
            Arc::new(PgControlLogStore::new(pool))
        }
        None => {
            info!("control log store: in-memory (FM_DATABASE_URL not set)");
            Arc::new(InMemoryControlLogStore::new())
        }
    };

    let transport = Arc::new(ProtocolTransport::new(TransportConfig {
        timeout_ms: config.device_timeout_ms,
        tcp_grace_ms: config.tcp_grace_ms,
    }));
    let control = Arc::new(ControlService::new(catalog, logs, transport));
    let app = build_app(AppState { control });

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(addr = %config.http_addr, "fm-api listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// 组装路由与中间件（/ 与 /api/ 两种前缀）
pub fn build_app(state: AppState) -> Router {
    let api = routes::create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(axum_middleware::from_fn(middleware::request_context))
        .layer(TraceLayer::new_for_http())
}

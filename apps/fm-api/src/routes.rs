//! 路由定义
//!
//! - 健康检查：/health
//! - 指标：/metrics
//! - 设备控制：/control/execute, /control/batch
//! - 标签触发：/control/trigger, /control/trigger/mappings, /control/trigger/readers/{id}
//! - 控制日志：/control/logs

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/control/execute", post(execute_command))
        .route("/control/batch", post(execute_batch))
        .route("/control/trigger", post(trigger_by_space))
        .route("/control/trigger/mappings", post(trigger_by_mappings))
        .route("/control/trigger/readers/:reader_id", post(trigger_by_reader))
        .route("/control/logs", get(list_logs).delete(clear_logs))
}

//! 进程计数器快照
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fm_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            commands_executed: snapshot.commands_executed,
            command_success: snapshot.command_success,
            command_failure: snapshot.command_failure,
            command_timeout: snapshot.command_timeout,
            command_latency_ms_total: snapshot.command_latency_ms_total,
            command_latency_ms_count: snapshot.command_latency_ms_count,
        })),
    )
        .into_response()
}

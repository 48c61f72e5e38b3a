//! 设备控制 handlers
//!
//! - POST /control/execute
//! - POST /control/batch
//! - POST /control/trigger
//! - POST /control/trigger/mappings
//! - POST /control/trigger/readers/{reader_id}
//! - GET /control/logs
//! - DELETE /control/logs

use crate::AppState;
use crate::middleware::actor_id;
use crate::utils::response::{
    bad_request_error, batch_to_dto, control_error, execute_result_to_dto, log_to_dto,
};
use api_contract::{
    ApiResponse, ClearLogsDto, ControlLogPageDto, ControlLogQuery, ExecuteBatchRequest,
    ExecuteCommandRequest, MappingTriggerRequest, TagTriggerRequest,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::{CommandType, TagDirection};
use fm_control::LogQuery;
use fm_storage::{ControlLogFilter, DeviceCommandPair};

/// 单设备执行
pub async fn execute_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ExecuteCommandRequest>,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state
        .control
        .execute_single(req.device_id, req.command_id, actor)
        .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(execute_result_to_dto(record))),
        )
            .into_response(),
        Err(err) => control_error(err),
    }
}

/// 空间批量执行
pub async fn execute_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ExecuteBatchRequest>,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state
        .control
        .execute_batch(req.space_id, req.command_type, actor)
        .await
    {
        Ok(batch) => (StatusCode::OK, Json(ApiResponse::success(batch_to_dto(batch)))).into_response(),
        Err(err) => control_error(err),
    }
}

/// 标签触发（按空间）
pub async fn trigger_by_space(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TagTriggerRequest>,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let direction = match tag_direction(req.command_type) {
        Ok(direction) => direction,
        Err(response) => return response,
    };
    match state
        .control
        .execute_for_tag(req.space_id, direction, actor)
        .await
    {
        Ok(batch) => (StatusCode::OK, Json(ApiResponse::success(batch_to_dto(batch)))).into_response(),
        Err(err) => control_error(err),
    }
}

/// 标签触发（显式映射）
pub async fn trigger_by_mappings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<MappingTriggerRequest>,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let pairs: Vec<DeviceCommandPair> = req
        .mappings
        .iter()
        .map(|pair| DeviceCommandPair {
            device_id: pair.device_id,
            command_id: pair.command_id,
        })
        .collect();
    match state.control.execute_for_mappings(&pairs, actor).await {
        Ok(batch) => (StatusCode::OK, Json(ApiResponse::success(batch_to_dto(batch)))).into_response(),
        Err(err) => control_error(err),
    }
}

/// 读卡器触发：有映射按映射执行，否则按空间
pub async fn trigger_by_reader(
    State(state): State<AppState>,
    Path(reader_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<TagTriggerRequest>,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let direction = match tag_direction(req.command_type) {
        Ok(direction) => direction,
        Err(response) => return response,
    };
    match state
        .control
        .execute_for_reader(reader_id, req.space_id, direction, actor)
        .await
    {
        Ok(batch) => (StatusCode::OK, Json(ApiResponse::success(batch_to_dto(batch)))).into_response(),
        Err(err) => control_error(err),
    }
}

/// 控制日志分页查询
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<ControlLogQuery>,
) -> Response {
    let log_query = LogQuery {
        filter: ControlLogFilter {
            space_id: query.space_id,
            device_id: query.device_id,
            result_status: query.result_status,
            from_ms: query.from,
            to_ms: query.to,
        },
        page: query.page,
        limit: query.limit,
    };
    match state.control.get_logs(log_query).await {
        Ok(listing) => {
            let data = ControlLogPageDto {
                items: listing.items.into_iter().map(log_to_dto).collect(),
                total: listing.total,
                page: listing.page,
                limit: listing.limit,
                total_pages: listing.total_pages,
            };
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => control_error(err),
    }
}

/// 清空控制日志
pub async fn clear_logs(State(state): State<AppState>) -> Response {
    match state.control.clear_logs().await {
        Ok(deleted) => (
            StatusCode::OK,
            Json(ApiResponse::success(ClearLogsDto {
                message: format!("{deleted} control logs deleted"),
                deleted_count: deleted,
            })),
        )
            .into_response(),
        Err(err) => control_error(err),
    }
}

/// 标签触发只接受开机 / 关机
fn tag_direction(command_type: CommandType) -> Result<TagDirection, Response> {
    match command_type {
        CommandType::PowerOn => Ok(TagDirection::Enter),
        CommandType::PowerOff => Ok(TagDirection::Exit),
        other => Err(bad_request_error(format!(
            "tag trigger supports POWER_ON or POWER_OFF, got {}",
            other.as_str()
        ))),
    }
}

//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：bad_request_error, not_found_error, precondition_error, internal_error, control_error
//! - DTO 转换：log_to_dto, batch_to_dto, execute_result_to_dto

use api_contract::{
    ApiResponse, BatchResultDto, ControlLogDto, DeviceResultDto, ExecuteResultDto,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fm_control::{BatchExecutionResult, ControlError, NumberedControlLog};
use fm_storage::ControlLogRecord;

pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

pub fn not_found_error(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", message.into())),
    )
        .into_response()
}

/// 设备未启用（422）
pub fn precondition_error(message: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::<()>::error("DEVICE.INACTIVE", message.into())),
    )
        .into_response()
}

pub fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message.into())),
    )
        .into_response()
}

/// ControlError 转 HTTP 响应
pub fn control_error(err: ControlError) -> Response {
    let message = err.to_string();
    match err {
        ControlError::NotFound(_) => not_found_error(message),
        ControlError::PreconditionFailed(_) => precondition_error(message),
        ControlError::Storage(_) => internal_error(message),
    }
}

pub fn execute_result_to_dto(record: ControlLogRecord) -> ExecuteResultDto {
    ExecuteResultDto {
        log_id: record.log_id,
        result_status: record.result_status,
        result_message: record.result_message,
        executed_at_ms: record.executed_at_ms,
    }
}

pub fn batch_to_dto(batch: BatchExecutionResult) -> BatchResultDto {
    BatchResultDto {
        space_id: batch.space_id,
        space_name: batch.space_name,
        total_devices: batch.total_devices,
        results: batch
            .results
            .into_iter()
            .map(|result| DeviceResultDto {
                device_id: result.device_id,
                device_name: result.device_name,
                command_type: result.command_type,
                result_status: result.result_status,
                result_message: result.result_message,
            })
            .collect(),
        success_count: batch.success_count,
        fail_count: batch.fail_count,
    }
}

pub fn log_to_dto(item: NumberedControlLog) -> ControlLogDto {
    let record = item.record;
    ControlLogDto {
        no: item.no,
        log_id: record.log_id,
        space_id: record.space_id,
        device_id: record.device_id,
        command_id: record.command_id,
        actor_id: record.actor_id,
        trigger_type: record.trigger_type,
        result_status: record.result_status,
        result_message: record.result_message,
        executed_at_ms: record.executed_at_ms,
    }
}

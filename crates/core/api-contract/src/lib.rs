//! 稳定的 DTO 与 API 响应契约。
//!
//! - 控制台 → 后端：设备命令下发、批量控制、控制日志查询
//! - 代理 → 后端：`POST /nfc/tag`
//! - 代理 → 观察端：WebSocket 事件信封

use domain::{CommandType, ResultStatus, TagLogType, TagResult, TriggerType};
use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

// =============================================
// 标签接口（代理 → 后端）
// =============================================

/// `POST /nfc/tag` 请求体。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aid: Option<String>,
}

/// 刷卡联动的设备控制汇总结论。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlOutcome {
    Success,
    Fail,
    Partial,
    Skipped,
}

/// 刷卡联动的设备控制计数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlSummary {
    pub total_devices: usize,
    pub success_count: usize,
    pub fail_count: usize,
}

/// `POST /nfc/tag` 响应体。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub result: TagResult,
    #[serde(default)]
    pub log_type: Option<TagLogType>,
    #[serde(default)]
    pub space_name: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub control_result: Option<ControlOutcome>,
    #[serde(default)]
    pub control_summary: Option<ControlSummary>,
    #[serde(default)]
    pub message: String,
}

// =============================================
// 设备控制（控制台 → 后端）
// =============================================

/// 单设备命令执行请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandRequest {
    #[serde(alias = "spaceDeviceSeq")]
    pub device_id: i64,
    #[serde(alias = "commandSeq")]
    pub command_id: i64,
}

/// 空间批量控制请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteBatchRequest {
    #[serde(alias = "spaceSeq")]
    pub space_id: i64,
    pub command_type: CommandType,
}

/// 标签触发（按空间）请求体，仅接受 POWER_ON / POWER_OFF。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagTriggerRequest {
    pub space_id: i64,
    pub command_type: CommandType,
}

/// 显式 {设备, 命令} 对。
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommandPairDto {
    pub device_id: i64,
    pub command_id: i64,
}

/// 标签触发（按映射）请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingTriggerRequest {
    pub mappings: Vec<DeviceCommandPairDto>,
}

/// 单设备执行返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResultDto {
    pub log_id: i64,
    pub result_status: ResultStatus,
    pub result_message: String,
    pub executed_at_ms: i64,
}

/// 批量执行中的单设备结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResultDto {
    pub device_id: i64,
    pub device_name: String,
    pub command_type: Option<CommandType>,
    pub result_status: ResultStatus,
    pub result_message: String,
}

/// 批量 / 触发执行返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResultDto {
    pub space_id: Option<i64>,
    pub space_name: Option<String>,
    pub total_devices: usize,
    pub results: Vec<DeviceResultDto>,
    pub success_count: usize,
    pub fail_count: usize,
}

/// 控制日志查询参数。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlLogQuery {
    pub space_id: Option<i64>,
    pub device_id: Option<i64>,
    pub result_status: Option<ResultStatus>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// 控制日志返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlLogDto {
    pub no: i64,
    pub log_id: i64,
    pub space_id: i64,
    pub device_id: i64,
    pub command_id: i64,
    pub actor_id: i64,
    pub trigger_type: TriggerType,
    pub result_status: ResultStatus,
    pub result_message: String,
    pub executed_at_ms: i64,
}

/// 控制日志分页结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlLogPageDto {
    pub items: Vec<ControlLogDto>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

/// 控制日志清空返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearLogsDto {
    pub message: String,
    pub deleted_count: u64,
}

// =============================================
// WebSocket 事件（代理 → 观察端）
// =============================================

/// WebSocket 事件类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsEventType {
    Tag,
    Scan,
    ReaderConnected,
    ReaderDisconnected,
    Heartbeat,
}

/// 通用事件信封：`{event, timestamp, data}`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage<T> {
    pub event: WsEventType,
    pub timestamp: String,
    pub data: T,
}

impl<T> WsMessage<T> {
    pub fn new(event: WsEventType, timestamp: impl Into<String>, data: T) -> Self {
        Self {
            event,
            timestamp: timestamp.into(),
            data,
        }
    }
}

/// `tag` 事件：请求 + 后端响应。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagEventData {
    pub request: TagRequest,
    pub response: TagResponse,
}

/// `reader_connected` / `reader_disconnected` 事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderEventData {
    pub reader_name: String,
}

/// `heartbeat` 事件。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatData {
    pub uptime: u64,
    pub connected_clients: usize,
    pub reader_connected: bool,
}

// =============================================
// 运行指标
// =============================================

/// 后端 `GET /metrics` 返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub commands_executed: u64,
    pub command_success: u64,
    pub command_failure: u64,
    pub command_timeout: u64,
    pub command_latency_ms_total: u64,
    pub command_latency_ms_count: u64,
}

/// 代理端 `GET /metrics` 返回结构（与 WebSocket 同端口）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetricsDto {
    pub tags_scanned: u64,
    pub tags_submitted: u64,
    pub tags_queued: u64,
    pub tags_redelivered: u64,
    pub ws_broadcasts: u64,
    pub connected_clients: usize,
    pub reader_connected: bool,
}

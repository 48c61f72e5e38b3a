//! 数据模型
//!
//! - 目录：SpaceRecord, PresetRecord, PresetCommandRecord, DeviceRecord, ReaderCommandMapping
//! - 快照：CatalogSnapshot（JSON，camelCase）
//! - 控制日志：NewControlLog, ControlLogRecord, ControlLogFilter, ControlLogPage

use domain::{CommandType, DeviceStatus, ProtocolType, ResultStatus, TagDirection, TriggerType};
use serde::Deserialize;

/// 空间（教室、会议室等）。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceRecord {
    pub space_id: i64,
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
}

/// 协议预设：协议类型 + 默认地址。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetRecord {
    pub preset_id: i64,
    pub name: String,
    pub protocol: ProtocolType,
    #[serde(default)]
    pub default_ip: Option<String>,
    #[serde(default)]
    pub default_port: Option<u16>,
}

/// 预设下的命令。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetCommandRecord {
    pub command_id: i64,
    pub preset_id: i64,
    pub name: String,
    pub code: String,
    pub command_type: CommandType,
    #[serde(default)]
    pub deleted: bool,
}

/// 空间内的受控设备。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_id: i64,
    pub space_id: i64,
    pub preset_id: i64,
    pub name: String,
    /// 覆盖预设默认 IP
    #[serde(default)]
    pub ip: Option<String>,
    /// 覆盖预设默认端口
    #[serde(default)]
    pub port: Option<u16>,
    pub status: DeviceStatus,
    #[serde(default)]
    pub deleted: bool,
}

impl DeviceRecord {
    pub fn is_dispatchable(&self) -> bool {
        !self.deleted && self.status.is_active()
    }
}

/// 显式 {设备, 命令} 对。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCommandPair {
    pub device_id: i64,
    pub command_id: i64,
}

/// 读卡器对单台设备的进出命令映射。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderCommandMapping {
    pub reader_id: i64,
    pub device_id: i64,
    #[serde(default)]
    pub enter_command_id: Option<i64>,
    #[serde(default)]
    pub exit_command_id: Option<i64>,
}

impl ReaderCommandMapping {
    /// 按进出方向取出要执行的命令对；该方向未配置时为 `None`。
    pub fn pair_for(&self, direction: TagDirection) -> Option<DeviceCommandPair> {
        let command_id = match direction {
            TagDirection::Enter => self.enter_command_id,
            TagDirection::Exit => self.exit_command_id,
        }?;
        Some(DeviceCommandPair {
            device_id: self.device_id,
            command_id,
        })
    }
}

/// 外部目录的 JSON 快照。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSnapshot {
    pub spaces: Vec<SpaceRecord>,
    pub presets: Vec<PresetRecord>,
    pub commands: Vec<PresetCommandRecord>,
    pub devices: Vec<DeviceRecord>,
    pub reader_mappings: Vec<ReaderCommandMapping>,
}

/// 待写入的控制日志。
#[derive(Debug, Clone)]
pub struct NewControlLog {
    pub space_id: i64,
    pub device_id: i64,
    pub command_id: i64,
    pub actor_id: i64,
    pub trigger_type: TriggerType,
    pub result_status: ResultStatus,
    pub result_message: String,
    pub executed_at_ms: i64,
}

/// 已写入的控制日志（只追加，不更新）。
#[derive(Debug, Clone)]
pub struct ControlLogRecord {
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

impl ControlLogRecord {
    pub fn from_new(log_id: i64, log: NewControlLog) -> Self {
        Self {
            log_id,
            space_id: log.space_id,
            device_id: log.device_id,
            command_id: log.command_id,
            actor_id: log.actor_id,
            trigger_type: log.trigger_type,
            result_status: log.result_status,
            result_message: log.result_message,
            executed_at_ms: log.executed_at_ms,
        }
    }
}

/// 控制日志过滤条件。
#[derive(Debug, Clone, Default)]
pub struct ControlLogFilter {
    pub space_id: Option<i64>,
    pub device_id: Option<i64>,
    pub result_status: Option<ResultStatus>,
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
}

impl ControlLogFilter {
    pub fn matches(&self, log: &ControlLogRecord) -> bool {
        self.space_id.is_none_or(|id| log.space_id == id)
            && self.device_id.is_none_or(|id| log.device_id == id)
            && self.result_status.is_none_or(|status| log.result_status == status)
            && self.from_ms.is_none_or(|from| log.executed_at_ms >= from)
            && self.to_ms.is_none_or(|to| log.executed_at_ms <= to)
    }
}

/// 一页控制日志（新到旧）及过滤后的总数。
#[derive(Debug, Clone, Default)]
pub struct ControlLogPage {
    pub items: Vec<ControlLogRecord>,
    pub total: u64,
}

//! 标签（NFC 刷卡）相关的领域枚举。

use crate::CommandType;
use serde::{Deserialize, Serialize};

/// 后端对一次刷卡的处理结论。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagResult {
    Success,
    Partial,
    Denied,
    Unknown,
    Error,
}

/// 刷卡日志类型（进入/离开/拒绝/未登记）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagLogType {
    Enter,
    Exit,
    Denied,
    Unknown,
}

/// 标签触发方向：进入时开机，离开时关机。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagDirection {
    Enter,
    Exit,
}

impl TagDirection {
    /// 无显式映射时按类型推断的命令。
    pub fn command_type(&self) -> CommandType {
        match self {
            Self::Enter => CommandType::PowerOn,
            Self::Exit => CommandType::PowerOff,
        }
    }
}

//! 设备控制相关的领域枚举。
//!
//! 所有枚举的线上表示均为大写下划线文本（与控制台/数据库保持一致）。

use crate::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 传输协议（预设模板决定）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolType {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    /// Wake-on-LAN 魔术包
    #[serde(rename = "WOL")]
    Wol,
    #[serde(rename = "HTTP")]
    Http,
    /// 串口经 TCP 网关透传（线上名沿用 RS232）
    #[serde(rename = "RS232", alias = "SERIAL_OVER_TCP")]
    SerialOverTcp,
}

impl ProtocolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Wol => "WOL",
            Self::Http => "HTTP",
            Self::SerialOverTcp => "RS232",
        }
    }
}

impl FromStr for ProtocolType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TCP" => Ok(Self::Tcp),
            "UDP" => Ok(Self::Udp),
            "WOL" => Ok(Self::Wol),
            "HTTP" => Ok(Self::Http),
            "RS232" | "SERIAL_OVER_TCP" => Ok(Self::SerialOverTcp),
            _ => Err(ParseEnumError {
                kind: "protocol",
                value: value.to_string(),
            }),
        }
    }
}

/// 设备生命周期状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Active,
    Inactive,
}

impl DeviceStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// 命令类型（批量控制按类型匹配）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    PowerOn,
    PowerOff,
    InputChange,
    Custom,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerOn => "POWER_ON",
            Self::PowerOff => "POWER_OFF",
            Self::InputChange => "INPUT_CHANGE",
            Self::Custom => "CUSTOM",
        }
    }
}

impl FromStr for CommandType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "POWER_ON" => Ok(Self::PowerOn),
            "POWER_OFF" => Ok(Self::PowerOff),
            "INPUT_CHANGE" => Ok(Self::InputChange),
            "CUSTOM" => Ok(Self::Custom),
            _ => Err(ParseEnumError {
                kind: "command type",
                value: value.to_string(),
            }),
        }
    }
}

/// 控制日志的触发来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    Manual,
    Nfc,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Nfc => "NFC",
        }
    }
}

/// 单次执行结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Success,
    Fail,
    Timeout,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
            Self::Timeout => "TIMEOUT",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl FromStr for ResultStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "FAIL" => Ok(Self::Fail),
            "TIMEOUT" => Ok(Self::Timeout),
            _ => Err(ParseEnumError {
                kind: "result status",
                value: value.to_string(),
            }),
        }
    }
}

impl FromStr for TriggerType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MANUAL" => Ok(Self::Manual),
            "NFC" => Ok(Self::Nfc),
            _ => Err(ParseEnumError {
                kind: "trigger type",
                value: value.to_string(),
            }),
        }
    }
}

pub mod control;
pub mod tag;

pub use control::{CommandType, DeviceStatus, ProtocolType, ResultStatus, TriggerType};
pub use tag::{TagDirection, TagLogType, TagResult};

/// 枚举文本解析失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

//! 传输错误类型定义

/// 设备下发错误
///
/// 每个变体都带有可直接写入控制日志的消息。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 超过主超时
    #[error("timeout: {0}")]
    Timeout(String),

    /// 连接被拒、DNS 失败、套接字错误
    #[error("connection error: {0}")]
    Connection(String),

    /// HTTP 非 2xx
    #[error("{0}")]
    Http(String),

    /// 设备与预设都未配置地址
    #[error("communication IP not configured")]
    MissingAddress,
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

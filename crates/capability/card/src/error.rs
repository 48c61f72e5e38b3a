//! 读卡错误类型定义

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    /// APDU 收发失败（卡被移走、通信中断）
    #[error("card transport error: {0}")]
    Transport(String),

    /// AID 长度超出 ISO 7816-4 的 5..=16 字节
    #[error("invalid AID length: {0} bytes")]
    InvalidAid(usize),

    #[error("no reader available")]
    NoReader,

    /// PC/SC 服务错误
    #[error("pcsc error: {0}")]
    Pcsc(String),
}

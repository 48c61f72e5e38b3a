//! 协议分发
//!
//! `ProtocolTransport` 按闭合的 `ProtocolType` 选择驱动；调用方只依赖 `DeviceTransport`。

use crate::error::TransportError;
use crate::http::HttpDriver;
use crate::{codec, tcp, udp, wol};
use async_trait::async_trait;
use domain::ProtocolType;
use std::time::Duration;
use tracing::debug;

/// TCP / UDP / 串口转 TCP 的默认端口
pub const DEFAULT_DEVICE_PORT: u16 = 4001;

/// 无响应下发成功时的固定消息
pub const COMMAND_SENT: &str = "command sent";

/// 驱动超时配置
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// 主超时（连接 / 整体）
    pub timeout_ms: u64,
    /// TCP 连接成功后的等待响应宽限期
    pub tcp_grace_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            tcp_grace_ms: 2000,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.tcp_grace_ms)
    }
}

/// 已解析的下发目标（设备覆盖优先于预设默认值）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    pub protocol: ProtocolType,
    /// WOL 时为 MAC 或 IP
    pub ip: Option<String>,
    pub port: Option<u16>,
}

impl DispatchTarget {
    /// 补上协议默认端口；HTTP 不补，WOL 忽略端口。
    pub fn effective_port(&self) -> Option<u16> {
        match self.protocol {
            ProtocolType::Tcp | ProtocolType::Udp | ProtocolType::SerialOverTcp => {
                Some(self.port.unwrap_or(DEFAULT_DEVICE_PORT))
            }
            ProtocolType::Http => self.port,
            ProtocolType::Wol => None,
        }
    }

    fn address(&self) -> Result<&str, TransportError> {
        self.ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .ok_or(TransportError::MissingAddress)
    }
}

/// 设备下发接口
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// 下发命令码，成功时返回响应文本或协议定义的成功消息。
    async fn send(&self, target: &DispatchTarget, code: &str) -> Result<String, TransportError>;
}

/// 真实网络驱动
pub struct ProtocolTransport {
    config: TransportConfig,
    http: HttpDriver,
}

impl ProtocolTransport {
    pub fn new(config: TransportConfig) -> Self {
        let http = HttpDriver::new(config.timeout());
        Self { config, http }
    }
}

impl Default for ProtocolTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl DeviceTransport for ProtocolTransport {
    async fn send(&self, target: &DispatchTarget, code: &str) -> Result<String, TransportError> {
        let host = target.address()?;
        let port = target.effective_port();
        debug!(
            target: "fm.protocol",
            protocol = %target.protocol.as_str(),
            host = %host,
            port = ?port,
            "device_send"
        );

        match target.protocol {
            ProtocolType::Tcp | ProtocolType::SerialOverTcp => {
                let payload = codec::encode_command(code);
                tcp::send(
                    host,
                    port.unwrap_or(DEFAULT_DEVICE_PORT),
                    &payload,
                    self.config.timeout(),
                    self.config.grace(),
                )
                .await
            }
            ProtocolType::Udp => {
                let payload = codec::encode_command(code);
                udp::send(
                    host,
                    port.unwrap_or(DEFAULT_DEVICE_PORT),
                    &payload,
                    self.config.timeout(),
                )
                .await
            }
            ProtocolType::Wol => wol::send(host, self.config.timeout()).await,
            ProtocolType::Http => self.http.send(host, port, code).await,
        }
    }
}

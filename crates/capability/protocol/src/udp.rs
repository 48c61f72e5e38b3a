//! UDP 驱动

use crate::error::TransportError;
use crate::transport::COMMAND_SENT;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// 发送单个数据报，不等待响应。
pub async fn send(
    host: &str,
    port: u16,
    payload: &[u8],
    limit: Duration,
) -> Result<String, TransportError> {
    let attempt = async {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.send_to(payload, (host, port)).await
    };

    match timeout(limit, attempt).await {
        Err(_) => Err(TransportError::Timeout(format!(
            "udp send timeout ({}ms)",
            limit.as_millis()
        ))),
        Ok(Err(err)) => Err(TransportError::Connection(err.to_string())),
        Ok(Ok(_)) => Ok(COMMAND_SENT.to_string()),
    }
}

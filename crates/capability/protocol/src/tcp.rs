//! TCP 驱动（串口转 TCP 共用）

use crate::error::TransportError;
use crate::transport::COMMAND_SENT;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout_at};

const READ_BUF_LEN: usize = 4096;

/// 连接、写入，并等待首个响应数据块。
///
/// 连接成功后 `grace` 内没有数据视为已发送；若主超时先到则为超时。
pub async fn send(
    host: &str,
    port: u16,
    payload: &[u8],
    timeout: Duration,
    grace: Duration,
) -> Result<String, TransportError> {
    let deadline = Instant::now() + timeout;
    let timeout_ms = timeout.as_millis();

    let mut stream = match timeout_at(deadline, TcpStream::connect((host, port))).await {
        Err(_) => {
            return Err(TransportError::Timeout(format!(
                "connection timeout ({timeout_ms}ms)"
            )));
        }
        Ok(Err(err)) => return Err(TransportError::Connection(err.to_string())),
        Ok(Ok(stream)) => stream,
    };

    match timeout_at(deadline, stream.write_all(payload)).await {
        Err(_) => {
            return Err(TransportError::Timeout(format!(
                "write timeout ({timeout_ms}ms)"
            )));
        }
        Ok(Err(err)) => return Err(TransportError::Connection(err.to_string())),
        Ok(Ok(())) => {}
    }

    let grace_deadline = Instant::now() + grace;
    let grace_first = grace_deadline <= deadline;
    let read_deadline = if grace_first { grace_deadline } else { deadline };

    let mut buf = [0u8; READ_BUF_LEN];
    let result = match timeout_at(read_deadline, stream.read(&mut buf)).await {
        Err(_) if grace_first => Ok(COMMAND_SENT.to_string()),
        Err(_) => Err(TransportError::Timeout(format!(
            "response timeout ({timeout_ms}ms)"
        ))),
        Ok(Err(err)) => Err(TransportError::Connection(err.to_string())),
        Ok(Ok(n)) => {
            let text = String::from_utf8_lossy(&buf[..n]).trim().to_string();
            if text.is_empty() {
                Ok(COMMAND_SENT.to_string())
            } else {
                Ok(text)
            }
        }
    };

    let _ = stream.shutdown().await;
    result
}

//! HTTP 驱动

use crate::error::TransportError;
use std::time::Duration;

const EMPTY_BODY_MESSAGE: &str = "HTTP request completed";

/// 拼接 `http://{host}[:{port}]/{code}`，命令码前导 `/` 归一。
pub fn build_http_url(host: &str, port: Option<u16>, code: &str) -> String {
    let path = code.trim().trim_start_matches('/');
    match port {
        Some(port) => format!("http://{host}:{port}/{path}"),
        None => format!("http://{host}/{path}"),
    }
}

pub struct HttpDriver {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpDriver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub async fn send(
        &self,
        host: &str,
        port: Option<u16>,
        code: &str,
    ) -> Result<String, TransportError> {
        let url = build_http_url(host, port, code);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.map_error(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            )));
        }

        let body = response.text().await.map_err(|err| self.map_error(err))?;
        let body = body.trim();
        if body.is_empty() {
            Ok(EMPTY_BODY_MESSAGE.to_string())
        } else {
            Ok(body.to_string())
        }
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(format!(
                "http timeout ({}ms)",
                self.timeout.as_millis()
            ))
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

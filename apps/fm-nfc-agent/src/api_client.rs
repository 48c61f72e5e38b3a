//! 标签 API 客户端（代理 → 后端）

use std::time::Duration;

use api_contract::{TagRequest, TagResponse};
use async_trait::async_trait;
use fm_queue::{SubmitError, TagSubmitter};
use tracing::debug;

pub const API_KEY_HEADER: &str = "X-NFC-Api-Key";
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TagApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TagApiClient {
    pub fn new(api_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// `GET {apiUrl}/health`
    pub async fn health_check(&self) -> Result<(), SubmitError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if !response.status().is_success() {
            return Err(SubmitError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl TagSubmitter for TagApiClient {
    async fn submit(&self, request: &TagRequest) -> Result<TagResponse, SubmitError> {
        let url = format!("{}/nfc/tag", self.base_url);
        debug!(target: "fm.agent", url = %url, identifier = %request.identifier, "tag_submit");
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .timeout(SUBMIT_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body).map_err(|err| SubmitError::Decode(err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        SubmitError::Timeout(err.to_string())
    } else {
        SubmitError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::TagResult;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 单次 HTTP 应答，返回收到的完整请求文本
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 2048];
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|value| value.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}/"), handle)
    }

    #[tokio::test]
    async fn submit_posts_with_api_key() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"result":"PARTIAL","logType":"ENTER","spaceName":"Room 101","message":"1 of 2 devices"}"#,
        )
        .await;
        let client = TagApiClient::new(&url, "rdr_test");

        let response = client
            .submit(&TagRequest {
                identifier: "04A1B2C3".to_string(),
                aid: Some("F0010203040506".to_string()),
            })
            .await
            .expect("submit");

        assert_eq!(response.result, TagResult::Partial);
        assert_eq!(response.space_name, "Room 101");
        let request = server.await.expect("join");
        assert!(request.starts_with("POST /nfc/tag HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("x-nfc-api-key: rdr_test"));
        assert!(request.contains(r#""identifier":"04A1B2C3""#));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let (url, _server) = serve_once("HTTP/1.1 401 Unauthorized", "{}").await;
        let client = TagApiClient::new(&url, "rdr_test");

        let err = client
            .submit(&TagRequest {
                identifier: "04".to_string(),
                aid: None,
            })
            .await
            .expect_err("401");
        assert!(matches!(err, SubmitError::Status(401)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let client = TagApiClient::new(&format!("http://{addr}"), "rdr_test");

        let err = client.health_check().await.expect_err("refused");
        assert!(matches!(err, SubmitError::Transport(_)));
    }

    #[tokio::test]
    async fn health_check_accepts_2xx() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"ok":true}"#).await;
        TagApiClient::new(&url, "rdr_test")
            .health_check()
            .await
            .expect("healthy");
        assert!(server.await.expect("join").starts_with("GET /health HTTP/1.1"));
    }
}

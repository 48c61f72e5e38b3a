use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api_contract::{AgentMetricsDto, ApiResponse};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use fm_telemetry::metrics;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hub::EventHub;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket 挂在根路径，代理进程的计数器在 `/metrics`
pub fn router(hub: Arc<EventHub>) -> Router {
    Router::new()
        .route("/", get(upgrade))
        .route("/metrics", get(agent_metrics))
        .with_state(hub)
}

async fn agent_metrics(State(hub): State<Arc<EventHub>>) -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(AgentMetricsDto {
            tags_scanned: snapshot.tags_scanned,
            tags_submitted: snapshot.tags_submitted,
            tags_queued: snapshot.tags_queued,
            tags_redelivered: snapshot.tags_redelivered,
            ws_broadcasts: snapshot.ws_broadcasts,
            connected_clients: hub.connected_clients(),
            reader_connected: hub.reader_name().is_some(),
        })),
    )
        .into_response()
}

async fn upgrade(ws: WebSocketUpgrade, State(hub): State<Arc<EventHub>>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, hub))
}

async fn client_session(mut socket: WebSocket, hub: Arc<EventHub>) {
    // 先订阅再发快照，避免两者之间的事件丢失
    let mut events = hub.subscribe();
    let mut closing = hub.closing();
    let clients = hub.client_joined();
    info!(target: "fm.fanout", clients, "ws_client_connected");

    for message in hub.initial_messages() {
        if socket.send(Message::Text(message)).await.is_err() {
            let clients = hub.client_left();
            info!(target: "fm.fanout", clients, "ws_client_disconnected");
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(payload) => {
                    if let Err(err) = socket.send(Message::Text(payload)).await {
                        debug!(target: "fm.fanout", error = %err, "ws_send_failed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "fm.fanout", skipped, "ws_client_lagged");
                }
                Err(RecvError::Closed) => break,
            },
            // 只读通道：客户端消息一律丢弃，只关心断开
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(target: "fm.fanout", error = %err, "ws_client_error");
                    break;
                }
            },
            _ = closing.changed() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    let clients = hub.client_left();
    info!(target: "fm.fanout", clients, "ws_client_disconnected");
}

/// 周期心跳任务
pub fn spawn_heartbeat(hub: Arc<EventHub>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            hub.heartbeat();
        }
    })
}

/// 启动 WebSocket 服务，`shutdown` 完成后关闭所有连接并退出。
pub async fn serve<F>(hub: Arc<EventHub>, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(target: "fm.fanout", addr = %addr, "ws_server_listening");
    let closer = hub.clone();
    axum::serve(listener, router(hub))
        .with_graceful_shutdown(async move {
            shutdown.await;
            closer.close();
        })
        .await
}

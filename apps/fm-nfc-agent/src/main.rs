//! NFC 边缘代理：读卡器 → 标签 API，离线时落盘排队，事件经 WebSocket 推送。

mod agent;
mod api_client;
mod feedback;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fm_card::ReaderUpdate;
use fm_config::AgentConfig;
use fm_fanout::{EventHub, HEARTBEAT_INTERVAL, spawn_heartbeat};
use fm_queue::{OfflineQueue, RetryPolicy, spawn_drain_task};
use fm_telemetry::init_tracing;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{info, warn};

use crate::agent::{Agent, broadcast_redelivered};
use crate::api_client::TagApiClient;
use crate::feedback::FeedbackController;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    // API key 缺失或仍是占位值时直接退出
    let config = AgentConfig::load()?;
    init_tracing(&config.log_level);
    info!(
        target: "fm.agent",
        api_url = %config.api_url,
        buzzer = config.buzzer_enabled,
        ws_enabled = config.ws_enabled,
        ws_port = config.ws_port,
        aids = config.aid_list.len(),
        "agent_starting"
    );

    let client = Arc::new(TagApiClient::new(&config.api_url, config.api_key.clone()));
    match client.health_check().await {
        Ok(()) => info!(target: "fm.agent", "backend_healthy"),
        Err(err) => warn!(target: "fm.agent", error = %err, "backend_unreachable"),
    }

    let queue = Arc::new(Mutex::new(
        OfflineQueue::open(&config.queue_path, config.offline_queue_max).await?,
    ));
    let hub = Arc::new(EventHub::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut background = Vec::new();
    if config.ws_enabled {
        background.push(spawn_heartbeat(hub.clone(), HEARTBEAT_INTERVAL));
        let addr = SocketAddr::from(([0, 0, 0, 0], config.ws_port));
        let ws_hub = hub.clone();
        let mut stop = shutdown_rx.clone();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = stop.wait_for(|stopping| *stopping).await;
            };
            if let Err(err) = fm_fanout::serve(ws_hub, addr, shutdown).await {
                warn!(target: "fm.fanout", error = %err, "ws_server_failed");
            }
        });
    }

    background.push(spawn_drain_task(
        queue.clone(),
        client.clone(),
        RetryPolicy::new(Duration::from_millis(config.retry_interval_ms)),
        broadcast_redelivered(hub.clone()),
    ));

    let reader_stop = Arc::new(AtomicBool::new(false));
    let (updates_tx, mut updates_rx) = mpsc::channel::<ReaderUpdate>(16);
    start_reader(&config, updates_tx, reader_stop.clone());

    let agent = Agent::new(
        client,
        queue.clone(),
        hub.clone(),
        FeedbackController::new(config.buzzer_enabled),
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut reader_open = true;
    loop {
        tokio::select! {
            update = updates_rx.recv(), if reader_open => match update {
                Some(update) => agent.handle_update(update),
                None => {
                    warn!(target: "fm.agent", "reader_input_closed");
                    reader_open = false;
                }
            },
            _ = &mut shutdown => break,
        }
    }

    info!(target: "fm.agent", "agent_stopping");
    reader_stop.store(true, Ordering::Relaxed);
    let _ = shutdown_tx.send(true);
    for task in background {
        task.abort();
    }
    let queue = queue.lock().await;
    queue.flush().await?;
    info!(target: "fm.agent", pending = queue.len(), "queue_flushed");
    Ok(())
}

#[cfg(feature = "pcsc")]
fn start_reader(config: &AgentConfig, updates: mpsc::Sender<ReaderUpdate>, stop: Arc<AtomicBool>) {
    match fm_card::spawn_reader_monitor(config.aid_list.clone(), updates, stop) {
        Ok(_) => info!(target: "fm.card", "reader_monitor_started"),
        Err(err) => warn!(target: "fm.card", error = %err, "reader_monitor_unavailable"),
    }
}

#[cfg(not(feature = "pcsc"))]
fn start_reader(_config: &AgentConfig, _updates: mpsc::Sender<ReaderUpdate>, _stop: Arc<AtomicBool>) {
    warn!(target: "fm.card", "built without the pcsc feature; reader input disabled");
}

/// SIGINT / SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use api_contract::{HeartbeatData, ReaderEventData, WsEventType, WsMessage};
use chrono::{SecondsFormat, Utc};
use fm_telemetry::record_ws_broadcast;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// 广播中心：持有订阅通道、在线客户端数和读卡器状态
pub struct EventHub {
    sender: broadcast::Sender<String>,
    clients: AtomicUsize,
    started: Instant,
    reader: RwLock<Option<String>>,
    closing: watch::Sender<bool>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (closing, _) = watch::channel(false);
        Self {
            sender,
            clients: AtomicUsize::new(0),
            started: Instant::now(),
            reader: RwLock::new(None),
            closing,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// 序列化并广播一个事件，返回收到的订阅者数量。
    pub fn broadcast<T: Serialize>(&self, event: WsEventType, data: T) -> usize {
        let Some(payload) = encode(event, data) else {
            return 0;
        };
        record_ws_broadcast();
        // 没有订阅者时 send 返回 Err，视为 0
        let delivered = self.sender.send(payload).unwrap_or(0);
        if delivered > 0 {
            debug!(target: "fm.fanout", event = ?event, clients = delivered, "ws_broadcast");
        }
        delivered
    }

    pub fn reader_connected(&self, reader_name: &str) {
        if let Ok(mut reader) = self.reader.write() {
            *reader = Some(reader_name.to_string());
        }
        self.broadcast(
            WsEventType::ReaderConnected,
            ReaderEventData {
                reader_name: reader_name.to_string(),
            },
        );
    }

    pub fn reader_disconnected(&self, reader_name: &str) {
        if let Ok(mut reader) = self.reader.write() {
            *reader = None;
        }
        self.broadcast(
            WsEventType::ReaderDisconnected,
            ReaderEventData {
                reader_name: reader_name.to_string(),
            },
        );
    }

    pub fn reader_name(&self) -> Option<String> {
        self.reader.read().map(|reader| reader.clone()).unwrap_or_default()
    }

    pub fn connected_clients(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    pub fn heartbeat_data(&self) -> HeartbeatData {
        HeartbeatData {
            uptime: self.started.elapsed().as_secs(),
            connected_clients: self.connected_clients(),
            reader_connected: self.reader_name().is_some(),
        }
    }

    pub fn heartbeat(&self) -> usize {
        self.broadcast(WsEventType::Heartbeat, self.heartbeat_data())
    }

    /// 新连接的初始消息：读卡器在线时先发 `reader_connected`，然后一次心跳。
    pub fn initial_messages(&self) -> Vec<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(reader_name) = self.reader_name() {
            messages.extend(encode(
                WsEventType::ReaderConnected,
                ReaderEventData { reader_name },
            ));
        }
        messages.extend(encode(WsEventType::Heartbeat, self.heartbeat_data()));
        messages
    }

    /// 通知所有连接关闭
    pub fn close(&self) {
        self.closing.send_replace(true);
    }

    pub(crate) fn closing(&self) -> watch::Receiver<bool> {
        self.closing.subscribe()
    }

    pub(crate) fn client_joined(&self) -> usize {
        self.clients.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn client_left(&self) -> usize {
        self.clients.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

fn encode<T: Serialize>(event: WsEventType, data: T) -> Option<String> {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    match serde_json::to_string(&WsMessage::new(event, timestamp, data)) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(target: "fm.fanout", event = ?event, error = %err, "ws_encode_failed");
            None
        }
    }
}

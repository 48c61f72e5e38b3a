//! # 事件广播能力模块
//!
//! 代理端的只读 WebSocket 推送：
//!
//! - 新连接立即收到读卡器状态快照和一次心跳
//! - `tag` / `scan` / `reader_connected` / `reader_disconnected` 实时广播
//! - 每 30 秒一次 `heartbeat`
//!
//! 广播走 `tokio::sync::broadcast`，慢客户端只会丢消息（Lagged），不会阻塞其他连接。

mod hub;
mod server;

pub use hub::{DEFAULT_CHANNEL_CAPACITY, EventHub};
pub use server::{HEARTBEAT_INTERVAL, router, serve, spawn_heartbeat};

//! 追踪初始化、请求 ID 生成与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub commands_executed: u64,
    pub command_success: u64,
    pub command_failure: u64,
    pub command_timeout: u64,
    pub command_latency_ms_total: u64,
    pub command_latency_ms_count: u64,
    pub tags_scanned: u64,
    pub tags_submitted: u64,
    pub tags_queued: u64,
    pub tags_redelivered: u64,
    pub ws_broadcasts: u64,
}

/// 进程级计数器。
#[derive(Default)]
pub struct TelemetryMetrics {
    commands_executed: AtomicU64,
    command_success: AtomicU64,
    command_failure: AtomicU64,
    command_timeout: AtomicU64,
    command_latency_ms_total: AtomicU64,
    command_latency_ms_count: AtomicU64,
    tags_scanned: AtomicU64,
    tags_submitted: AtomicU64,
    tags_queued: AtomicU64,
    tags_redelivered: AtomicU64,
    ws_broadcasts: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            command_success: self.command_success.load(Ordering::Relaxed),
            command_failure: self.command_failure.load(Ordering::Relaxed),
            command_timeout: self.command_timeout.load(Ordering::Relaxed),
            command_latency_ms_total: self.command_latency_ms_total.load(Ordering::Relaxed),
            command_latency_ms_count: self.command_latency_ms_count.load(Ordering::Relaxed),
            tags_scanned: self.tags_scanned.load(Ordering::Relaxed),
            tags_submitted: self.tags_submitted.load(Ordering::Relaxed),
            tags_queued: self.tags_queued.load(Ordering::Relaxed),
            tags_redelivered: self.tags_redelivered.load(Ordering::Relaxed),
            ws_broadcasts: self.ws_broadcasts.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing。
///
/// `RUST_LOG` 优先；否则使用 `default_level`（非法时回退 info）。只生效一次。
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 设备命令执行成功。
pub fn record_command_success() {
    let metrics = metrics();
    metrics.commands_executed.fetch_add(1, Ordering::Relaxed);
    metrics.command_success.fetch_add(1, Ordering::Relaxed);
}

/// 设备命令执行失败（含缺少命令、地址未配置）。
pub fn record_command_failure() {
    let metrics = metrics();
    metrics.commands_executed.fetch_add(1, Ordering::Relaxed);
    metrics.command_failure.fetch_add(1, Ordering::Relaxed);
}

/// 设备命令超时。
pub fn record_command_timeout() {
    let metrics = metrics();
    metrics.commands_executed.fetch_add(1, Ordering::Relaxed);
    metrics.command_timeout.fetch_add(1, Ordering::Relaxed);
}

/// 单次下发耗时（毫秒）。
pub fn record_command_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .command_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .command_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_tag_scanned() {
    metrics().tags_scanned.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tag_submitted() {
    metrics().tags_submitted.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tag_queued() {
    metrics().tags_queued.fetch_add(1, Ordering::Relaxed);
}

/// 离线队列补发成功。
pub fn record_tag_redelivered() {
    metrics().tags_redelivered.fetch_add(1, Ordering::Relaxed);
}

pub fn record_ws_broadcast() {
    metrics().ws_broadcasts.fetch_add(1, Ordering::Relaxed);
}

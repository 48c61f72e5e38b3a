//! 队列补发
//!
//! 只有可重试的失败（超时、连接失败、5xx 以及 401/408/429）才保留条目；
//! 后端给出任何业务结果（包括 DENIED）都算送达，
//! 其余 4xx 视为永久拒绝，条目出队并记录告警。

use std::sync::Arc;
use std::time::Duration;

use api_contract::{TagRequest, TagResponse};
use async_trait::async_trait;
use fm_telemetry::record_tag_redelivered;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::queue::OfflineQueue;

/// 标签提交失败
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("tag api timeout: {0}")]
    Timeout(String),
    #[error("tag api unreachable: {0}")]
    Transport(String),
    #[error("tag api returned HTTP {0}")]
    Status(u16),
    #[error("tag api response invalid: {0}")]
    Decode(String),
}

impl SubmitError {
    /// 后端明确拒绝且重试无意义（4xx，除 401/408/429）
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Status(code) if (400..500).contains(code) && !matches!(*code, 401 | 408 | 429))
    }
}

/// 标签提交通道（代理端由 HTTP 客户端实现）
#[async_trait]
pub trait TagSubmitter: Send + Sync {
    async fn submit(&self, request: &TagRequest) -> Result<TagResponse, SubmitError>;
}

/// 补发节奏：失败后间隔翻倍，最多 `max_backoff_factor` 倍，成功后复位。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_backoff_factor: u32,
}

impl RetryPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_backoff_factor: 16,
        }
    }

    /// 连续失败 `failures` 次后的等待时间
    pub fn delay_after(&self, failures: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failures)
            .unwrap_or(u32::MAX)
            .min(self.max_backoff_factor.max(1));
        self.interval.saturating_mul(factor)
    }
}

#[derive(Debug, Default)]
pub struct DrainOutcome {
    pub delivered: Vec<(TagRequest, TagResponse)>,
    /// 被后端永久拒绝而丢弃的条目
    pub rejected: Vec<TagRequest>,
    /// 本轮是否因提交失败提前结束
    pub failed: bool,
}

/// 从队头开始逐条重投，直到队列清空或遇到第一次可重试的失败。
///
/// 提交期间不持有队列锁；条目在提交期间被淘汰时不会误删新的队头。
pub async fn drain_once(queue: &Mutex<OfflineQueue>, submitter: &dyn TagSubmitter) -> DrainOutcome {
    let mut outcome = DrainOutcome::default();
    loop {
        let Some(item) = queue.lock().await.front().cloned() else {
            break;
        };

        match submitter.submit(&item.request).await {
            Ok(response) => {
                let mut guard = queue.lock().await;
                if guard.front() == Some(&item) {
                    if let Err(err) = guard.dequeue().await {
                        warn!(target: "fm.queue", error = %err, "queue_persist_failed");
                    }
                }
                drop(guard);
                record_tag_redelivered();
                info!(
                    target: "fm.queue",
                    identifier = %item.request.identifier,
                    retry_count = item.retry_count,
                    result = ?response.result,
                    "tag_redelivered"
                );
                outcome.delivered.push((item.request, response));
            }
            Err(err) if err.is_permanent() => {
                let mut guard = queue.lock().await;
                if guard.front() == Some(&item) {
                    if let Err(err) = guard.dequeue().await {
                        warn!(target: "fm.queue", error = %err, "queue_persist_failed");
                    }
                }
                warn!(
                    target: "fm.queue",
                    identifier = %item.request.identifier,
                    retry_count = item.retry_count,
                    pending = guard.len(),
                    error = %err,
                    "tag_redelivery_rejected"
                );
                drop(guard);
                outcome.rejected.push(item.request);
            }
            Err(err) => {
                let mut guard = queue.lock().await;
                if guard.front() == Some(&item) {
                    if let Err(err) = guard.mark_retry().await {
                        warn!(target: "fm.queue", error = %err, "queue_persist_failed");
                    }
                }
                warn!(
                    target: "fm.queue",
                    identifier = %item.request.identifier,
                    pending = guard.len(),
                    error = %err,
                    "tag_redelivery_failed"
                );
                outcome.failed = true;
                break;
            }
        }
    }
    outcome
}

/// 启动后台补发任务；`on_delivered` 在每条补发成功后调用。
pub fn spawn_drain_task<F>(
    queue: Arc<Mutex<OfflineQueue>>,
    submitter: Arc<dyn TagSubmitter>,
    policy: RetryPolicy,
    on_delivered: F,
) -> JoinHandle<()>
where
    F: Fn(TagRequest, TagResponse) + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut failures: u32 = 0;
        loop {
            tokio::time::sleep(policy.delay_after(failures)).await;
            let outcome = drain_once(&queue, submitter.as_ref()).await;
            failures = if outcome.failed {
                failures.saturating_add(1)
            } else {
                0
            };
            for (request, response) in outcome.delivered {
                on_delivered(request, response);
            }
        }
    })
}

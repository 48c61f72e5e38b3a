//! # 离线队列能力模块
//!
//! 标签 API 不可达时缓冲 `TagRequest`：
//!
//! - 容量有上限，满了淘汰最旧的一条，新请求永不拒绝
//! - 每次变更都把整个队列重写到磁盘（临时文件 + rename）
//! - 启动时从磁盘恢复
//! - 后台补发任务按 `retryInterval` 从队头开始重投，失败时指数退避

mod drain;
mod error;
mod queue;

pub use drain::{
    DrainOutcome, RetryPolicy, SubmitError, TagSubmitter, drain_once, spawn_drain_task,
};
pub use error::QueueError;
pub use queue::{OfflineQueue, QueueItem};

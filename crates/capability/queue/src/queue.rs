//! 有界 FIFO + 整体落盘（tokio 异步文件 IO）

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use api_contract::TagRequest;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::error::QueueError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub request: TagRequest,
    /// 入队时间（RFC 3339）
    pub timestamp: String,
    #[serde(default)]
    pub retry_count: u32,
}

#[derive(Debug)]
pub struct OfflineQueue {
    items: VecDeque<QueueItem>,
    max_size: usize,
    path: PathBuf,
}

impl OfflineQueue {
    /// 打开队列文件；文件不存在时为空队列，内容损坏时告警后丢弃。
    ///
    /// 恢复的条目超过 `max_size` 时只保留最新的部分。
    pub async fn open(path: impl Into<PathBuf>, max_size: usize) -> Result<Self, QueueError> {
        let path = path.into();
        let max_size = max_size.max(1);
        let mut items: VecDeque<QueueItem> = match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<Vec<QueueItem>>(&raw) {
                Ok(items) => items.into(),
                Err(err) => {
                    warn!(target: "fm.queue", path = %path.display(), error = %err, "queue_file_corrupt");
                    VecDeque::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(err) => return Err(err.into()),
        };
        while items.len() > max_size {
            items.pop_front();
        }
        if !items.is_empty() {
            info!(target: "fm.queue", restored = items.len(), "queue_restored");
        }
        Ok(Self {
            items,
            max_size,
            path,
        })
    }

    /// 追加到队尾；满时先淘汰队头并返回被淘汰的条目。
    pub async fn enqueue(&mut self, request: TagRequest) -> Result<Option<QueueItem>, QueueError> {
        let evicted = if self.items.len() >= self.max_size {
            self.items.pop_front()
        } else {
            None
        };
        if let Some(item) = &evicted {
            warn!(
                target: "fm.queue",
                identifier = %item.request.identifier,
                queued_at = %item.timestamp,
                "queue_evicted_oldest"
            );
        }
        self.items.push_back(QueueItem {
            request,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            retry_count: 0,
        });
        self.flush().await?;
        Ok(evicted)
    }

    pub async fn dequeue(&mut self) -> Result<Option<QueueItem>, QueueError> {
        let item = self.items.pop_front();
        if item.is_some() {
            self.flush().await?;
        }
        Ok(item)
    }

    pub fn front(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    /// 队头重投失败：重试次数 +1
    pub async fn mark_retry(&mut self) -> Result<(), QueueError> {
        if let Some(item) = self.items.front_mut() {
            item.retry_count = item.retry_count.saturating_add(1);
            self.flush().await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn items(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    /// 整个队列写入临时文件后 rename 覆盖，避免写到一半的文件。
    pub async fn flush(&self) -> Result<(), QueueError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let encoded = serde_json::to_vec_pretty(&self.items)?;
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, encoded).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

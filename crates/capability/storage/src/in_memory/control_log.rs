//! 控制日志内存实现

use crate::error::StorageError;
use crate::models::{ControlLogFilter, ControlLogPage, ControlLogRecord, NewControlLog};
use crate::traits::ControlLogStore;
use std::sync::RwLock;

/// 控制日志内存存储，按写入顺序保存
#[derive(Default)]
pub struct InMemoryControlLogStore {
    logs: RwLock<Vec<ControlLogRecord>>,
}

impl InMemoryControlLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部日志，写入顺序
    pub fn snapshot(&self) -> Result<Vec<ControlLogRecord>, StorageError> {
        let logs = self
            .logs
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(logs.clone())
    }
}

#[async_trait::async_trait]
impl ControlLogStore for InMemoryControlLogStore {
    async fn append(&self, log: NewControlLog) -> Result<ControlLogRecord, StorageError> {
        let mut logs = self
            .logs
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let next_id = logs.last().map(|last| last.log_id + 1).unwrap_or(1);
        let record = ControlLogRecord::from_new(next_id, log);
        logs.push(record.clone());
        Ok(record)
    }

    async fn list(
        &self,
        filter: &ControlLogFilter,
        offset: u64,
        limit: u64,
    ) -> Result<ControlLogPage, StorageError> {
        let logs = self
            .logs
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut matched: Vec<&ControlLogRecord> =
            logs.iter().filter(|log| filter.matches(log)).collect();
        matched.sort_by(|a, b| {
            b.executed_at_ms
                .cmp(&a.executed_at_ms)
                .then(b.log_id.cmp(&a.log_id))
        });
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ControlLogPage { items, total })
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let mut logs = self
            .logs
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let removed = logs.len() as u64;
        logs.clear();
        Ok(removed)
    }
}

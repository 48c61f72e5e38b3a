//! 存储接口 Trait 定义
//!
//! - CatalogStore：目录只读查询
//! - ControlLogStore：控制日志追加、分页查询、清空

use crate::error::StorageError;
use crate::models::{
    ControlLogFilter, ControlLogPage, ControlLogRecord, DeviceRecord, NewControlLog,
    PresetCommandRecord, PresetRecord, ReaderCommandMapping, SpaceRecord,
};
use async_trait::async_trait;
use domain::CommandType;

/// 目录读模型接口
///
/// 查找类方法会返回已软删除的记录，由调用方判断 `deleted`。
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_space(&self, space_id: i64) -> Result<Option<SpaceRecord>, StorageError>;

    async fn find_device(&self, device_id: i64) -> Result<Option<DeviceRecord>, StorageError>;

    async fn find_preset(&self, preset_id: i64) -> Result<Option<PresetRecord>, StorageError>;

    async fn find_command(
        &self,
        command_id: i64,
    ) -> Result<Option<PresetCommandRecord>, StorageError>;

    /// 空间内 ACTIVE 且未删除的设备，按设备 ID 升序
    async fn list_active_devices(&self, space_id: i64) -> Result<Vec<DeviceRecord>, StorageError>;

    /// 预设下指定类型的第一条未删除命令
    async fn find_command_by_type(
        &self,
        preset_id: i64,
        command_type: CommandType,
    ) -> Result<Option<PresetCommandRecord>, StorageError>;

    async fn list_reader_mappings(
        &self,
        reader_id: i64,
    ) -> Result<Vec<ReaderCommandMapping>, StorageError>;
}

/// 控制日志接口（只追加）
#[async_trait]
pub trait ControlLogStore: Send + Sync {
    async fn append(&self, log: NewControlLog) -> Result<ControlLogRecord, StorageError>;

    /// 新到旧分页，`offset` 从 0 开始
    async fn list(
        &self,
        filter: &ControlLogFilter,
        offset: u64,
        limit: u64,
    ) -> Result<ControlLogPage, StorageError>;

    /// 清空全部日志，返回删除条数
    async fn clear(&self) -> Result<u64, StorageError>;
}

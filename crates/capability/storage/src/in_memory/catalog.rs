//! 目录读模型内存实现

use crate::error::StorageError;
use crate::models::{
    CatalogSnapshot, DeviceRecord, PresetCommandRecord, PresetRecord, ReaderCommandMapping,
    SpaceRecord,
};
use crate::traits::CatalogStore;
use domain::CommandType;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

#[derive(Default)]
struct CatalogTables {
    spaces: BTreeMap<i64, SpaceRecord>,
    presets: BTreeMap<i64, PresetRecord>,
    commands: BTreeMap<i64, PresetCommandRecord>,
    devices: BTreeMap<i64, DeviceRecord>,
    reader_mappings: Vec<ReaderCommandMapping>,
}

/// 目录内存存储
#[derive(Default)]
pub struct InMemoryCatalogStore {
    tables: RwLock<CatalogTables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let tables = CatalogTables {
            spaces: snapshot.spaces.into_iter().map(|s| (s.space_id, s)).collect(),
            presets: snapshot
                .presets
                .into_iter()
                .map(|p| (p.preset_id, p))
                .collect(),
            commands: snapshot
                .commands
                .into_iter()
                .map(|c| (c.command_id, c))
                .collect(),
            devices: snapshot
                .devices
                .into_iter()
                .map(|d| (d.device_id, d))
                .collect(),
            reader_mappings: snapshot.reader_mappings,
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// 从 JSON 文件加载目录快照
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&raw)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn insert_space(&self, record: SpaceRecord) -> Result<(), StorageError> {
        self.write()?.spaces.insert(record.space_id, record);
        Ok(())
    }

    pub fn insert_preset(&self, record: PresetRecord) -> Result<(), StorageError> {
        self.write()?.presets.insert(record.preset_id, record);
        Ok(())
    }

    pub fn insert_command(&self, record: PresetCommandRecord) -> Result<(), StorageError> {
        self.write()?.commands.insert(record.command_id, record);
        Ok(())
    }

    pub fn insert_device(&self, record: DeviceRecord) -> Result<(), StorageError> {
        self.write()?.devices.insert(record.device_id, record);
        Ok(())
    }

    pub fn insert_reader_mapping(&self, record: ReaderCommandMapping) -> Result<(), StorageError> {
        self.write()?.reader_mappings.push(record);
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, CatalogTables>, StorageError> {
        self.tables
            .read()
            .map_err(|_| StorageError::new("lock failed"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, CatalogTables>, StorageError> {
        self.tables
            .write()
            .map_err(|_| StorageError::new("lock failed"))
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_space(&self, space_id: i64) -> Result<Option<SpaceRecord>, StorageError> {
        Ok(self.read()?.spaces.get(&space_id).cloned())
    }

    async fn find_device(&self, device_id: i64) -> Result<Option<DeviceRecord>, StorageError> {
        Ok(self.read()?.devices.get(&device_id).cloned())
    }

    async fn find_preset(&self, preset_id: i64) -> Result<Option<PresetRecord>, StorageError> {
        Ok(self.read()?.presets.get(&preset_id).cloned())
    }

    async fn find_command(
        &self,
        command_id: i64,
    ) -> Result<Option<PresetCommandRecord>, StorageError> {
        Ok(self.read()?.commands.get(&command_id).cloned())
    }

    async fn list_active_devices(&self, space_id: i64) -> Result<Vec<DeviceRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .devices
            .values()
            .filter(|device| device.space_id == space_id && device.is_dispatchable())
            .cloned()
            .collect())
    }

    async fn find_command_by_type(
        &self,
        preset_id: i64,
        command_type: CommandType,
    ) -> Result<Option<PresetCommandRecord>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .commands
            .values()
            .find(|command| {
                command.preset_id == preset_id
                    && command.command_type == command_type
                    && !command.deleted
            })
            .cloned())
    }

    async fn list_reader_mappings(
        &self,
        reader_id: i64,
    ) -> Result<Vec<ReaderCommandMapping>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .reader_mappings
            .iter()
            .filter(|mapping| mapping.reader_id == reader_id)
            .cloned()
            .collect())
    }
}

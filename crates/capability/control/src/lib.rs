//! 协议下发引擎。
//!
//! 解析设备的有效地址（设备覆盖优先于预设默认值）与协议，调用传输驱动下发，
//! 并为每次尝试追加一条控制日志。批量与标签触发按设备顺序执行，单台失败不影响其余设备；
//! 批量中途的存储错误同样只记入该设备的结果。

use chrono::Utc;
use domain::{CommandType, ResultStatus, TagDirection, TriggerType};
use fm_protocol::{DeviceTransport, DispatchTarget, TransportError};
use fm_storage::{
    CatalogStore, ControlLogFilter, ControlLogRecord, ControlLogStore, DeviceCommandPair,
    DeviceRecord, NewControlLog, PresetCommandRecord, SpaceRecord, StorageError,
};
use fm_telemetry::{
    record_command_failure, record_command_latency_ms, record_command_success,
    record_command_timeout,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// 引擎级错误；单次下发的传输错误不会出现在这里，而是写入控制日志。
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for ControlError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// 批量 / 触发执行中的单设备结果。
#[derive(Debug, Clone)]
pub struct DeviceExecutionResult {
    pub device_id: i64,
    pub device_name: String,
    pub command_type: Option<CommandType>,
    pub result_status: ResultStatus,
    pub result_message: String,
    /// 未真正下发（缺少命令、设备不可用）时为 `None`
    pub log_id: Option<i64>,
}

impl DeviceExecutionResult {
    fn skipped(device_id: i64, device_name: String, message: impl Into<String>) -> Self {
        Self {
            device_id,
            device_name,
            command_type: None,
            result_status: ResultStatus::Fail,
            result_message: message.into(),
            log_id: None,
        }
    }

    /// 已下发但日志写入失败：保留下发结论，没有日志 ID
    fn unlogged(
        device: &DeviceRecord,
        command: &PresetCommandRecord,
        result_status: ResultStatus,
        result_message: String,
    ) -> Self {
        Self {
            device_id: device.device_id,
            device_name: device.name.clone(),
            command_type: Some(command.command_type),
            result_status,
            result_message,
            log_id: None,
        }
    }

    fn from_log(device: &DeviceRecord, command: &PresetCommandRecord, log: &ControlLogRecord) -> Self {
        Self {
            device_id: device.device_id,
            device_name: device.name.clone(),
            command_type: Some(command.command_type),
            result_status: log.result_status,
            result_message: log.result_message.clone(),
            log_id: Some(log.log_id),
        }
    }
}

/// 批量执行汇总。
#[derive(Debug, Clone)]
pub struct BatchExecutionResult {
    pub space_id: Option<i64>,
    pub space_name: Option<String>,
    pub total_devices: usize,
    pub results: Vec<DeviceExecutionResult>,
    pub success_count: usize,
    pub fail_count: usize,
}

impl BatchExecutionResult {
    fn new(space: Option<&SpaceRecord>, results: Vec<DeviceExecutionResult>) -> Self {
        let success_count = results
            .iter()
            .filter(|item| item.result_status.is_success())
            .count();
        Self {
            space_id: space.map(|s| s.space_id),
            space_name: space.map(|s| s.name.clone()),
            total_devices: results.len(),
            fail_count: results.len() - success_count,
            success_count,
            results,
        }
    }
}

/// 控制日志查询条件（页码从 1 开始）。
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub filter: ControlLogFilter,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// 带序号的控制日志：`no = total - skip - index`。
#[derive(Debug, Clone)]
pub struct NumberedControlLog {
    pub no: i64,
    pub record: ControlLogRecord,
}

#[derive(Debug, Clone)]
pub struct ControlLogListing {
    pub items: Vec<NumberedControlLog>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone)]
pub struct ControlServiceConfig {
    pub default_page_limit: u32,
    pub max_page_limit: u32,
}

impl Default for ControlServiceConfig {
    fn default() -> Self {
        Self {
            default_page_limit: 20,
            max_page_limit: 100,
        }
    }
}

pub struct ControlService {
    catalog: Arc<dyn CatalogStore>,
    logs: Arc<dyn ControlLogStore>,
    transport: Arc<dyn DeviceTransport>,
    config: ControlServiceConfig,
}

impl ControlService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        logs: Arc<dyn ControlLogStore>,
        transport: Arc<dyn DeviceTransport>,
    ) -> Self {
        Self::new_with_config(catalog, logs, transport, ControlServiceConfig::default())
    }

    pub fn new_with_config(
        catalog: Arc<dyn CatalogStore>,
        logs: Arc<dyn ControlLogStore>,
        transport: Arc<dyn DeviceTransport>,
        config: ControlServiceConfig,
    ) -> Self {
        Self {
            catalog,
            logs,
            transport,
            config,
        }
    }

    /// 单设备手动执行。
    pub async fn execute_single(
        &self,
        device_id: i64,
        command_id: i64,
        actor_id: i64,
    ) -> Result<ControlLogRecord, ControlError> {
        let device = self
            .catalog
            .find_device(device_id)
            .await?
            .filter(|device| !device.deleted)
            .ok_or(ControlError::NotFound("device"))?;
        if !device.status.is_active() {
            warn!(
                target: "fm.control",
                device_id,
                command_id,
                actor_id,
                "command_rejected_inactive_device"
            );
            return Err(ControlError::PreconditionFailed(format!(
                "device {} is inactive",
                device.name
            )));
        }
        let command = self
            .catalog
            .find_command(command_id)
            .await?
            .filter(|command| !command.deleted)
            .ok_or(ControlError::NotFound("command"))?;

        self.dispatch(&device, &command, actor_id, TriggerType::Manual)
            .await
    }

    /// 空间内全部 ACTIVE 设备按命令类型批量执行。
    pub async fn execute_batch(
        &self,
        space_id: i64,
        command_type: CommandType,
        actor_id: i64,
    ) -> Result<BatchExecutionResult, ControlError> {
        let space = self.find_space(space_id).await?;
        self.run_by_type(&space, command_type, actor_id, TriggerType::Manual)
            .await
    }

    /// 标签触发（按空间）：进入开机、离开关机，日志来源为 NFC。
    pub async fn execute_for_tag(
        &self,
        space_id: i64,
        direction: TagDirection,
        actor_id: i64,
    ) -> Result<BatchExecutionResult, ControlError> {
        let space = self.find_space(space_id).await?;
        self.run_by_type(&space, direction.command_type(), actor_id, TriggerType::Nfc)
            .await
    }

    /// 标签触发（显式映射）：只执行给定的 {设备, 命令} 对，不可用的对记为 FAIL 并继续。
    pub async fn execute_for_mappings(
        &self,
        pairs: &[DeviceCommandPair],
        actor_id: i64,
    ) -> Result<BatchExecutionResult, ControlError> {
        let mut results = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let device = match self.catalog.find_device(pair.device_id).await {
                Ok(Some(device)) if !device.deleted => device,
                Err(err) => {
                    results.push(storage_skipped(pair.device_id, String::new(), err));
                    continue;
                }
                _ => {
                    results.push(DeviceExecutionResult::skipped(
                        pair.device_id,
                        String::new(),
                        "device not found",
                    ));
                    continue;
                }
            };
            if !device.status.is_active() {
                results.push(DeviceExecutionResult::skipped(
                    device.device_id,
                    device.name,
                    "device is inactive",
                ));
                continue;
            }
            let command = match self.catalog.find_command(pair.command_id).await {
                Ok(Some(command)) if !command.deleted => command,
                Err(err) => {
                    results.push(storage_skipped(device.device_id, device.name, err));
                    continue;
                }
                _ => {
                    results.push(DeviceExecutionResult::skipped(
                        device.device_id,
                        device.name,
                        "command not found",
                    ));
                    continue;
                }
            };

            results.push(
                self.dispatch_in_batch(&device, &command, actor_id, TriggerType::Nfc)
                    .await,
            );
        }

        let summary = BatchExecutionResult::new(None, results);
        info!(
            target: "fm.control",
            pairs = pairs.len(),
            success_count = summary.success_count,
            fail_count = summary.fail_count,
            "mapping_trigger_completed"
        );
        Ok(summary)
    }

    /// 读卡器触发：有映射时按映射执行，否则退回空间内按类型执行。
    pub async fn execute_for_reader(
        &self,
        reader_id: i64,
        space_id: i64,
        direction: TagDirection,
        actor_id: i64,
    ) -> Result<BatchExecutionResult, ControlError> {
        let mappings = self.catalog.list_reader_mappings(reader_id).await?;
        if mappings.is_empty() {
            return self.execute_for_tag(space_id, direction, actor_id).await;
        }
        let pairs: Vec<DeviceCommandPair> = mappings
            .iter()
            .filter_map(|mapping| mapping.pair_for(direction))
            .collect();
        self.execute_for_mappings(&pairs, actor_id).await
    }

    /// 分页查询控制日志（新到旧）。
    pub async fn get_logs(&self, query: LogQuery) -> Result<ControlLogListing, ControlError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(self.config.default_page_limit)
            .clamp(1, self.config.max_page_limit.max(1));
        let skip = u64::from(page - 1) * u64::from(limit);

        let result = self.logs.list(&query.filter, skip, u64::from(limit)).await?;
        let total = result.total;
        let items = result
            .items
            .into_iter()
            .enumerate()
            .map(|(index, record)| NumberedControlLog {
                no: total as i64 - skip as i64 - index as i64,
                record,
            })
            .collect();

        Ok(ControlLogListing {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(u64::from(limit)),
        })
    }

    /// 清空控制日志，返回删除条数。
    pub async fn clear_logs(&self) -> Result<u64, ControlError> {
        let deleted = self.logs.clear().await?;
        info!(target: "fm.control", deleted, "control_logs_cleared");
        Ok(deleted)
    }

    async fn find_space(&self, space_id: i64) -> Result<SpaceRecord, ControlError> {
        self.catalog
            .find_space(space_id)
            .await?
            .filter(|space| !space.deleted)
            .ok_or(ControlError::NotFound("space"))
    }

    async fn run_by_type(
        &self,
        space: &SpaceRecord,
        command_type: CommandType,
        actor_id: i64,
        trigger: TriggerType,
    ) -> Result<BatchExecutionResult, ControlError> {
        let devices = self.catalog.list_active_devices(space.space_id).await?;
        let mut results = Vec::with_capacity(devices.len());
        for device in devices {
            let command = match self
                .catalog
                .find_command_by_type(device.preset_id, command_type)
                .await
            {
                Ok(command) => command,
                Err(err) => {
                    results.push(storage_skipped(device.device_id, device.name, err));
                    continue;
                }
            };
            let Some(command) = command else {
                results.push(DeviceExecutionResult::skipped(
                    device.device_id,
                    device.name,
                    format!("{} command type not found", command_type.as_str()),
                ));
                continue;
            };
            results.push(
                self.dispatch_in_batch(&device, &command, actor_id, trigger)
                    .await,
            );
        }

        let summary = BatchExecutionResult::new(Some(space), results);
        info!(
            target: "fm.control",
            space_id = space.space_id,
            command_type = %command_type.as_str(),
            trigger = %trigger.as_str(),
            total_devices = summary.total_devices,
            success_count = summary.success_count,
            fail_count = summary.fail_count,
            "batch_execution_completed"
        );
        Ok(summary)
    }

    /// 解析目标、下发并写日志；传输错误被吸收进日志。
    async fn dispatch(
        &self,
        device: &DeviceRecord,
        command: &PresetCommandRecord,
        actor_id: i64,
        trigger: TriggerType,
    ) -> Result<ControlLogRecord, ControlError> {
        let (result_status, result_message) = self.attempt(device, command, actor_id, trigger).await;
        self.record(device, command, actor_id, trigger, result_status, result_message)
            .await
    }

    /// 批量中的单台下发：日志写不进去时仍返回下发结论。
    async fn dispatch_in_batch(
        &self,
        device: &DeviceRecord,
        command: &PresetCommandRecord,
        actor_id: i64,
        trigger: TriggerType,
    ) -> DeviceExecutionResult {
        let (result_status, result_message) = self.attempt(device, command, actor_id, trigger).await;
        match self
            .record(device, command, actor_id, trigger, result_status, result_message.clone())
            .await
        {
            Ok(log) => DeviceExecutionResult::from_log(device, command, &log),
            Err(err) => {
                warn!(
                    target: "fm.control",
                    device_id = device.device_id,
                    command_id = command.command_id,
                    error = %err,
                    "control_log_append_failed"
                );
                DeviceExecutionResult::unlogged(device, command, result_status, result_message)
            }
        }
    }

    async fn attempt(
        &self,
        device: &DeviceRecord,
        command: &PresetCommandRecord,
        actor_id: i64,
        trigger: TriggerType,
    ) -> (ResultStatus, String) {
        let started_at = Instant::now();
        let outcome = match self.catalog.find_preset(device.preset_id).await {
            Ok(Some(preset)) => {
                let target = DispatchTarget {
                    protocol: preset.protocol,
                    ip: non_blank(device.ip.as_deref()).or(non_blank(preset.default_ip.as_deref())),
                    port: device.port.or(preset.default_port),
                };
                self.transport.send(&target, &command.code).await
            }
            Ok(None) => Err(TransportError::Connection(
                "protocol preset not found".to_string(),
            )),
            Err(err) => Err(TransportError::Connection(format!("storage error: {err}"))),
        };
        record_command_latency_ms(started_at.elapsed().as_millis() as u64);

        let (result_status, result_message) = classify(outcome);
        match result_status {
            ResultStatus::Success => record_command_success(),
            ResultStatus::Timeout => record_command_timeout(),
            ResultStatus::Fail => record_command_failure(),
        }
        info!(
            target: "fm.control",
            device_id = device.device_id,
            command_id = command.command_id,
            actor_id,
            trigger = %trigger.as_str(),
            result_status = %result_status.as_str(),
            result_message = %result_message,
            "command_executed"
        );
        (result_status, result_message)
    }

    async fn record(
        &self,
        device: &DeviceRecord,
        command: &PresetCommandRecord,
        actor_id: i64,
        trigger: TriggerType,
        result_status: ResultStatus,
        result_message: String,
    ) -> Result<ControlLogRecord, ControlError> {
        let log = self
            .logs
            .append(NewControlLog {
                space_id: device.space_id,
                device_id: device.device_id,
                command_id: command.command_id,
                actor_id,
                trigger_type: trigger,
                result_status,
                result_message,
                executed_at_ms: Utc::now().timestamp_millis(),
            })
            .await?;
        Ok(log)
    }
}

/// 批量中查目录失败：该设备记 FAIL，继续下一台
fn storage_skipped(device_id: i64, device_name: String, err: StorageError) -> DeviceExecutionResult {
    warn!(target: "fm.control", device_id, error = %err, "catalog_lookup_failed");
    DeviceExecutionResult::skipped(device_id, device_name, format!("storage error: {err}"))
}

fn classify(outcome: Result<String, TransportError>) -> (ResultStatus, String) {
    match outcome {
        Ok(message) => (ResultStatus::Success, message),
        Err(err) if err.is_timeout() => (ResultStatus::Timeout, err.to_string()),
        Err(err) => (ResultStatus::Fail, err.to_string()),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

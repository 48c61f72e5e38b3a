use async_trait::async_trait;
use domain::{CommandType, DeviceStatus, ProtocolType, ResultStatus, TagDirection, TriggerType};
use fm_control::{ControlError, ControlService, LogQuery};
use fm_protocol::{DeviceTransport, DispatchTarget, TransportError};
use fm_storage::{
    ControlLogFilter, ControlLogPage, ControlLogRecord, ControlLogStore, DeviceCommandPair,
    DeviceRecord, InMemoryCatalogStore, InMemoryControlLogStore, NewControlLog,
    PresetCommandRecord, PresetRecord, ReaderCommandMapping, SpaceRecord, StorageError,
};
use std::sync::{Arc, Mutex};

/// 按 IP 决定结果的假驱动："slow" 超时，"down" 连接失败，其余回 ACK。
#[derive(Default)]
struct ScriptedTransport {
    calls: Mutex<Vec<(DispatchTarget, String)>>,
}

impl ScriptedTransport {
    fn calls(&self) -> Vec<(DispatchTarget, String)> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn send(&self, target: &DispatchTarget, code: &str) -> Result<String, TransportError> {
        self.calls
            .lock()
            .expect("lock")
            .push((target.clone(), code.to_string()));
        match target.ip.as_deref() {
            None => Err(TransportError::MissingAddress),
            Some("slow") => Err(TransportError::Timeout("connection timeout (5000ms)".into())),
            Some("down") => Err(TransportError::Connection("connection refused".into())),
            Some(_) => Ok("ACK".to_string()),
        }
    }
}

struct Fixture {
    catalog: Arc<InMemoryCatalogStore>,
    logs: Arc<InMemoryControlLogStore>,
    transport: Arc<ScriptedTransport>,
    service: ControlService,
}

fn device(device_id: i64, preset_id: i64, ip: Option<&str>, status: DeviceStatus) -> DeviceRecord {
    DeviceRecord {
        device_id,
        space_id: 1,
        preset_id,
        name: format!("device-{device_id}"),
        ip: ip.map(str::to_string),
        port: None,
        status,
        deleted: false,
    }
}

fn command(command_id: i64, preset_id: i64, command_type: CommandType) -> PresetCommandRecord {
    PresetCommandRecord {
        command_id,
        preset_id,
        name: format!("command-{command_id}"),
        code: "PWR ON\\r".to_string(),
        command_type,
        deleted: false,
    }
}

fn fixture() -> Fixture {
    let catalog = Arc::new(InMemoryCatalogStore::new());
    catalog
        .insert_space(SpaceRecord {
            space_id: 1,
            name: "Room 101".to_string(),
            deleted: false,
        })
        .expect("space");
    catalog
        .insert_space(SpaceRecord {
            space_id: 2,
            name: "Empty".to_string(),
            deleted: false,
        })
        .expect("space");
    catalog
        .insert_preset(PresetRecord {
            preset_id: 10,
            name: "Projector".to_string(),
            protocol: ProtocolType::Tcp,
            default_ip: Some("10.0.0.20".to_string()),
            default_port: Some(5000),
        })
        .expect("preset");
    catalog
        .insert_preset(PresetRecord {
            preset_id: 20,
            name: "Screen".to_string(),
            protocol: ProtocolType::Udp,
            default_ip: None,
            default_port: None,
        })
        .expect("preset");
    catalog
        .insert_command(command(100, 10, CommandType::PowerOn))
        .expect("command");
    catalog
        .insert_command(command(101, 10, CommandType::PowerOff))
        .expect("command");
    catalog
        .insert_command(command(200, 20, CommandType::PowerOff))
        .expect("command");

    let logs = Arc::new(InMemoryControlLogStore::new());
    let transport = Arc::new(ScriptedTransport::default());
    let service = ControlService::new(catalog.clone(), logs.clone(), transport.clone());
    Fixture {
        catalog,
        logs,
        transport,
        service,
    }
}

#[tokio::test]
async fn single_execution_logs_manual_success() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, Some("10.0.0.99"), DeviceStatus::Active))
        .expect("device");

    let log = fx.service.execute_single(1, 100, 7).await.expect("execute");
    assert_eq!(log.result_status, ResultStatus::Success);
    assert_eq!(log.result_message, "ACK");
    assert_eq!(log.trigger_type, TriggerType::Manual);
    assert_eq!(log.actor_id, 7);

    let calls = fx.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.ip.as_deref(), Some("10.0.0.99"));
    assert_eq!(calls[0].0.port, Some(5000));
    assert_eq!(calls[0].0.protocol, ProtocolType::Tcp);
}

#[tokio::test]
async fn inactive_device_is_rejected_without_log() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, None, DeviceStatus::Inactive))
        .expect("device");

    let err = fx.service.execute_single(1, 100, 0).await.expect_err("inactive");
    assert!(matches!(err, ControlError::PreconditionFailed(_)));
    assert!(fx.logs.snapshot().expect("logs").is_empty());
    assert!(fx.transport.calls().is_empty());
}

#[tokio::test]
async fn missing_or_deleted_records_are_not_found() {
    let fx = fixture();
    let mut gone = device(1, 10, None, DeviceStatus::Active);
    gone.deleted = true;
    fx.catalog.insert_device(gone).expect("device");
    fx.catalog
        .insert_device(device(2, 10, None, DeviceStatus::Active))
        .expect("device");
    let mut deleted_command = command(102, 10, CommandType::Custom);
    deleted_command.deleted = true;
    fx.catalog.insert_command(deleted_command).expect("command");

    for (device_id, command_id) in [(1, 100), (99, 100), (2, 999), (2, 102)] {
        let err = fx
            .service
            .execute_single(device_id, command_id, 0)
            .await
            .expect_err("not found");
        assert!(matches!(err, ControlError::NotFound(_)));
    }
    assert!(fx.logs.snapshot().expect("logs").is_empty());
}

#[tokio::test]
async fn transport_outcomes_are_classified_and_logged() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, Some("slow"), DeviceStatus::Active))
        .expect("device");
    fx.catalog
        .insert_device(device(2, 10, Some("down"), DeviceStatus::Active))
        .expect("device");
    fx.catalog
        .insert_device(device(3, 20, None, DeviceStatus::Active))
        .expect("device");

    let slow = fx.service.execute_single(1, 100, 0).await.expect("execute");
    assert_eq!(slow.result_status, ResultStatus::Timeout);
    let down = fx.service.execute_single(2, 100, 0).await.expect("execute");
    assert_eq!(down.result_status, ResultStatus::Fail);
    let unaddressed = fx.service.execute_single(3, 200, 0).await.expect("execute");
    assert_eq!(unaddressed.result_status, ResultStatus::Fail);
    assert_eq!(unaddressed.result_message, "communication IP not configured");

    assert_eq!(fx.logs.snapshot().expect("logs").len(), 3);
}

#[tokio::test]
async fn batch_on_space_without_devices_is_empty() {
    let fx = fixture();
    let result = fx
        .service
        .execute_batch(2, CommandType::PowerOn, 0)
        .await
        .expect("batch");
    assert_eq!(result.total_devices, 0);
    assert!(result.results.is_empty());
    assert_eq!(result.success_count, 0);
    assert_eq!(result.fail_count, 0);
    assert_eq!(result.space_name.as_deref(), Some("Empty"));
}

#[tokio::test]
async fn batch_reports_devices_without_matching_command() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, None, DeviceStatus::Active))
        .expect("device");
    fx.catalog
        .insert_device(device(2, 20, Some("10.0.0.30"), DeviceStatus::Active))
        .expect("device");
    fx.catalog
        .insert_device(device(3, 10, None, DeviceStatus::Inactive))
        .expect("device");

    let result = fx
        .service
        .execute_batch(1, CommandType::PowerOn, 0)
        .await
        .expect("batch");
    assert_eq!(result.total_devices, 2);
    assert_eq!(result.success_count + result.fail_count, 2);
    assert_eq!(result.results[0].device_id, 1);
    assert_eq!(result.results[0].result_status, ResultStatus::Success);
    assert_eq!(result.results[1].result_status, ResultStatus::Fail);
    assert_eq!(
        result.results[1].result_message,
        "POWER_ON command type not found"
    );
    assert!(result.results[1].log_id.is_none());
    assert_eq!(fx.logs.snapshot().expect("logs").len(), 1);
}

#[tokio::test]
async fn batch_on_unknown_space_is_not_found() {
    let fx = fixture();
    let err = fx
        .service
        .execute_batch(42, CommandType::PowerOff, 0)
        .await
        .expect_err("space");
    assert!(matches!(err, ControlError::NotFound("space")));
}

#[tokio::test]
async fn tag_trigger_tags_logs_as_nfc() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, None, DeviceStatus::Active))
        .expect("device");
    fx.catalog
        .insert_device(device(2, 10, Some("down"), DeviceStatus::Active))
        .expect("device");

    let result = fx
        .service
        .execute_for_tag(1, TagDirection::Exit, 0)
        .await
        .expect("trigger");
    assert_eq!(result.success_count, 1);
    assert_eq!(result.fail_count, 1);
    assert_eq!(result.results[0].command_type, Some(CommandType::PowerOff));

    let logs = fx.logs.snapshot().expect("logs");
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|log| log.trigger_type == TriggerType::Nfc));
    assert!(logs.iter().all(|log| log.command_id == 101));
}

#[tokio::test]
async fn mapping_trigger_skips_unusable_pairs_and_continues() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, None, DeviceStatus::Inactive))
        .expect("device");
    fx.catalog
        .insert_device(device(2, 10, None, DeviceStatus::Active))
        .expect("device");
    let mut deleted_command = command(103, 10, CommandType::Custom);
    deleted_command.deleted = true;
    fx.catalog.insert_command(deleted_command).expect("command");

    let pairs = [
        DeviceCommandPair { device_id: 1, command_id: 100 },
        DeviceCommandPair { device_id: 2, command_id: 103 },
        DeviceCommandPair { device_id: 77, command_id: 100 },
        DeviceCommandPair { device_id: 2, command_id: 100 },
    ];
    let result = fx
        .service
        .execute_for_mappings(&pairs, 0)
        .await
        .expect("trigger");
    let statuses: Vec<ResultStatus> = result.results.iter().map(|r| r.result_status).collect();
    assert_eq!(
        statuses,
        vec![
            ResultStatus::Fail,
            ResultStatus::Fail,
            ResultStatus::Fail,
            ResultStatus::Success
        ]
    );
    assert_eq!(result.results[0].result_message, "device is inactive");
    assert_eq!(result.results[1].result_message, "command not found");
    assert!(result.space_id.is_none());
    assert_eq!(fx.logs.snapshot().expect("logs").len(), 1);
}

#[tokio::test]
async fn reader_without_mappings_falls_back_to_space() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, None, DeviceStatus::Active))
        .expect("device");
    fx.catalog
        .insert_device(device(2, 10, None, DeviceStatus::Active))
        .expect("device");

    let fallback = fx
        .service
        .execute_for_reader(5, 1, TagDirection::Enter, 0)
        .await
        .expect("trigger");
    assert_eq!(fallback.total_devices, 2);

    fx.catalog
        .insert_reader_mapping(ReaderCommandMapping {
            reader_id: 5,
            device_id: 2,
            enter_command_id: Some(101),
            exit_command_id: None,
        })
        .expect("mapping");
    let mapped = fx
        .service
        .execute_for_reader(5, 1, TagDirection::Enter, 0)
        .await
        .expect("trigger");
    assert_eq!(mapped.total_devices, 1);
    assert_eq!(mapped.results[0].command_type, Some(CommandType::PowerOff));
}

#[tokio::test]
async fn logs_are_numbered_from_total_down() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, None, DeviceStatus::Active))
        .expect("device");
    for _ in 0..5 {
        fx.service.execute_single(1, 100, 0).await.expect("execute");
    }

    let listing = fx
        .service
        .get_logs(LogQuery {
            page: Some(2),
            limit: Some(2),
            ..LogQuery::default()
        })
        .await
        .expect("logs");
    assert_eq!(listing.total, 5);
    assert_eq!(listing.total_pages, 3);
    let numbers: Vec<i64> = listing.items.iter().map(|item| item.no).collect();
    assert_eq!(numbers, vec![3, 2]);

    assert_eq!(fx.service.clear_logs().await.expect("clear"), 5);
    let empty = fx.service.get_logs(LogQuery::default()).await.expect("logs");
    assert_eq!(empty.total, 0);
    assert_eq!(empty.limit, 20);
}

/// 指定设备的日志写入失败，其余交给内存实现
struct FailingLogStore {
    inner: InMemoryControlLogStore,
    failing_device: i64,
}

#[async_trait]
impl ControlLogStore for FailingLogStore {
    async fn append(&self, log: NewControlLog) -> Result<ControlLogRecord, StorageError> {
        if log.device_id == self.failing_device {
            return Err(StorageError::new("disk full"));
        }
        self.inner.append(log).await
    }

    async fn list(
        &self,
        filter: &ControlLogFilter,
        offset: u64,
        limit: u64,
    ) -> Result<ControlLogPage, StorageError> {
        self.inner.list(filter, offset, limit).await
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        self.inner.clear().await
    }
}

#[tokio::test]
async fn batch_continues_when_log_append_fails() {
    let fx = fixture();
    fx.catalog
        .insert_device(device(1, 10, Some("10.0.0.31"), DeviceStatus::Active))
        .expect("device");
    fx.catalog
        .insert_device(device(2, 10, Some("10.0.0.32"), DeviceStatus::Active))
        .expect("device");
    let logs = Arc::new(FailingLogStore {
        inner: InMemoryControlLogStore::new(),
        failing_device: 1,
    });
    let service = ControlService::new(fx.catalog.clone(), logs.clone(), fx.transport.clone());

    let result = service
        .execute_batch(1, CommandType::PowerOn, 0)
        .await
        .expect("batch");

    // 两台都已下发，第一台只是没有日志
    assert_eq!(fx.transport.calls().len(), 2);
    assert_eq!(result.total_devices, 2);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.results[0].device_id, 1);
    assert_eq!(result.results[0].result_status, ResultStatus::Success);
    assert!(result.results[0].log_id.is_none());
    assert!(result.results[1].log_id.is_some());
    assert_eq!(logs.inner.snapshot().expect("logs").len(), 1);

    // 单设备执行仍然把存储错误返回给调用方
    let err = service.execute_single(1, 100, 0).await.expect_err("append");
    assert!(matches!(err, ControlError::Storage(_)));
}

//! Postgres 控制日志实现

use crate::error::StorageError;
use crate::models::{ControlLogFilter, ControlLogPage, ControlLogRecord, NewControlLog};
use crate::traits::ControlLogStore;
use domain::{ResultStatus, TriggerType};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const FILTER_CLAUSE: &str = "where ($1::bigint is null or space_id = $1) \
     and ($2::bigint is null or device_id = $2) \
     and ($3::text is null or result_status = $3) \
     and ($4::bigint is null or executed_at >= to_timestamp($4 / 1000.0)) \
     and ($5::bigint is null or executed_at <= to_timestamp($5 / 1000.0))";

pub struct PgControlLogStore {
    pub pool: PgPool,
}

impl PgControlLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &PgRow) -> Result<ControlLogRecord, StorageError> {
    let trigger: String = row.try_get("trigger_type")?;
    let status: String = row.try_get("result_status")?;
    Ok(ControlLogRecord {
        log_id: row.try_get("log_id")?,
        space_id: row.try_get("space_id")?,
        device_id: row.try_get("device_id")?,
        command_id: row.try_get("command_id")?,
        actor_id: row.try_get("actor_id")?,
        trigger_type: trigger
            .parse::<TriggerType>()
            .map_err(|err| StorageError::new(err.to_string()))?,
        result_status: status
            .parse::<ResultStatus>()
            .map_err(|err| StorageError::new(err.to_string()))?,
        result_message: row.try_get("result_message")?,
        executed_at_ms: row.try_get("executed_at_ms")?,
    })
}

#[async_trait::async_trait]
impl ControlLogStore for PgControlLogStore {
    async fn append(&self, log: NewControlLog) -> Result<ControlLogRecord, StorageError> {
        let row = sqlx::query(
            "insert into control_logs \
             (space_id, device_id, command_id, actor_id, trigger_type, result_status, \
             result_message, executed_at) \
             values ($1, $2, $3, $4, $5, $6, $7, to_timestamp($8 / 1000.0)) \
             returning log_id",
        )
        .bind(log.space_id)
        .bind(log.device_id)
        .bind(log.command_id)
        .bind(log.actor_id)
        .bind(log.trigger_type.as_str())
        .bind(log.result_status.as_str())
        .bind(&log.result_message)
        .bind(log.executed_at_ms as f64)
        .fetch_one(&self.pool)
        .await?;
        let log_id: i64 = row.try_get("log_id")?;
        Ok(ControlLogRecord::from_new(log_id, log))
    }

    async fn list(
        &self,
        filter: &ControlLogFilter,
        offset: u64,
        limit: u64,
    ) -> Result<ControlLogPage, StorageError> {
        let status = filter.result_status.map(|s| s.as_str());

        let count_sql = format!("select count(*) as total from control_logs {FILTER_CLAUSE}");
        let total: i64 = sqlx::query(&count_sql)
            .bind(filter.space_id)
            .bind(filter.device_id)
            .bind(status)
            .bind(filter.from_ms)
            .bind(filter.to_ms)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let list_sql = format!(
            "select log_id, space_id, device_id, command_id, actor_id, trigger_type, \
             result_status, result_message, \
             (extract(epoch from executed_at) * 1000)::bigint as executed_at_ms \
             from control_logs {FILTER_CLAUSE} \
             order by executed_at desc, log_id desc \
             offset $6 limit $7"
        );
        let rows = sqlx::query(&list_sql)
            .bind(filter.space_id)
            .bind(filter.device_id)
            .bind(status)
            .bind(filter.from_ms)
            .bind(filter.to_ms)
            .bind(offset as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(row_to_record(row)?);
        }
        Ok(ControlLogPage {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("delete from control_logs")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

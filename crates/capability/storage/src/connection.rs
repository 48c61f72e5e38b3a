//! 数据库连接管理
//!
//! - connect_pool：建立 Postgres 连接池（最大连接数 8）
//! - ensure_schema：创建控制日志表

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const CONTROL_LOG_SCHEMA: &str = "create table if not exists control_logs (\
     log_id bigserial primary key, \
     space_id bigint not null, \
     device_id bigint not null, \
     command_id bigint not null, \
     actor_id bigint not null, \
     trigger_type text not null, \
     result_status text not null, \
     result_message text not null, \
     executed_at timestamptz not null)";

const CONTROL_LOG_INDEX: &str =
    "create index if not exists idx_control_logs_executed_at on control_logs (executed_at desc)";

/// 建立 Postgres 连接池
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// 幂等创建 `control_logs` 表及时间索引
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query(CONTROL_LOG_SCHEMA).execute(pool).await?;
    sqlx::query(CONTROL_LOG_INDEX).execute(pool).await?;
    Ok(())
}

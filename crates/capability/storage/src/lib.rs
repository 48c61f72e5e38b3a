//! # 设备控制存储模块
//!
//! 两类数据：
//!
//! 1. **目录读模型**（空间、协议预设、预设命令、设备、读卡器映射）：由外部系统维护，
//!    这里只读；进程内以 [`InMemoryCatalogStore`] 承载，可从 JSON 快照加载。
//! 2. **控制日志**：每次下发尝试追加一条，不可修改；内存实现用于测试，
//!    PostgreSQL 实现用于生产。
//!
//! ## 模块说明
//!
//! - [`models`]：数据模型
//! - [`traits`]：`CatalogStore` / `ControlLogStore` 接口
//! - [`error`]：存储错误类型
//! - [`connection`]：PostgreSQL 连接池与表结构
//! - [`in_memory`] / [`postgres`]：实现

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;

pub use in_memory::{InMemoryCatalogStore, InMemoryControlLogStore};
pub use postgres::PgControlLogStore;

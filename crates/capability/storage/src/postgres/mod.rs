//! # PostgreSQL 存储实现模块
//!
//! 只有控制日志落库；目录由外部系统维护。表结构见 [`crate::connection::ensure_schema`]。

pub mod control_log;

pub use control_log::*;

//! 内存存储实现模块
//!
//! - CatalogStore: InMemoryCatalogStore（可从 JSON 快照加载）
//! - ControlLogStore: InMemoryControlLogStore（测试与无数据库部署）

pub mod catalog;
pub mod control_log;

pub use catalog::*;
pub use control_log::*;

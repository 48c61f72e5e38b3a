//! Handlers 模块

pub mod control;
pub mod health;
pub mod metrics;

pub use control::*;
pub use health::*;
pub use metrics::*;

//! 运行配置加载。
//!
//! - [`AppConfig`]：控制后端，全部来自环境变量
//! - [`AgentConfig`]：NFC 边缘代理，JSON 文件 + 环境变量覆盖

mod agent;

pub use agent::{AgentConfig, PLACEHOLDER_API_KEY};

use std::env;
use std::path::PathBuf;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("{0} still holds the placeholder value; set a real key")]
    Placeholder(String),
    #[error("cannot read config file {0}: {1}")]
    Read(String, String),
}

/// 控制后端运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 设置时控制日志写入 Postgres，否则写内存
    pub database_url: Option<String>,
    /// 外部目录的 JSON 快照
    pub catalog_path: Option<PathBuf>,
    pub device_timeout_ms: u64,
    pub tcp_grace_ms: u64,
    pub log_level: String,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr = env::var("FM_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("FM_DATABASE_URL");
        let catalog_path = read_optional("FM_CATALOG_PATH").map(PathBuf::from);
        let device_timeout_ms = read_u64_with_default("FM_DEVICE_TIMEOUT_MS", 5000)?;
        let tcp_grace_ms = read_u64_with_default("FM_TCP_GRACE_MS", 2000)?;
        let log_level = read_optional("FM_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        if device_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "FM_DEVICE_TIMEOUT_MS".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            http_addr,
            database_url,
            catalog_path,
            device_timeout_ms,
            tcp_grace_ms,
            log_level,
        })
    }
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

//! NFC 边缘代理配置。
//!
//! 读取顺序：JSON 文件（camelCase 键）→ `FM_AGENT_*` 环境变量覆盖 → 默认值 → 校验。

use crate::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 示例配置里的占位 key，视为未配置。
pub const PLACEHOLDER_API_KEY: &str = "rdr_YOUR_API_KEY_HERE";

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAgentConfig {
    api_url: Option<String>,
    api_key: Option<String>,
    retry_interval: Option<u64>,
    offline_queue_max: Option<usize>,
    buzzer_enabled: Option<bool>,
    log_level: Option<String>,
    ws_enabled: Option<bool>,
    ws_port: Option<u16>,
    aid_list: Option<Vec<String>>,
    queue_path: Option<String>,
}

/// 边缘代理运行配置。
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// 后端根地址（无尾部 `/`）
    pub api_url: String,
    pub api_key: String,
    /// 离线队列补发间隔（毫秒）
    pub retry_interval_ms: u64,
    pub offline_queue_max: usize,
    pub buzzer_enabled: bool,
    pub log_level: String,
    pub ws_enabled: bool,
    pub ws_port: u16,
    /// 大写十六进制 AID
    pub aid_list: Vec<String>,
    pub queue_path: PathBuf,
}

impl AgentConfig {
    /// `FM_AGENT_CONFIG`（默认 `config.json`）存在则读取，再叠加环境变量。
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("FM_AGENT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let raw = if Path::new(&path).exists() {
            read_file(Path::new(&path))?
        } else {
            RawAgentConfig::default()
        };
        finalize(apply_overrides(raw, |key| std::env::var(key).ok())?)
    }

    /// 只读取 JSON 文件，不叠加环境变量。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        finalize(read_file(path.as_ref())?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let raw: RawAgentConfig = serde_json::from_str(raw)
            .map_err(|err| ConfigError::Invalid("config.json".to_string(), err.to_string()))?;
        finalize(raw)
    }

    /// 以给定的查找函数代替进程环境，叠加在 JSON 之上。
    pub fn from_json_with_overrides(
        raw: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw: RawAgentConfig = serde_json::from_str(raw)
            .map_err(|err| ConfigError::Invalid("config.json".to_string(), err.to_string()))?;
        finalize(apply_overrides(raw, lookup)?)
    }
}

fn read_file(path: &Path) -> Result<RawAgentConfig, ConfigError> {
    let display = path.display().to_string();
    let text =
        std::fs::read_to_string(path).map_err(|err| ConfigError::Read(display.clone(), err.to_string()))?;
    serde_json::from_str(&text).map_err(|err| ConfigError::Invalid(display, err.to_string()))
}

fn apply_overrides(
    mut raw: RawAgentConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RawAgentConfig, ConfigError> {
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = get("FM_AGENT_API_URL") {
        raw.api_url = Some(value);
    }
    if let Some(value) = get("FM_AGENT_API_KEY") {
        raw.api_key = Some(value);
    }
    if let Some(value) = get("FM_AGENT_RETRY_INTERVAL_MS") {
        raw.retry_interval = Some(parse("FM_AGENT_RETRY_INTERVAL_MS", &value)?);
    }
    if let Some(value) = get("FM_AGENT_OFFLINE_QUEUE_MAX") {
        raw.offline_queue_max = Some(parse("FM_AGENT_OFFLINE_QUEUE_MAX", &value)?);
    }
    if let Some(value) = get("FM_AGENT_BUZZER_ENABLED") {
        raw.buzzer_enabled = Some(parse_bool(&value));
    }
    if let Some(value) = get("FM_AGENT_LOG_LEVEL") {
        raw.log_level = Some(value);
    }
    if let Some(value) = get("FM_AGENT_WS_ENABLED") {
        raw.ws_enabled = Some(parse_bool(&value));
    }
    if let Some(value) = get("FM_AGENT_WS_PORT") {
        raw.ws_port = Some(parse("FM_AGENT_WS_PORT", &value)?);
    }
    if let Some(value) = get("FM_AGENT_AID_LIST") {
        raw.aid_list = Some(value.split(',').map(str::to_string).collect());
    }
    if let Some(value) = get("FM_AGENT_QUEUE_PATH") {
        raw.queue_path = Some(value);
    }
    Ok(raw)
}

fn finalize(raw: RawAgentConfig) -> Result<AgentConfig, ConfigError> {
    let api_url = raw
        .api_url
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ConfigError::Missing("apiUrl".to_string()))?;
    let api_key = raw
        .api_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ConfigError::Missing("apiKey".to_string()))?;
    if api_key == PLACEHOLDER_API_KEY {
        return Err(ConfigError::Placeholder("apiKey".to_string()));
    }

    let offline_queue_max = raw.offline_queue_max.unwrap_or(100);
    if offline_queue_max == 0 {
        return Err(ConfigError::Invalid(
            "offlineQueueMax".to_string(),
            "0".to_string(),
        ));
    }
    let retry_interval_ms = raw.retry_interval.unwrap_or(5000);
    if retry_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "retryInterval".to_string(),
            "0".to_string(),
        ));
    }

    let mut aid_list = Vec::new();
    for aid in raw.aid_list.unwrap_or_default() {
        let normalized: String = aid
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        if normalized.is_empty() {
            continue;
        }
        // AID 长度 5..=16 字节
        let valid = normalized.len() % 2 == 0
            && (10..=32).contains(&normalized.len())
            && normalized.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(ConfigError::Invalid("aidList".to_string(), aid));
        }
        aid_list.push(normalized);
    }

    Ok(AgentConfig {
        api_url,
        api_key,
        retry_interval_ms,
        offline_queue_max,
        buzzer_enabled: raw.buzzer_enabled.unwrap_or(true),
        log_level: raw.log_level.unwrap_or_else(|| "info".to_string()),
        ws_enabled: raw.ws_enabled.unwrap_or(true),
        ws_port: raw.ws_port.unwrap_or(8090),
        aid_list,
        queue_path: PathBuf::from(raw.queue_path.unwrap_or_else(|| ".queue.json".to_string())),
    })
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value.to_string()))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on")
}

use fm_config::{AgentConfig, ConfigError};
use std::io::Write;

const MINIMAL: &str = r#"{"apiUrl": "http://backend:3000/api/", "apiKey": "rdr_live_123"}"#;

#[test]
fn defaults_fill_missing_keys() {
    let config = AgentConfig::from_json_str(MINIMAL).expect("config");
    assert_eq!(config.api_url, "http://backend:3000/api");
    assert_eq!(config.retry_interval_ms, 5000);
    assert_eq!(config.offline_queue_max, 100);
    assert!(config.buzzer_enabled);
    assert!(config.ws_enabled);
    assert_eq!(config.ws_port, 8090);
    assert!(config.aid_list.is_empty());
    assert_eq!(config.queue_path.to_str(), Some(".queue.json"));
}

#[test]
fn placeholder_key_is_fatal() {
    let err = AgentConfig::from_json_str(
        r#"{"apiUrl": "http://backend", "apiKey": "rdr_YOUR_API_KEY_HERE"}"#,
    )
    .expect_err("placeholder");
    assert!(matches!(err, ConfigError::Placeholder(_)));
}

#[test]
fn missing_key_is_fatal() {
    let err = AgentConfig::from_json_str(r#"{"apiUrl": "http://backend"}"#).expect_err("missing");
    assert!(matches!(err, ConfigError::Missing(key) if key == "apiKey"));
}

#[test]
fn zero_queue_capacity_is_invalid() {
    let err = AgentConfig::from_json_str(
        r#"{"apiUrl": "http://b", "apiKey": "k", "offlineQueueMax": 0}"#,
    )
    .expect_err("invalid");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "offlineQueueMax"));
}

#[test]
fn aids_are_normalized_and_validated() {
    let config = AgentConfig::from_json_str(
        r#"{"apiUrl": "http://b", "apiKey": "k", "aidList": ["d2 76 00 00 85 01 01", "a0000000031010"]}"#,
    )
    .expect("config");
    assert_eq!(config.aid_list, vec!["D2760000850101", "A0000000031010"]);

    let err = AgentConfig::from_json_str(r#"{"apiUrl": "http://b", "apiKey": "k", "aidList": ["XYZ"]}"#)
        .expect_err("invalid aid");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "aidList"));
}

#[test]
fn env_overrides_win_over_file() {
    let config = AgentConfig::from_json_with_overrides(MINIMAL, |key| match key {
        "FM_AGENT_WS_PORT" => Some("9100".to_string()),
        "FM_AGENT_BUZZER_ENABLED" => Some("false".to_string()),
        "FM_AGENT_AID_LIST" => Some("F0434C41535330,D2760000850101".to_string()),
        _ => None,
    })
    .expect("config");
    assert_eq!(config.ws_port, 9100);
    assert!(!config.buzzer_enabled);
    assert_eq!(config.aid_list.len(), 2);
}

#[test]
fn invalid_override_is_reported() {
    let err = AgentConfig::from_json_with_overrides(MINIMAL, |key| {
        (key == "FM_AGENT_WS_PORT").then(|| "ninety".to_string())
    })
    .expect_err("invalid");
    assert!(matches!(err, ConfigError::Invalid(key, _) if key == "FM_AGENT_WS_PORT"));
}

#[test]
fn file_loading_reads_json() {
    let mut file = tempfile::NamedTempFile::new().expect("temp");
    file.write_all(br#"{"apiUrl": "http://b", "apiKey": "k", "retryInterval": 250}"#)
        .expect("write");
    let config = AgentConfig::from_file(file.path()).expect("config");
    assert_eq!(config.retry_interval_ms, 250);

    let err = AgentConfig::from_file("/nonexistent/config.json").expect_err("read");
    assert!(matches!(err, ConfigError::Read(_, _)));
}

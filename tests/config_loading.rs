//! Integration test: Configuration loading
//!
//! Tests config path resolution and loading `RelayConfig` from disk.

use danmaku_relay::bin_common::cli::resolve_config_path;
use danmaku_relay::bin_common::ConfigType;
use danmaku_relay::config::{ConfigError, ReconnectConfig, RelayConfig};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_yaml(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_relay_config_default_path() {
    let path = resolve_config_path(ConfigType::Relay, |_| None);
    assert_eq!(path.to_str().unwrap(), "config/relay.yaml");
}

#[test]
fn test_custom_config_path() {
    let custom = ConfigType::Custom("custom/path.yaml".to_string());
    let path = resolve_config_path(custom, |_| None);
    assert_eq!(path.to_str().unwrap(), "custom/path.yaml");
}

#[test]
fn test_config_type_env_var_names() {
    assert_eq!(ConfigType::Relay.env_var_name(), "RELAY_CONFIG_PATH");
}

#[test]
fn test_load_full_file() {
    let file = write_yaml(
        r#"
connection:
  ws_url: ws://127.0.0.1:7000/sub
  heartbeat_interval_secs: 15
  reconnect:
    strategy: fixed
    delay_ms: 250
    max_attempts: 3
token_api:
  url: http://127.0.0.1:7001/token
session:
  uid: 99
log_level: debug
"#,
    );

    let config = RelayConfig::load(file.path()).unwrap();

    assert_eq!(config.connection.ws_url, "ws://127.0.0.1:7000/sub");
    assert_eq!(config.heartbeat_interval(), Duration::from_secs(15));
    assert_eq!(
        config.connection.reconnect,
        ReconnectConfig::Fixed {
            delay_ms: 250,
            max_attempts: Some(3)
        }
    );
    assert_eq!(config.token_api.url, "http://127.0.0.1:7001/token");
    assert_eq!(config.session.uid, Some(99));
    assert_eq!(config.log_level, "debug");

    let strategy = config.reconnect_strategy();
    assert_eq!(strategy.next_delay(2), Some(Duration::from_millis(250)));
    assert_eq!(strategy.next_delay(3), None);
}

#[test]
fn test_shipped_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/relay.yaml");
    let yaml = std::fs::read_to_string(path).unwrap();
    let config = RelayConfig::from_yaml_str(&yaml).unwrap();

    assert_eq!(config.connection.ws_url, "wss://broadcastlv.chat.bilibili.com/sub");
    assert_eq!(config.connection.reconnect, ReconnectConfig::Immediate);
    assert_eq!(config.session.uid, None);
}

#[test]
fn test_invalid_values_rejected() {
    let result = RelayConfig::from_yaml_str("connection:\n  ws_url: https://example.com\n");
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));

    let result = RelayConfig::from_yaml_str("log_level: loud\n");
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_missing_file() {
    let result = RelayConfig::load("/nonexistent/relay.yaml");
    assert!(matches!(result, Err(ConfigError::FileError(_))));
}

#[test]
fn test_malformed_yaml() {
    let result = RelayConfig::from_yaml_str("connection: [unclosed");
    assert!(matches!(result, Err(ConfigError::YamlError(_))));
}

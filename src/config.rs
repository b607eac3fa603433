//! Relay configuration
//!
//! Loaded from YAML, then overridden from the environment (`.env` included).

use livesocket::{
    ExponentialBackoff, FixedDelay, Immediate, NeverReconnect, ProtocolConstants,
    ReconnectionStrategy,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Environment variable overriding `connection.ws_url`
pub const ENV_WS_URL: &str = "DANMAKU_WS_URL";
/// Environment variable overriding `token_api.url`
pub const ENV_TOKEN_URL: &str = "DANMAKU_TOKEN_URL";
/// Environment variable overriding `session.uid`
pub const ENV_UID: &str = "DANMAKU_UID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub token_api: TokenApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            token_api: TokenApiConfig::default(),
            session: SessionConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Streaming endpoint and protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_protover")]
    pub protover: u8,
    #[serde(default = "default_connection_type")]
    pub connection_type: u8,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            heartbeat_interval_secs: default_heartbeat_secs(),
            protover: default_protover(),
            connection_type: default_connection_type(),
            platform: default_platform(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// How to react to a transport error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReconnectConfig {
    /// Reopen the same room straight away, forever
    #[default]
    Immediate,
    Exponential {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        #[serde(default)]
        max_attempts: Option<usize>,
    },
    Fixed {
        delay_ms: u64,
        #[serde(default)]
        max_attempts: Option<usize>,
    },
    Never,
}

/// Token (auth key) endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenApiConfig {
    #[serde(default = "default_token_url")]
    pub url: String,
    #[serde(default = "default_token_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TokenApiConfig {
    fn default() -> Self {
        Self {
            url: default_token_url(),
            timeout_secs: default_token_timeout_secs(),
        }
    }
}

/// Signed-in user, if any
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub uid: Option<u64>,
}

fn default_ws_url() -> String {
    livesocket::config::DEFAULT_URL.to_string()
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_protover() -> u8 {
    2
}

fn default_connection_type() -> u8 {
    2
}

fn default_platform() -> String {
    "web".to_string()
}

fn default_token_url() -> String {
    "https://api.live.bilibili.com/xlive/web-room/v1/index/getDanmuInfo".to_string()
}

fn default_token_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RelayConfig {
    /// Load configuration from a YAML file, then apply environment overrides
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        dotenv::dotenv().ok(); // Don't fail if .env doesn't exist

        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: RelayConfig = serde_yaml::from_str(&yaml_content)?;

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse YAML without touching the environment
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: RelayConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_WS_URL) {
            info!("Overriding websocket URL from environment variable");
            self.connection.ws_url = url;
        }

        if let Some(url) = lookup(ENV_TOKEN_URL) {
            info!("Overriding token API URL from environment variable");
            self.token_api.url = url;
        }

        if let Some(raw) = lookup(ENV_UID) {
            let raw = raw.trim();
            self.session.uid = if raw.is_empty() {
                None
            } else {
                Some(raw.parse().map_err(|_| {
                    ConfigError::ValidationError(format!("{} must be an unsigned integer", ENV_UID))
                })?)
            };
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let ws_url = &self.connection.ws_url;
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(
                "connection.ws_url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.connection.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "connection.heartbeat_interval_secs must be greater than 0".to_string(),
            ));
        }

        let token_url = &self.token_api.url;
        if !(token_url.starts_with("http://") || token_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(
                "token_api.url must start with http:// or https://".to_string(),
            ));
        }

        match &self.connection.reconnect {
            ReconnectConfig::Exponential {
                initial_delay_ms,
                max_delay_ms,
                ..
            } if initial_delay_ms > max_delay_ms => {
                return Err(ConfigError::ValidationError(
                    "reconnect.initial_delay_ms must not exceed max_delay_ms".to_string(),
                ));
            }
            _ => {}
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.connection.heartbeat_interval_secs)
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_api.timeout_secs)
    }

    pub fn protocol_constants(&self) -> ProtocolConstants {
        ProtocolConstants {
            protover: self.connection.protover,
            connection_type: self.connection.connection_type,
            platform: self.connection.platform.clone(),
        }
    }

    /// Build the configured reconnection strategy
    pub fn reconnect_strategy(&self) -> Box<dyn ReconnectionStrategy> {
        match &self.connection.reconnect {
            ReconnectConfig::Immediate => Box::new(Immediate),
            ReconnectConfig::Exponential {
                initial_delay_ms,
                max_delay_ms,
                max_attempts,
            } => Box::new(ExponentialBackoff::new(
                Duration::from_millis(*initial_delay_ms),
                Duration::from_millis(*max_delay_ms),
                *max_attempts,
            )),
            ReconnectConfig::Fixed {
                delay_ms,
                max_attempts,
            } => Box::new(FixedDelay::new(Duration::from_millis(*delay_ms), *max_attempts)),
            ReconnectConfig::Never => Box::new(NeverReconnect),
        }
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Websocket URL: {}", self.connection.ws_url);
        info!("  Heartbeat interval: {} seconds", self.connection.heartbeat_interval_secs);
        info!("  Reconnect: {:?}", self.connection.reconnect);
        info!("  Token API: {}", self.token_api.url);
        info!(
            "  Session: {}",
            self.session
                .uid
                .map(|uid| uid.to_string())
                .unwrap_or_else(|| "anonymous".to_string())
        );
        info!("  Log level: {}", self.log_level);
    }
}

//! CLI utilities for binaries
//!
//! Resolves where the relay configuration lives.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Relay configuration (config/relay.yaml)
    Relay,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Relay => "config/relay.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Relay => "RELAY_CONFIG_PATH",
            ConfigType::Custom(_) => "RELAY_CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    resolve_config_path(config_type, |key| std::env::var(key).ok())
}

/// Same as [`load_config_from_env`] with an explicit variable lookup
pub fn resolve_config_path<F>(config_type: ConfigType, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(config_type.env_var_name())
        .unwrap_or_else(|| config_type.default_path().to_string())
        .into()
}

//! Danmaku Relay - Main Library
//!
//! Application layer on top of the `livesocket` engine: configuration,
//! logging, token API access and process lifecycle.
//!
//! ## Architecture
//!
//! - **bin_common**: Config path resolution for host binaries
//! - **config**: YAML configuration with environment overrides
//! - **token**: HTTP token provider
//! - **app**: `RelayApp`, which wires bus, client and command bridge
//! - **livesocket**: Connection engine (re-exported from workspace)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use danmaku_relay::bin_common::{load_config_from_env, ConfigType};
//! use danmaku_relay::{app::RelayApp, config::RelayConfig, logging};
//!
//! let config = RelayConfig::load(load_config_from_env(ConfigType::Relay))?;
//! logging::init_tracing(&config.log_level);
//! RelayApp::new(&config, codec, classifier)?.run().await?;
//! ```

// Re-export workspace library for convenience
pub use livesocket;

pub mod app;
pub mod config;
pub mod logging;
pub mod shutdown;
pub mod token;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for host binaries

    pub mod cli;

    pub use cli::{load_config_from_env, ConfigType};
}

//! # LiveSocket
//!
//! A persistent client for a live-broadcast messaging service: one streaming
//! connection per process, authenticated with a short-lived key, kept alive
//! with heartbeats, with inbound frames decoded and republished by category.
//!
//! ## Features
//!
//! - **Single-owner lifecycle**: one actor task owns the socket and the timer
//! - **Generation guards**: work from a replaced connection never publishes
//! - **Type-state builder**: codec, auth and publisher must be supplied
//! - **Pluggable seams**: transport, codec, classifier, token API, bus
//! - **Command bridge**: open-room / close-room from the host bus

pub mod traits;
pub mod core;
pub mod bus;
pub mod bridge;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state, dispatcher, handshake, heartbeat, transport,
    builder::{states, LiveClientBuilder},
    client::{ClientHandle, LiveClient, Metrics},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, GenerationGuard},
    dispatcher::{DispatchOutcome, FrameDispatcher},
    transport::TungsteniteConnector,
};

pub use bridge::{parse_room_id, CommandBridge};
pub use bus::ChannelBus;

/// Type alias for Result with LiveSocketError
pub type Result<T> = std::result::Result<T, traits::LiveSocketError>;

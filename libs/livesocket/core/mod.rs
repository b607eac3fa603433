//! # LiveSocket core
//!
//! The connection engine: one lifecycle actor owning at most one socket and
//! one heartbeat timer, an auth handshake per transport-open, and a frame
//! dispatcher that fans decoded frames out to the event bus.
//!
//! ## Example
//!
//! ```rust,ignore
//! use livesocket::*;
//!
//! #[tokio::main]
//! async fn main() -> livesocket::Result<()> {
//!     let bus = Arc::new(ChannelBus::new());
//!
//!     let client = livesocket::builder()
//!         .protocol(Arc::new(MyCodec), Arc::new(MyClassifier))
//!         .auth(Arc::new(MyTokenApi), Arc::new(AnonymousSession))
//!         .publisher(bus.clone())
//!         .build()?;
//!
//!     let (_sub, events) = bus.subscribe_events();
//!     client.open(21452505)?;
//!
//!     while let Ok(event) = events.recv() {
//!         println!("{}: {:?}", event.channel(), event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod dispatcher;
pub mod handshake;
pub mod heartbeat;
pub mod transport;

// Re-export main types
pub use builder::{states, LiveClientBuilder};
pub use client::{ClientHandle, LiveClient, Metrics};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, GenerationGuard};
pub use dispatcher::{DispatchOutcome, FrameDispatcher};
pub use handshake::{AuthHandshake, HandshakeOutcome};
pub use transport::TungsteniteConnector;

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new client builder
pub fn builder() -> LiveClientBuilder<states::NoProtocol, states::NoAuth, states::NoPublisher> {
    LiveClientBuilder::new()
}

//! # LiveSocket Traits
//!
//! Seams between the connection engine and everything it treats as external:
//!
//! - **Connector / TransportSink / TransportStream**: the socket
//! - **FrameCodec**: wire bytes <-> (opcode, body)
//! - **MessageClassifier**: batch -> categories
//! - **TokenProvider / SessionStore**: what goes into the auth frame
//! - **EventPublisher / CommandSource**: the host's event bus
//! - **ReconnectionStrategy**: what happens after a transport error

pub mod auth;
pub mod bus;
pub mod classifier;
pub mod codec;
pub mod error;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use auth::{AnonymousSession, AuthRequest, ProtocolConstants, SessionStore, StaticSession, TokenProvider};
pub use bus::{CommandKind, CommandSource, EventPublisher, LiveEvent, RoomCommand, Subscription};
pub use classifier::{CategorizedBatch, MessageClassifier};
pub use codec::{opcode, FrameCodec, InboundFrame, Operation};
pub use error::{LiveSocketError, Result};
pub use reconnect::{ExponentialBackoff, FixedDelay, Immediate, NeverReconnect, ReconnectionStrategy};
pub use transport::{Connector, TransportEvent, TransportSink, TransportStream, WsMessage};

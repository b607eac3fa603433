//! Transport seam
//!
//! The lifecycle manager never touches a socket library directly. It asks a
//! [`Connector`] for a split pair of halves and drives them:
//!
//! ```text
//! Connector::connect(url)
//!        │
//!        ├─> TransportSink   (writer task owns it, fed by the outbound queue)
//!        └─> TransportStream (reader task owns it, yields TransportEvent)
//! ```
//!
//! The default connector lives in `core::transport` and is backed by
//! tokio-tungstenite. Tests plug in an in-memory connector.

use crate::error::Result;
use async_trait::async_trait;

/// A single transport message
/// Can be Text or Binary data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Raw payload bytes regardless of message kind
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WsMessage::Text(s) => s.as_bytes(),
            WsMessage::Binary(b) => b,
        }
    }

    /// Check if message is binary
    pub fn is_binary(&self) -> bool {
        matches!(self, WsMessage::Binary(_))
    }
}

/// What the read half of a transport observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A data message arrived
    Message(WsMessage),
    /// The peer closed the connection cleanly
    Closed,
    /// The transport failed; the string is a human-readable reason
    Error(String),
}

/// Write half of an open transport
#[async_trait]
pub trait TransportSink: Send {
    /// Send one message to the server
    async fn send(&mut self, message: WsMessage) -> Result<()>;

    /// Close the transport. Must tolerate being called on an already closed sink.
    async fn close(&mut self) -> Result<()>;
}

/// Read half of an open transport
#[async_trait]
pub trait TransportStream: Send {
    /// Wait for the next event.
    ///
    /// After `Closed` or `Error` has been returned the stream is finished and
    /// will not be polled again.
    async fn next_event(&mut self) -> TransportEvent;
}

/// Factory for transports
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a transport to `url`.
    ///
    /// Returning `Ok` means the transport reached the open readiness state.
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>)>;
}

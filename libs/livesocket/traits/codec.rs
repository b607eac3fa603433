use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Opcode values used by the live-broadcast protocol
pub mod opcode {
    /// Client keep-alive; also asks the server for a popularity report
    pub const HEARTBEAT: u32 = 2;
    /// Server popularity report (reply to a heartbeat)
    pub const POPULARITY: u32 = 3;
    /// Server batch of application messages
    pub const BATCH: u32 = 5;
    /// Client authentication request
    pub const AUTHENTICATE: u32 = 7;
    /// Server acknowledgement of authentication
    pub const CONNECTED: u32 = 8;
}

/// Inbound operation, classified by opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Popularity,
    Batch,
    Connected,
    Unknown(u32),
}

impl From<u32> for Operation {
    fn from(op: u32) -> Self {
        match op {
            opcode::POPULARITY => Operation::Popularity,
            opcode::BATCH => Operation::Batch,
            opcode::CONNECTED => Operation::Connected,
            other => Operation::Unknown(other),
        }
    }
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub opcode: u32,
    /// Shape depends on the opcode: an object with `count` for popularity,
    /// an array of raw messages for a batch, anything for the rest.
    pub body: Value,
}

impl InboundFrame {
    pub fn new(opcode: u32, body: Value) -> Self {
        Self { opcode, body }
    }

    #[inline]
    pub fn operation(&self) -> Operation {
        Operation::from(self.opcode)
    }
}

/// Converts between transport bytes and logical frames.
///
/// The envelope layout and compression are entirely the codec's business.
#[async_trait]
pub trait FrameCodec: Send + Sync + 'static {
    /// Wrap `payload` in a frame tagged with `opcode`
    fn encode(&self, payload: &str, opcode: u32) -> Result<Vec<u8>>;

    /// Unwrap one transport message.
    ///
    /// Async because decompression may be offloaded.
    async fn decode(&self, data: &[u8]) -> Result<InboundFrame>;
}

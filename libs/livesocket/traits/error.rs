use thiserror::Error;

/// Main error type for livesocket
#[derive(Error, Debug)]
pub enum LiveSocketError {
    /// Transport-level failure (connect refused, dropped socket, protocol error)
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed by the server
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// The token API call failed or returned no usable key
    #[error("Token fetch failed: {0}")]
    TokenFetch(String),

    /// Frame could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Decoded frame body did not have the shape its opcode requires
    #[error("Malformed frame body for opcode {opcode}: {reason}")]
    MalformedBody { opcode: u32, reason: String },

    /// Classifier rejected a batch
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Room identifier from an open command was not a valid integer
    #[error("Invalid room id: {0:?}")]
    InvalidRoomId(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for livesocket operations
pub type Result<T> = std::result::Result<T, LiveSocketError>;

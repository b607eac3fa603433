use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Trait for fetching the short-lived key sent in the auth frame
///
/// Called once per transport-open, so implementations should not cache
/// across connections unless the server tolerates key reuse.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a fresh key
    ///
    /// # Returns
    /// * `Ok(token)` - Key to embed in the auth frame
    /// * `Err(LiveSocketError::TokenFetch)` - The handshake for this attempt is abandoned
    async fn fetch_token(&self) -> Result<String>;
}

/// Read-only view of the host's current user
pub trait SessionStore: Send + Sync {
    /// Identifier of the logged-in user, `None` for anonymous viewing
    fn current_user_id(&self) -> Option<u64>;
}

/// Session store for anonymous viewing
pub struct AnonymousSession;

impl SessionStore for AnonymousSession {
    fn current_user_id(&self) -> Option<u64> {
        None
    }
}

/// Session store with a fixed user
pub struct StaticSession {
    user_id: Option<u64>,
}

impl StaticSession {
    pub fn new(user_id: Option<u64>) -> Self {
        Self { user_id }
    }
}

impl SessionStore for StaticSession {
    fn current_user_id(&self) -> Option<u64> {
        self.user_id
    }
}

/// Protocol constants carried in every auth frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConstants {
    pub protover: u8,
    pub connection_type: u8,
    pub platform: String,
}

impl Default for ProtocolConstants {
    fn default() -> Self {
        Self {
            protover: 2,
            connection_type: 2,
            platform: "web".to_string(),
        }
    }
}

/// Body of the authenticate frame
///
/// `uid` is left out of the JSON entirely when the viewer is anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u64>,
    pub roomid: u64,
    pub protover: u8,
    #[serde(rename = "type")]
    pub connection_type: u8,
    pub platform: String,
    pub key: String,
}

impl AuthRequest {
    pub fn new(
        uid: Option<u64>,
        room_id: u64,
        key: impl Into<String>,
        protocol: &ProtocolConstants,
    ) -> Self {
        Self {
            uid,
            roomid: room_id,
            protover: protocol.protover,
            connection_type: protocol.connection_type,
            platform: protocol.platform.clone(),
            key: key.into(),
        }
    }

    /// Serialize to the JSON text handed to the codec
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::LiveSocketError::Codec(e.to_string()))
    }
}

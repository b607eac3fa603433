//! Authentication handshake, run once per transport-open

use crate::connection_state::GenerationGuard;
use crate::traits::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Result of a handshake attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Auth frame and initial heartbeat queued; the heartbeat timer may start
    Completed,
    /// The connection was replaced or closed while the token was in flight
    Superseded,
}

/// Builds and sends the authenticate frame
pub struct AuthHandshake {
    tokens: Arc<dyn TokenProvider>,
    session: Arc<dyn SessionStore>,
    codec: Arc<dyn FrameCodec>,
    protocol: ProtocolConstants,
}

impl AuthHandshake {
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        session: Arc<dyn SessionStore>,
        codec: Arc<dyn FrameCodec>,
        protocol: ProtocolConstants,
    ) -> Self {
        Self {
            tokens,
            session,
            codec,
            protocol,
        }
    }

    /// Encoded empty heartbeat frame
    pub fn heartbeat_frame(&self) -> Result<WsMessage> {
        Ok(WsMessage::Binary(self.codec.encode("", opcode::HEARTBEAT)?))
    }

    /// Fetch a key, queue the auth frame, then queue one heartbeat.
    ///
    /// Token failure is returned as an error and nothing is queued.
    pub async fn run(
        &self,
        room_id: u64,
        outbound: &mpsc::UnboundedSender<WsMessage>,
        guard: &GenerationGuard,
    ) -> Result<HandshakeOutcome> {
        let key = self.tokens.fetch_token().await?;

        if !guard.is_current() {
            debug!(
                generation = guard.generation(),
                "Token arrived for a superseded connection, dropping it"
            );
            return Ok(HandshakeOutcome::Superseded);
        }

        let request = AuthRequest::new(self.session.current_user_id(), room_id, key, &self.protocol);
        let auth_frame = WsMessage::Binary(self.codec.encode(&request.to_json()?, opcode::AUTHENTICATE)?);
        let heartbeat = self.heartbeat_frame()?;

        outbound
            .send(auth_frame)
            .map_err(|e| LiveSocketError::ChannelSend(format!("auth frame: {}", e)))?;
        outbound
            .send(heartbeat)
            .map_err(|e| LiveSocketError::ChannelSend(format!("initial heartbeat: {}", e)))?;

        info!(room_id, uid = ?request.uid, "Sent authentication frame");
        Ok(HandshakeOutcome::Completed)
    }
}

use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Default service endpoint
pub const DEFAULT_URL: &str = "wss://broadcastlv.chat.bilibili.com/sub";

/// Default heartbeat period
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for [`crate::client::LiveClient`]
///
/// Built with the type-state [`crate::builder::LiveClientBuilder`], which
/// refuses to compile until codec, auth and publisher are set.
pub struct ClientConfig {
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Period of the keep-alive timer
    pub(crate) heartbeat_interval: Duration,

    /// Constants embedded in the auth frame
    pub(crate) protocol: ProtocolConstants,

    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) codec: Arc<dyn FrameCodec>,
    pub(crate) classifier: Arc<dyn MessageClassifier>,
    pub(crate) tokens: Arc<dyn TokenProvider>,
    pub(crate) session: Arc<dyn SessionStore>,
    pub(crate) publisher: Arc<dyn EventPublisher>,

    /// What to do after a transport error
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,
}

impl ClientConfig {
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn protocol(&self) -> &ProtocolConstants {
        &self.protocol
    }
}

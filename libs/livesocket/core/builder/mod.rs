pub mod states;

use crate::client::LiveClient;
use crate::config::{ClientConfig, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_URL};
use crate::traits::*;
use crate::transport::TungsteniteConnector;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Collaborators and options collected so far
#[derive(Default)]
struct Parts {
    url: Option<String>,
    heartbeat_interval: Option<Duration>,
    protocol: Option<ProtocolConstants>,
    connector: Option<Arc<dyn Connector>>,
    codec: Option<Arc<dyn FrameCodec>>,
    classifier: Option<Arc<dyn MessageClassifier>>,
    tokens: Option<Arc<dyn TokenProvider>>,
    session: Option<Arc<dyn SessionStore>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
}

/// Type-state builder for [`LiveClient`]
///
/// `build()` is only available once the protocol (codec + classifier), auth
/// (token provider + session) and publisher have been supplied. Everything
/// else has a default:
///
/// - url: [`DEFAULT_URL`]
/// - heartbeat: every 30 s
/// - connector: [`TungsteniteConnector`]
/// - reconnection: [`Immediate`]
pub struct LiveClientBuilder<P, A, E>
where
    P: ProtocolState,
    A: AuthState,
    E: PublisherState,
{
    _state: TypeState<P, A, E>,
    parts: Parts,
}

impl LiveClientBuilder<NoProtocol, NoAuth, NoPublisher> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            parts: Parts::default(),
        }
    }
}

impl Default for LiveClientBuilder<NoProtocol, NoAuth, NoPublisher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, A, E> LiveClientBuilder<P, A, E>
where
    P: ProtocolState,
    A: AuthState,
    E: PublisherState,
{
    fn transition<P2, A2, E2>(self) -> LiveClientBuilder<P2, A2, E2>
    where
        P2: ProtocolState,
        A2: AuthState,
        E2: PublisherState,
    {
        LiveClientBuilder {
            _state: TypeState::new(),
            parts: self.parts,
        }
    }

    /// Override the service endpoint
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.parts.url = Some(url.into());
        self
    }

    /// Override the heartbeat period
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.parts.heartbeat_interval = Some(interval);
        self
    }

    /// Override the constants sent in the auth frame
    pub fn protocol_constants(mut self, protocol: ProtocolConstants) -> Self {
        self.parts.protocol = Some(protocol);
        self
    }

    /// Replace the transport
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.parts.connector = Some(Arc::new(connector));
        self
    }

    /// Replace the reconnection strategy
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.parts.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Same as [`Self::reconnect_strategy`] for an already boxed strategy
    pub fn boxed_reconnect_strategy(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.parts.reconnect_strategy = Some(strategy);
        self
    }
}

// Protocol setting
impl<A, E> LiveClientBuilder<NoProtocol, A, E>
where
    A: AuthState,
    E: PublisherState,
{
    /// Set the frame codec and the batch classifier
    pub fn protocol(
        mut self,
        codec: Arc<dyn FrameCodec>,
        classifier: Arc<dyn MessageClassifier>,
    ) -> LiveClientBuilder<HasProtocol, A, E> {
        self.parts.codec = Some(codec);
        self.parts.classifier = Some(classifier);
        self.transition()
    }
}

// Auth setting
impl<P, E> LiveClientBuilder<P, NoAuth, E>
where
    P: ProtocolState,
    E: PublisherState,
{
    /// Set where the auth key and user id come from
    pub fn auth(
        mut self,
        tokens: Arc<dyn TokenProvider>,
        session: Arc<dyn SessionStore>,
    ) -> LiveClientBuilder<P, HasAuth, E> {
        self.parts.tokens = Some(tokens);
        self.parts.session = Some(session);
        self.transition()
    }
}

// Publisher setting
impl<P, A> LiveClientBuilder<P, A, NoPublisher>
where
    P: ProtocolState,
    A: AuthState,
{
    /// Set where decoded events go
    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> LiveClientBuilder<P, A, HasPublisher> {
        self.parts.publisher = Some(publisher);
        self.transition()
    }
}

impl LiveClientBuilder<HasProtocol, HasAuth, HasPublisher> {
    /// Assemble the configuration without starting anything
    pub fn into_config(self) -> Result<ClientConfig> {
        let parts = self.parts;
        let missing = |what: &str| LiveSocketError::Configuration(format!("{} not set", what));

        let heartbeat_interval = parts.heartbeat_interval.unwrap_or(DEFAULT_HEARTBEAT_INTERVAL);
        if heartbeat_interval.is_zero() {
            return Err(LiveSocketError::Configuration(
                "heartbeat interval must be greater than zero".into(),
            ));
        }

        Ok(ClientConfig {
            url: parts.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            heartbeat_interval,
            protocol: parts.protocol.unwrap_or_default(),
            connector: parts
                .connector
                .unwrap_or_else(|| Arc::new(TungsteniteConnector)),
            codec: parts.codec.ok_or_else(|| missing("codec"))?,
            classifier: parts.classifier.ok_or_else(|| missing("classifier"))?,
            tokens: parts.tokens.ok_or_else(|| missing("token provider"))?,
            session: parts.session.ok_or_else(|| missing("session store"))?,
            publisher: parts.publisher.ok_or_else(|| missing("publisher"))?,
            reconnect_strategy: parts
                .reconnect_strategy
                .unwrap_or_else(|| Box::new(Immediate)),
        })
    }

    /// Build and start the client. Must be called inside a Tokio runtime.
    pub fn build(self) -> Result<LiveClient> {
        Ok(LiveClient::new(self.into_config()?))
    }
}

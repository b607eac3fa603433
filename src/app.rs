//! Relay application
//!
//! Wires the configuration, the in-process bus, the live client and the
//! command bridge together, then runs until Ctrl+C.

use crate::config::RelayConfig;
use crate::shutdown::ShutdownManager;
use crate::token::HttpTokenProvider;
use anyhow::Context;
use livesocket::{
    ChannelBus, CommandBridge, FrameCodec, LiveClient, MessageClassifier, StaticSession,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Long-running relay: host commands in, categorized events out
///
/// The frame codec and the batch classifier belong to the host and are
/// passed in.
pub struct RelayApp {
    bus: ChannelBus,
    client: LiveClient,
    bridge: CommandBridge,
    shutdown: ShutdownManager,
}

impl RelayApp {
    /// Build the relay on a fresh bus. Must be called inside a Tokio runtime.
    pub fn new(
        config: &RelayConfig,
        codec: Arc<dyn FrameCodec>,
        classifier: Arc<dyn MessageClassifier>,
    ) -> anyhow::Result<Self> {
        Self::with_bus(config, codec, classifier, ChannelBus::new())
    }

    /// Build the relay on a bus the host already uses
    pub fn with_bus(
        config: &RelayConfig,
        codec: Arc<dyn FrameCodec>,
        classifier: Arc<dyn MessageClassifier>,
        bus: ChannelBus,
    ) -> anyhow::Result<Self> {
        let tokens = HttpTokenProvider::new(config.token_api.url.clone(), config.token_timeout())
            .context("Failed to create token provider")?;

        let client = livesocket::builder()
            .url(config.connection.ws_url.clone())
            .heartbeat_interval(config.heartbeat_interval())
            .protocol_constants(config.protocol_constants())
            .boxed_reconnect_strategy(config.reconnect_strategy())
            .protocol(codec, classifier)
            .auth(Arc::new(tokens), Arc::new(StaticSession::new(config.session.uid)))
            .publisher(Arc::new(bus.clone()))
            .build()
            .context("Failed to build live client")?;

        let bridge = CommandBridge::start(&bus, client.handle())
            .context("Failed to start command bridge")?;

        Ok(Self {
            bus,
            client,
            bridge,
            shutdown: ShutdownManager::new(),
        })
    }

    pub fn bus(&self) -> &ChannelBus {
        &self.bus
    }

    pub fn client(&self) -> &LiveClient {
        &self.client
    }

    /// Clearing this flag stops [`RelayApp::run`]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.flag()
    }

    /// Run until shutdown, then release the bridge and close the client
    pub async fn run(self) -> anyhow::Result<()> {
        info!("========================================");
        info!("Starting danmaku relay");
        info!("Press Ctrl+C to stop");
        info!("========================================");

        self.shutdown.spawn_signal_handler();
        self.shutdown.wait(SHUTDOWN_POLL).await;

        self.bridge.shutdown();

        let metrics = self.client.metrics();
        self.client
            .shutdown()
            .await
            .context("Failed to shut down live client")?;

        info!("========================================");
        info!("Danmaku relay stopped gracefully");
        info!(
            "Frames sent: {}, received: {}, events published: {}, reconnects: {}",
            metrics.frames_sent,
            metrics.frames_received,
            metrics.events_published,
            metrics.reconnect_count
        );
        info!("========================================");

        Ok(())
    }
}

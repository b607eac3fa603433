use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, GenerationGuard};
use crate::dispatcher::{DispatchOutcome, FrameDispatcher};
use crate::handshake::{AuthHandshake, HandshakeOutcome};
use crate::heartbeat::{spawn_heartbeat, HeartbeatHandle};
use crate::traits::*;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Commands accepted by the lifecycle actor
#[derive(Debug)]
enum ClientCommand {
    /// Tear down any connection, then connect to this room
    Open(u64),
    /// Tear down any connection
    Close,
    /// Tear down and stop the actor
    Shutdown(oneshot::Sender<()>),
}

/// Signals from per-connection tasks back to the actor
///
/// Every signal carries the generation it was produced for; the actor drops
/// signals from generations that are no longer current.
enum ConnectionSignal {
    Opened {
        generation: u64,
        sink: Box<dyn TransportSink>,
        stream: Box<dyn TransportStream>,
    },
    Failed {
        generation: u64,
        reason: String,
    },
    PeerClosed {
        generation: u64,
    },
    Authenticated {
        generation: u64,
    },
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub events_published: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
    pub room_id: Option<u64>,
}

/// Cloneable sender side of a [`LiveClient`]
///
/// Used by the command bridge, which runs on its own thread.
#[derive(Clone)]
pub struct ClientHandle {
    command_tx: mpsc::UnboundedSender<ClientCommand>,
}

impl ClientHandle {
    /// Close any existing connection and open a new one for `room_id`.
    ///
    /// Returns as soon as the command is queued; connecting happens in the
    /// background.
    pub fn open(&self, room_id: u64) -> Result<()> {
        self.command_tx
            .send(ClientCommand::Open(room_id))
            .map_err(|e| LiveSocketError::ChannelSend(e.to_string()))
    }

    /// Close the connection if there is one. Safe to call repeatedly.
    pub fn close(&self) -> Result<()> {
        self.command_tx
            .send(ClientCommand::Close)
            .map_err(|e| LiveSocketError::ChannelSend(e.to_string()))
    }
}

/// Persistent client for one live room at a time
///
/// Owns a single lifecycle actor task. All connection state lives inside
/// that task, so there is never more than one socket or one heartbeat timer.
pub struct LiveClient {
    handle: ClientHandle,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    room_id: Arc<RwLock<Option<u64>>>,
    task_handle: Option<JoinHandle<()>>,
}

impl LiveClient {
    /// Spawn the actor. Must be called inside a Tokio runtime.
    ///
    /// Use `livesocket::builder()` to create a client.
    pub(crate) fn new(config: ClientConfig) -> Self {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Idle));
        let metrics = Arc::new(AtomicMetrics::new());
        let room_id = Arc::new(RwLock::new(None));

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let dispatcher = Arc::new(FrameDispatcher::new(
            Arc::clone(&config.codec),
            Arc::clone(&config.classifier),
            Arc::clone(&config.publisher),
            Arc::clone(&metrics),
        ));
        let handshake = Arc::new(AuthHandshake::new(
            Arc::clone(&config.tokens),
            Arc::clone(&config.session),
            Arc::clone(&config.codec),
            config.protocol.clone(),
        ));

        let actor = Actor {
            config,
            dispatcher,
            handshake,
            state: Arc::clone(&state),
            metrics: Arc::clone(&metrics),
            room_id: Arc::clone(&room_id),
            generation: Arc::new(AtomicU64::new(0)),
            connection: None,
            reconnect_attempt: 0,
            signal_tx,
        };

        let task_handle = tokio::spawn(actor.run(command_rx, signal_rx));

        Self {
            handle: ClientHandle { command_tx },
            state,
            metrics,
            room_id,
            task_handle: Some(task_handle),
        }
    }

    /// See [`ClientHandle::open`]
    pub fn open(&self, room_id: u64) -> Result<()> {
        self.handle.open(room_id)
    }

    /// See [`ClientHandle::close`]
    pub fn close(&self) -> Result<()> {
        self.handle.close()
    }

    /// Cloneable handle for driving the client from elsewhere
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Get current connection state
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Room of the current connection, if any
    pub fn room_id(&self) -> Option<u64> {
        *self.room_id.read()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            frames_sent: self.metrics.frames_sent(),
            frames_received: self.metrics.frames_received(),
            events_published: self.metrics.events_published(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.state.get(),
            room_id: self.room_id(),
        }
    }

    /// Close the connection and stop the actor
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down live client");

        let (done_tx, done_rx) = oneshot::channel();
        if self
            .handle
            .command_tx
            .send(ClientCommand::Shutdown(done_tx))
            .is_ok()
        {
            let _ = done_rx.await;
        }

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }

        Ok(())
    }
}

/// The one live (or pending) connection
struct Connection {
    generation: u64,
    room_id: u64,
    /// Present once the transport is open
    outbound: Option<mpsc::UnboundedSender<WsMessage>>,
    writer: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
    /// Connect, reader and handshake tasks
    tasks: Vec<JoinHandle<()>>,
    heartbeat: Option<HeartbeatHandle>,
}

struct Actor {
    config: ClientConfig,
    dispatcher: Arc<FrameDispatcher>,
    handshake: Arc<AuthHandshake>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    room_id: Arc<RwLock<Option<u64>>>,
    generation: Arc<AtomicU64>,
    connection: Option<Connection>,
    /// Consecutive transport errors since the last successful open
    reconnect_attempt: usize,
    signal_tx: mpsc::UnboundedSender<ConnectionSignal>,
}

impl Actor {
    async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
        mut signal_rx: mpsc::UnboundedReceiver<ConnectionSignal>,
    ) {
        loop {
            tokio::select! {
                cmd = command_rx.recv() => match cmd {
                    Some(ClientCommand::Open(room_id)) => {
                        self.reconnect_attempt = 0;
                        self.open(room_id, Duration::ZERO).await;
                    }
                    Some(ClientCommand::Close) => self.close().await,
                    Some(ClientCommand::Shutdown(done)) => {
                        self.close().await;
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        debug!("All client handles dropped");
                        self.close().await;
                        break;
                    }
                },
                Some(signal) = signal_rx.recv() => self.handle_signal(signal).await,
            }
        }

        info!("Live client task exiting");
    }

    fn is_current(&self, generation: u64) -> bool {
        self.connection
            .as_ref()
            .map_or(false, |c| c.generation == generation)
    }

    fn guard(&self, generation: u64) -> GenerationGuard {
        GenerationGuard::new(Arc::clone(&self.generation), generation)
    }

    /// Close whatever exists, then start connecting to `room_id` after `delay`
    async fn open(&mut self, room_id: u64, delay: Duration) {
        self.close().await;

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.set(ConnectionState::Connecting);
        *self.room_id.write() = Some(room_id);

        let connector = Arc::clone(&self.config.connector);
        let url = self.config.url.clone();
        let signal_tx = self.signal_tx.clone();

        debug!(generation, room_id, ?delay, "Connecting to {}", url);

        let connect = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let signal = match connector.connect(&url).await {
                Ok((sink, stream)) => ConnectionSignal::Opened {
                    generation,
                    sink,
                    stream,
                },
                Err(e) => ConnectionSignal::Failed {
                    generation,
                    reason: e.to_string(),
                },
            };
            let _ = signal_tx.send(signal);
        });

        self.connection = Some(Connection {
            generation,
            room_id,
            outbound: None,
            writer: None,
            tasks: vec![connect],
            heartbeat: None,
        });
    }

    /// Cancel the heartbeat, close the transport, clear the handle.
    ///
    /// No-op without a connection.
    async fn close(&mut self) {
        let Some(mut conn) = self.connection.take() else {
            return;
        };

        self.state.set(ConnectionState::Closing);
        // Anything still in flight for this connection is now stale
        self.generation.fetch_add(1, Ordering::AcqRel);

        if let Some(heartbeat) = conn.heartbeat.take() {
            heartbeat.cancel();
        }
        for task in conn.tasks.drain(..) {
            task.abort();
        }
        conn.outbound = None;
        if let Some((close_tx, writer)) = conn.writer.take() {
            let _ = close_tx.send(());
            let _ = writer.await;
        }

        *self.room_id.write() = None;
        self.state.set(ConnectionState::Idle);
        info!(generation = conn.generation, room_id = conn.room_id, "Connection closed");
    }

    async fn handle_signal(&mut self, signal: ConnectionSignal) {
        match signal {
            ConnectionSignal::Opened {
                generation,
                sink,
                stream,
            } => {
                if !self.is_current(generation) {
                    debug!(generation, "Transport opened for a superseded connection, closing it");
                    tokio::spawn(async move {
                        let mut sink = sink;
                        let _ = sink.close().await;
                    });
                    return;
                }
                self.on_open(generation, sink, stream);
            }
            ConnectionSignal::Failed { generation, reason } => {
                if !self.is_current(generation) {
                    debug!(generation, %reason, "Ignoring error from superseded connection");
                    return;
                }
                self.on_error(reason).await;
            }
            ConnectionSignal::PeerClosed { generation } => {
                if self.is_current(generation) {
                    info!(generation, "Server closed the connection");
                    self.close().await;
                }
            }
            ConnectionSignal::Authenticated { generation } => {
                if self.is_current(generation) {
                    self.start_heartbeat(generation);
                }
            }
        }
    }

    /// Transport is open: start writer and reader, run the handshake once
    fn on_open(
        &mut self,
        generation: u64,
        sink: Box<dyn TransportSink>,
        stream: Box<dyn TransportStream>,
    ) {
        let Some(room_id) = self.connection.as_ref().map(|c| c.room_id) else {
            return;
        };

        info!(generation, room_id, "Connected to {}", self.config.url);
        self.state.set(ConnectionState::Open);
        self.reconnect_attempt = 0;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();

        let writer = tokio::spawn(writer_task(
            generation,
            sink,
            outbound_rx,
            close_rx,
            self.signal_tx.clone(),
            Arc::clone(&self.metrics),
        ));
        let reader = tokio::spawn(reader_task(
            stream,
            self.guard(generation),
            Arc::clone(&self.dispatcher),
            self.signal_tx.clone(),
            Arc::clone(&self.metrics),
        ));

        self.state.set(ConnectionState::Authenticating);
        let handshake = {
            let handshake = Arc::clone(&self.handshake);
            let outbound = outbound_tx.clone();
            let guard = self.guard(generation);
            let signal_tx = self.signal_tx.clone();
            tokio::spawn(async move {
                match handshake.run(room_id, &outbound, &guard).await {
                    Ok(HandshakeOutcome::Completed) => {
                        let _ = signal_tx.send(ConnectionSignal::Authenticated { generation });
                    }
                    Ok(HandshakeOutcome::Superseded) => {}
                    Err(e) => {
                        error!(generation, room_id, "Handshake aborted: {}", e);
                    }
                }
            })
        };

        if let Some(conn) = self.connection.as_mut() {
            conn.outbound = Some(outbound_tx);
            conn.writer = Some((close_tx, writer));
            conn.tasks.push(reader);
            conn.tasks.push(handshake);
        }
    }

    fn start_heartbeat(&mut self, generation: u64) {
        let payload = match self.handshake.heartbeat_frame() {
            Ok(payload) => payload,
            Err(e) => {
                error!(generation, "Cannot encode heartbeat frame: {}", e);
                return;
            }
        };
        let interval = self.config.heartbeat_interval;

        let Some(conn) = self.connection.as_mut() else {
            return;
        };
        let Some(outbound) = conn.outbound.clone() else {
            return;
        };

        if let Some(previous) = conn.heartbeat.take() {
            warn!(generation, "Replacing an already running heartbeat");
            previous.cancel();
        }
        conn.heartbeat = Some(spawn_heartbeat(generation, interval, payload, outbound));
        self.state.set(ConnectionState::Streaming);
    }

    /// Transport error on the current connection: reopen per strategy
    async fn on_error(&mut self, reason: String) {
        let Some(room_id) = self.connection.as_ref().map(|c| c.room_id) else {
            return;
        };

        let attempt = self.reconnect_attempt;
        match self.config.reconnect_strategy.next_delay(attempt) {
            Some(delay) => {
                warn!(
                    room_id,
                    attempt = attempt + 1,
                    "Transport error ({}), reconnecting in {:?}",
                    reason,
                    delay
                );
                self.reconnect_attempt += 1;
                self.metrics.increment_reconnects();
                self.open(room_id, delay).await;
            }
            None => {
                warn!(room_id, "Transport error ({}), reconnection strategy exhausted", reason);
                self.close().await;
            }
        }
    }
}

/// Owns the write half: drains the outbound queue until told to close
async fn writer_task(
    generation: u64,
    mut sink: Box<dyn TransportSink>,
    mut outbound_rx: mpsc::UnboundedReceiver<WsMessage>,
    mut close_rx: oneshot::Receiver<()>,
    signal_tx: mpsc::UnboundedSender<ConnectionSignal>,
    metrics: Arc<AtomicMetrics>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut close_rx => break,
            msg = outbound_rx.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        error!(generation, "Send failed: {}", e);
                        let _ = signal_tx.send(ConnectionSignal::Failed {
                            generation,
                            reason: e.to_string(),
                        });
                        return;
                    }
                    metrics.increment_sent();
                }
                None => break,
            },
        }
    }

    if let Err(e) = sink.close().await {
        debug!(generation, "Error while closing transport: {}", e);
    }
}

/// Owns the read half: one dispatch task per inbound message
async fn reader_task(
    mut stream: Box<dyn TransportStream>,
    guard: GenerationGuard,
    dispatcher: Arc<FrameDispatcher>,
    signal_tx: mpsc::UnboundedSender<ConnectionSignal>,
    metrics: Arc<AtomicMetrics>,
) {
    let generation = guard.generation();

    loop {
        match stream.next_event().await {
            TransportEvent::Message(message) => {
                metrics.increment_received();

                let dispatcher = Arc::clone(&dispatcher);
                let guard = guard.clone();
                tokio::spawn(async move {
                    match dispatcher.dispatch(message, &guard).await {
                        Ok(DispatchOutcome::Stale) => {
                            debug!(generation, "Discarded message from superseded connection");
                        }
                        Ok(_) => {}
                        Err(e) => error!(generation, "Dispatch error: {}", e),
                    }
                });
            }
            TransportEvent::Closed => {
                let _ = signal_tx.send(ConnectionSignal::PeerClosed { generation });
                return;
            }
            TransportEvent::Error(reason) => {
                error!(generation, "WebSocket error: {}", reason);
                let _ = signal_tx.send(ConnectionSignal::Failed { generation, reason });
                return;
            }
        }
    }
}

//! Common test utilities for LiveSocket integration tests
//!
//! In-memory transport, a JSON frame codec, a `cmd`-based classifier and a
//! few token providers, plus a real WebSocket server for loopback tests.

#![allow(dead_code)]

use async_trait::async_trait;
use livesocket::*;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify, Semaphore};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

pub const TEST_URL: &str = "ws://mock.invalid/sub";
pub const TEST_KEY: &str = "test-key";

// ============================================================================
// Codec and classifier
// ============================================================================

/// Frames are `{"op": <opcode>, "body": <payload>}` as UTF-8 JSON.
///
/// Outbound payloads are strings (the auth JSON, or "" for heartbeats);
/// inbound bodies are arbitrary JSON.
pub struct JsonCodec;

#[async_trait]
impl FrameCodec for JsonCodec {
    fn encode(&self, payload: &str, opcode: u32) -> Result<Vec<u8>> {
        Ok(json!({ "op": opcode, "body": payload }).to_string().into_bytes())
    }

    async fn decode(&self, data: &[u8]) -> Result<InboundFrame> {
        let value: Value =
            serde_json::from_slice(data).map_err(|e| LiveSocketError::Codec(e.to_string()))?;
        let op = value
            .get("op")
            .and_then(Value::as_u64)
            .ok_or_else(|| LiveSocketError::Codec("missing op".into()))?;
        Ok(InboundFrame::new(op as u32, value.get("body").cloned().unwrap_or(Value::Null)))
    }
}

/// Inbound frame as the server would send it
pub fn server_frame(op: u32, body: Value) -> WsMessage {
    WsMessage::Binary(json!({ "op": op, "body": body }).to_string().into_bytes())
}

/// Opcode and payload of a frame the client sent
pub fn decode_sent(message: &WsMessage) -> (u32, String) {
    let value: Value = serde_json::from_slice(message.as_bytes()).unwrap();
    let op = value["op"].as_u64().unwrap() as u32;
    let body = value["body"].as_str().unwrap().to_string();
    (op, body)
}

/// Opcodes of every frame the client sent
pub fn sent_opcodes(messages: &[WsMessage]) -> Vec<u32> {
    messages.iter().map(|m| decode_sent(m).0).collect()
}

/// Parsed auth body of a sent authenticate frame
pub fn auth_body(message: &WsMessage) -> Value {
    let (op, body) = decode_sent(message);
    assert_eq!(op, opcode::AUTHENTICATE);
    serde_json::from_str(&body).unwrap()
}

/// Sorts batch entries by their `cmd` field
pub struct CmdClassifier;

#[async_trait]
impl MessageClassifier for CmdClassifier {
    async fn classify(&self, messages: Vec<Value>) -> Result<CategorizedBatch> {
        let mut batch = CategorizedBatch::default();
        for message in messages {
            match message.get("cmd").and_then(Value::as_str) {
                Some("RANK") => batch.ranking.push(message),
                Some("DANMU") => batch.chat.push(message),
                Some("GIFT") => batch.gifts.push(message),
                Some("WELCOME") => batch.welcomes.push(message),
                Some("SUPER_CHAT") => batch.super_chats.push(message),
                _ => {}
            }
        }
        Ok(batch)
    }
}

// ============================================================================
// Token providers
// ============================================================================

pub struct StaticToken(pub &'static str);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn fetch_token(&self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

pub struct FailingToken;

#[async_trait]
impl TokenProvider for FailingToken {
    async fn fetch_token(&self) -> Result<String> {
        Err(LiveSocketError::TokenFetch("token API unavailable".into()))
    }
}

/// Blocks every fetch until [`GatedToken::release`] is called
#[derive(Clone)]
pub struct GatedToken {
    gate: Arc<Semaphore>,
}

impl GatedToken {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl TokenProvider for GatedToken {
    async fn fetch_token(&self) -> Result<String> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| LiveSocketError::TokenFetch(e.to_string()))?;
        permit.forget();
        Ok(TEST_KEY.to_string())
    }
}

// ============================================================================
// In-memory transport
// ============================================================================

/// Server side of one mock transport
#[derive(Clone)]
pub struct MockConnection {
    pub url: String,
    sent: Arc<Mutex<Vec<WsMessage>>>,
    closed: Arc<AtomicBool>,
    inject: mpsc::UnboundedSender<TransportEvent>,
}

impl MockConnection {
    /// Frames the client wrote, in order
    pub fn sent(&self) -> Vec<WsMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Whether the client closed its sink
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Deliver an event to the client's read half
    pub fn inject(&self, event: TransportEvent) {
        let _ = self.inject.send(event);
    }

    pub fn push(&self, message: WsMessage) {
        self.inject(TransportEvent::Message(message));
    }
}

#[derive(Default)]
struct MockConnectorInner {
    attempts: AtomicUsize,
    fail_next: AtomicUsize,
    connections: Mutex<Vec<MockConnection>>,
}

/// Connector that hands out in-memory transports and records them
#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<MockConnectorInner>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` connect calls fail
    pub fn fail_next(&self, n: usize) {
        self.inner.fail_next.store(n, Ordering::Release);
    }

    /// Connect calls so far, failed ones included
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::Acquire)
    }

    /// Successful connections so far
    pub fn connection_count(&self) -> usize {
        self.inner.connections.lock().len()
    }

    pub fn connection(&self, index: usize) -> MockConnection {
        self.inner.connections.lock()[index].clone()
    }

    pub fn last(&self) -> MockConnection {
        self.inner
            .connections
            .lock()
            .last()
            .cloned()
            .expect("no connection yet")
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
        self.inner.attempts.fetch_add(1, Ordering::AcqRel);

        let should_fail = self
            .inner
            .fail_next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(LiveSocketError::WebSocket("connection refused".into()));
        }

        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (inject, events) = mpsc::unbounded_channel();

        self.inner.connections.lock().push(MockConnection {
            url: url.to_string(),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
            inject,
        });

        Ok((
            Box::new(MockSink { sent, closed }),
            Box::new(MockStream { events }),
        ))
    }
}

struct MockSink {
    sent: Arc<Mutex<Vec<WsMessage>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl TransportSink for MockSink {
    async fn send(&mut self, message: WsMessage) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LiveSocketError::ConnectionClosed("sink closed".into()));
        }
        self.sent.lock().push(message);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

struct MockStream {
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl TransportStream for MockStream {
    async fn next_event(&mut self) -> TransportEvent {
        self.events.recv().await.unwrap_or(TransportEvent::Closed)
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Client wired to a [`MockConnector`] and a [`ChannelBus`]
pub struct Harness {
    pub client: LiveClient,
    pub connector: MockConnector,
    pub bus: ChannelBus,
}

pub fn harness() -> Harness {
    harness_with(Arc::new(StaticToken(TEST_KEY)), None, Box::new(Immediate))
}

pub fn harness_with(
    tokens: Arc<dyn TokenProvider>,
    uid: Option<u64>,
    strategy: Box<dyn ReconnectionStrategy>,
) -> Harness {
    let connector = MockConnector::new();
    let bus = ChannelBus::new();

    let client = livesocket::builder()
        .url(TEST_URL)
        .connector(connector.clone())
        .boxed_reconnect_strategy(strategy)
        .protocol(Arc::new(JsonCodec), Arc::new(CmdClassifier))
        .auth(tokens, Arc::new(StaticSession::new(uid)))
        .publisher(Arc::new(bus.clone()))
        .build()
        .unwrap();

    Harness {
        client,
        connector,
        bus,
    }
}

/// Poll `condition` every 5ms until it holds or `limit` elapses
pub async fn wait_until<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let step = Duration::from_millis(5);
    let mut waited = Duration::ZERO;
    while waited < limit {
        if condition() {
            return true;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
    condition()
}

/// Wait for the current connection to reach streaming with its
/// auth frame and first heartbeat written
pub async fn wait_streaming(harness: &Harness, connections: usize) {
    let ok = wait_until(Duration::from_secs(2), || {
        harness.connector.connection_count() == connections
            && harness.client.state() == ConnectionState::Streaming
            && harness.connector.last().sent_count() >= 2
    })
    .await;
    assert!(
        ok,
        "expected {} connection(s) streaming, got {} in state {:?}",
        connections,
        harness.connector.connection_count(),
        harness.client.state()
    );
}

/// Next event on `rx`, waiting up to one second
pub async fn next_event(rx: &crossbeam_channel::Receiver<LiveEvent>) -> Option<LiveEvent> {
    if wait_until(Duration::from_secs(1), || !rx.is_empty()).await {
        rx.try_recv().ok()
    } else {
        None
    }
}

/// Run `future` with a deadline so a hung client fails the test
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

// ============================================================================
// Loopback WebSocket server
// ============================================================================

/// A real WebSocket server on 127.0.0.1 for exercising `TungsteniteConnector`
///
/// Data messages from the client are forwarded to [`MockWsServer::received`];
/// [`MockWsServer::send`] writes to the most recent connection.
pub struct MockWsServer {
    pub addr: SocketAddr,
    received: Mutex<mpsc::UnboundedReceiver<WsMessage>>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<ServerAction>>>>,
    shutdown: Arc<Notify>,
}

enum ServerAction {
    Send(WsMessage),
    Close,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();
        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let outbound = Arc::new(Mutex::new(None));
        let outbound_clone = Arc::clone(&outbound);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let (action_tx, action_rx) = mpsc::unbounded_channel();
                                *outbound_clone.lock() = Some(action_tx);
                                let received_tx = received_tx.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, received_tx, action_rx).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            received: Mutex::new(received_rx),
            outbound,
            shutdown,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        received_tx: mpsc::UnboundedSender<WsMessage>,
        mut action_rx: mpsc::UnboundedReceiver<ServerAction>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let _ = received_tx.send(WsMessage::Text(text.to_string()));
                        }
                        Some(Ok(Message::Binary(data))) => {
                            let _ = received_tx.send(WsMessage::Binary(data.to_vec()));
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                action = action_rx.recv() => {
                    let result = match action {
                        Some(ServerAction::Send(WsMessage::Text(text))) => write.send(Message::Text(text)).await,
                        Some(ServerAction::Send(WsMessage::Binary(data))) => write.send(Message::Binary(data)).await,
                        Some(ServerAction::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    };
                    if result.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Next data message from the client, waiting up to two seconds
    pub async fn recv(&self) -> Option<WsMessage> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if let Ok(message) = self.received.lock().try_recv() {
                return Some(message);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Send a message to the most recent client
    pub fn send(&self, message: WsMessage) {
        if let Some(tx) = self.outbound.lock().as_ref() {
            let _ = tx.send(ServerAction::Send(message));
        }
    }

    /// Close the most recent client with a close frame
    pub fn close_client(&self) {
        if let Some(tx) = self.outbound.lock().take() {
            let _ = tx.send(ServerAction::Close);
        }
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

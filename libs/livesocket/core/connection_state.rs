//! Lock-free connection state and counters
//!
//! Written by the lifecycle actor, read from anywhere.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle state of the single connection
///
/// ```text
/// Idle ─> Connecting ─> Open ─> Authenticating ─> Streaming
///   ^          ^                                     │
///   │          └──────────── (transport error) ──────┤
///   └──────────── Closing <──── (close) ─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    Connecting = 1,
    Open = 2,
    Authenticating = 3,
    Streaming = 4,
    Closing = 5,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Authenticating,
            4 => ConnectionState::Streaming,
            5 => ConnectionState::Closing,
            _ => ConnectionState::Idle,
        }
    }

    /// A live socket exists in this state
    pub fn has_socket(&self) -> bool {
        matches!(
            self,
            ConnectionState::Open | ConnectionState::Authenticating | ConnectionState::Streaming
        )
    }
}

/// Atomic wrapper around [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.get() == ConnectionState::Idle
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.get() == ConnectionState::Streaming
    }
}

/// Counters exposed through [`crate::client::Metrics`]
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    events_published: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}

/// Generation check for work that outlives an await
///
/// Each connection gets a new generation. Spawned work captures the
/// generation it was started for and asks [`GenerationGuard::is_current`]
/// before touching shared state again.
#[derive(Debug, Clone)]
pub struct GenerationGuard {
    current: std::sync::Arc<AtomicU64>,
    captured: u64,
}

impl GenerationGuard {
    pub(crate) fn new(current: std::sync::Arc<AtomicU64>, captured: u64) -> Self {
        Self { current, captured }
    }

    /// Guard that is always current. For driving components outside the client.
    pub fn detached() -> Self {
        Self {
            current: std::sync::Arc::new(AtomicU64::new(0)),
            captured: 0,
        }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.captured
    }

    #[inline]
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.captured
    }
}

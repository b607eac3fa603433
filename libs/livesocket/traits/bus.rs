//! Event bus seams
//!
//! The client publishes [`LiveEvent`]s and consumes [`RoomCommand`]s. Both
//! directions go through traits so the host decides what the bus actually is.
//!
//! ```text
//!   host ──open-room / close-room──> CommandSource ──> CommandBridge ──> LiveClient
//!   host <──popularity, ranking, …── EventPublisher <── FrameDispatcher
//! ```

use crate::error::Result;
use crossbeam_channel::Receiver;
use serde_json::Value;

/// Events the client republishes to the host
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Popularity(u64),
    Ranking(Vec<Value>),
    ChatMessages(Vec<Value>),
    Gifts(Vec<Value>),
    Welcomes(Vec<Value>),
    SuperChats(Vec<Value>),
    Connected,
}

impl LiveEvent {
    /// Name of the bus channel this event is published on
    pub fn channel(&self) -> &'static str {
        match self {
            LiveEvent::Popularity(_) => "popularity",
            LiveEvent::Ranking(_) => "ranking",
            LiveEvent::ChatMessages(_) => "chat-messages",
            LiveEvent::Gifts(_) => "gifts",
            LiveEvent::Welcomes(_) => "welcomes",
            LiveEvent::SuperChats(_) => "super-chats",
            LiveEvent::Connected => "connected",
        }
    }
}

/// Which command channel a subscription listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    OpenRoom,
    CloseRoom,
}

impl CommandKind {
    pub fn channel(&self) -> &'static str {
        match self {
            CommandKind::OpenRoom => "open-room",
            CommandKind::CloseRoom => "close-room",
        }
    }
}

/// Commands the host sends to start or stop monitoring a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCommand {
    /// Room id exactly as the host sent it; parsed by the bridge
    Open { room_id: String },
    Close,
}

impl RoomCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            RoomCommand::Open { .. } => CommandKind::OpenRoom,
            RoomCommand::Close => CommandKind::CloseRoom,
        }
    }
}

/// Publishing side of the bus
pub trait EventPublisher: Send + Sync + 'static {
    fn publish(&self, event: LiveEvent) -> Result<()>;
}

/// Subscribing side of the bus for commands
pub trait CommandSource: Send + Sync + 'static {
    /// Start listening on one command channel.
    ///
    /// Commands arrive on the returned receiver until the subscription is
    /// released or dropped.
    fn listen(&self, kind: CommandKind) -> Result<(Subscription, Receiver<RoomCommand>)>;
}

/// Handle for an active bus subscription
///
/// Releasing (or dropping) it unregisters the listener.
pub struct Subscription {
    channel: &'static str,
    unlisten: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(channel: &'static str, unlisten: impl FnOnce() + Send + 'static) -> Self {
        Self {
            channel,
            unlisten: Some(Box::new(unlisten)),
        }
    }

    pub fn channel(&self) -> &'static str {
        self.channel
    }

    /// Unregister now
    pub fn release(mut self) {
        if let Some(unlisten) = self.unlisten.take() {
            unlisten();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unlisten) = self.unlisten.take() {
            unlisten();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("active", &self.unlisten.is_some())
            .finish()
    }
}

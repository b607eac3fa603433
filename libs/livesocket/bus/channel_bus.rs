use crate::traits::{CommandKind, CommandSource, EventPublisher, LiveEvent, Result, RoomCommand, Subscription};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Unique identifier for a subscriber
type SubscriberId = u64;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    event_subscribers: RwLock<HashMap<SubscriberId, Sender<LiveEvent>>>,
    command_subscribers: RwLock<HashMap<CommandKind, HashMap<SubscriberId, Sender<RoomCommand>>>>,
}

impl BusInner {
    fn next_id(&self) -> SubscriberId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// In-process event bus on unbounded crossbeam channels
///
/// Every subscriber gets its own receiver; each published event is cloned
/// to all of them. Subscribers whose receiver has been dropped are pruned
/// on the next publish.
#[derive(Clone, Default)]
pub struct ChannelBus {
    inner: Arc<BusInner>,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every [`LiveEvent`] published from now on
    pub fn subscribe_events(&self) -> (Subscription, Receiver<LiveEvent>) {
        let (tx, rx) = unbounded();
        let id = self.inner.next_id();
        self.inner.event_subscribers.write().insert(id, tx);

        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);
        let subscription = Subscription::new("events", move || {
            if let Some(inner) = weak.upgrade() {
                inner.event_subscribers.write().remove(&id);
            }
        });

        (subscription, rx)
    }

    /// Deliver a command to every listener of its channel
    ///
    /// Returns how many listeners received it.
    pub fn send_command(&self, command: RoomCommand) -> usize {
        let kind = command.kind();
        let listeners = self.inner.command_subscribers.read();
        let Some(listeners) = listeners.get(&kind) else {
            debug!(channel = kind.channel(), "No listener for command");
            return 0;
        };

        listeners
            .values()
            .filter(|tx| tx.send(command.clone()).is_ok())
            .count()
    }

    pub fn event_subscriber_count(&self) -> usize {
        self.inner.event_subscribers.read().len()
    }

    pub fn command_listener_count(&self, kind: CommandKind) -> usize {
        self.inner
            .command_subscribers
            .read()
            .get(&kind)
            .map_or(0, HashMap::len)
    }
}

impl EventPublisher for ChannelBus {
    fn publish(&self, event: LiveEvent) -> Result<()> {
        let mut dead = Vec::new();
        {
            let subscribers = self.inner.event_subscribers.read();
            trace!(channel = event.channel(), subscribers = subscribers.len(), "publish");
            for (id, tx) in subscribers.iter() {
                if tx.send(event.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.inner.event_subscribers.write();
            for id in dead {
                subscribers.remove(&id);
            }
        }

        Ok(())
    }
}

impl CommandSource for ChannelBus {
    fn listen(&self, kind: CommandKind) -> Result<(Subscription, Receiver<RoomCommand>)> {
        let (tx, rx) = unbounded();
        let id = self.inner.next_id();
        self.inner
            .command_subscribers
            .write()
            .entry(kind)
            .or_default()
            .insert(id, tx);

        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);
        let subscription = Subscription::new(kind.channel(), move || {
            if let Some(inner) = weak.upgrade() {
                if let Some(listeners) = inner.command_subscribers.write().get_mut(&kind) {
                    listeners.remove(&id);
                }
            }
        });

        Ok((subscription, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_every_subscriber() {
        let bus = ChannelBus::new();
        let (_a, rx_a) = bus.subscribe_events();
        let (_b, rx_b) = bus.subscribe_events();

        bus.publish(LiveEvent::Popularity(7)).unwrap();

        assert_eq!(rx_a.try_recv().unwrap(), LiveEvent::Popularity(7));
        assert_eq!(rx_b.try_recv().unwrap(), LiveEvent::Popularity(7));
    }

    #[test]
    fn test_released_subscription_stops_delivery() {
        let bus = ChannelBus::new();
        let (sub, rx) = bus.subscribe_events();
        assert_eq!(bus.event_subscriber_count(), 1);

        sub.release();
        assert_eq!(bus.event_subscriber_count(), 0);

        bus.publish(LiveEvent::Connected).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let bus = ChannelBus::new();
        let (_sub, rx) = bus.subscribe_events();
        drop(rx);

        bus.publish(LiveEvent::Connected).unwrap();
        assert_eq!(bus.event_subscriber_count(), 0);
    }

    #[test]
    fn test_commands_only_reach_their_channel() {
        let bus = ChannelBus::new();
        let (_open, open_rx) = bus.listen(CommandKind::OpenRoom).unwrap();
        let (_close, close_rx) = bus.listen(CommandKind::CloseRoom).unwrap();

        let delivered = bus.send_command(RoomCommand::Open {
            room_id: "123".into(),
        });

        assert_eq!(delivered, 1);
        assert_eq!(
            open_rx.try_recv().unwrap(),
            RoomCommand::Open {
                room_id: "123".into()
            }
        );
        assert!(close_rx.try_recv().is_err());
    }

    #[test]
    fn test_dropping_subscription_unlistens() {
        let bus = ChannelBus::new();
        {
            let (_sub, _rx) = bus.listen(CommandKind::CloseRoom).unwrap();
            assert_eq!(bus.command_listener_count(CommandKind::CloseRoom), 1);
        }
        assert_eq!(bus.command_listener_count(CommandKind::CloseRoom), 0);
        assert_eq!(bus.send_command(RoomCommand::Close), 0);
    }
}

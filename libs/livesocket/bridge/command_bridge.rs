use crate::core::ClientHandle;
use crate::traits::{CommandKind, CommandSource, LiveSocketError, Result, RoomCommand, Subscription};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

/// Parse the room id carried by an open-room command
///
/// Surrounding whitespace is ignored; anything else that is not a plain
/// unsigned integer is rejected rather than guessed at.
pub fn parse_room_id(raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| LiveSocketError::InvalidRoomId(raw.to_string()))
}

/// Drives a [`ClientHandle`] from the host's open-room / close-room commands
///
/// Listens on both command channels from a dedicated thread for as long as
/// the bridge is alive. The subscriptions are held here and released
/// together by [`CommandBridge::shutdown`] (or on drop).
pub struct CommandBridge {
    subscriptions: Vec<Subscription>,
    stop_tx: Sender<()>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CommandBridge {
    /// Subscribe to both command channels and start forwarding
    pub fn start(source: &dyn CommandSource, client: ClientHandle) -> Result<Self> {
        let (open_sub, open_rx) = source.listen(CommandKind::OpenRoom)?;
        let (close_sub, close_rx) = source.listen(CommandKind::CloseRoom)?;
        let (stop_tx, stop_rx) = bounded(1);

        let thread = std::thread::Builder::new()
            .name("command-bridge".into())
            .spawn(move || bridge_loop(client, open_rx, close_rx, stop_rx))
            .map_err(|e| LiveSocketError::Other(format!("failed to spawn bridge thread: {}", e)))?;

        info!("Command bridge listening on open-room and close-room");

        Ok(Self {
            subscriptions: vec![open_sub, close_sub],
            stop_tx,
            thread: Some(thread),
        })
    }

    /// Number of subscriptions still held
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Release every subscription and stop the bridge thread
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            debug!(channel = subscription.channel(), "Releasing subscription");
            subscription.release();
        }
        let _ = self.stop_tx.try_send(());

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Command bridge thread panicked");
            }
        }
    }
}

impl Drop for CommandBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn bridge_loop(
    client: ClientHandle,
    open_rx: Receiver<RoomCommand>,
    close_rx: Receiver<RoomCommand>,
    stop_rx: Receiver<()>,
) {
    loop {
        crossbeam_channel::select! {
            recv(open_rx) -> cmd => match cmd {
                Ok(RoomCommand::Open { room_id }) => handle_open(&client, &room_id),
                Ok(other) => warn!(?other, "Unexpected command on open-room"),
                Err(_) => break,
            },
            recv(close_rx) -> cmd => match cmd {
                Ok(_) => {
                    debug!("close-room received");
                    if let Err(e) = client.close() {
                        warn!("Could not close connection: {}", e);
                    }
                }
                Err(_) => break,
            },
            recv(stop_rx) -> _ => break,
        }
    }

    debug!("Command bridge thread exiting");
}

fn handle_open(client: &ClientHandle, raw: &str) {
    let room_id = match parse_room_id(raw) {
        Ok(id) => id,
        Err(e) => {
            error!("Rejected open-room command: {}", e);
            return;
        }
    };

    debug!(room_id, "open-room received");
    let result = client.close().and_then(|_| client.open(room_id));
    if let Err(e) = result {
        warn!(room_id, "Could not open connection: {}", e);
    }
}

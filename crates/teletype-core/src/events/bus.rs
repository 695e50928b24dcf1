use teletype_common::types::TerminalSnapshot;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, instrument};

use super::types::{Command, Event};

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

/// Channels connecting a terminal task to its host
pub struct EventBus {
    command_tx: mpsc::Sender<Command>,
    command_rx: Option<mpsc::Receiver<Command>>,
    event_tx: broadcast::Sender<Event>,
    snapshot_tx: watch::Sender<TerminalSnapshot>,
}

impl EventBus {
    /// Create a new event bus seeded with the initial snapshot
    pub fn new(initial: TerminalSnapshot) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot_tx, _) = watch::channel(initial);

        Self {
            command_tx,
            command_rx: Some(command_rx),
            event_tx,
            snapshot_tx,
        }
    }

    /// Get a command sender
    pub fn command_sender(&self) -> mpsc::Sender<Command> {
        self.command_tx.clone()
    }

    /// Take the command receiver. Returns `None` once it has been taken.
    pub fn take_command_receiver(&mut self) -> Option<mpsc::Receiver<Command>> {
        self.command_rx.take()
    }

    /// Get an event receiver
    pub fn event_receiver(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the event sender
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }

    /// Get a receiver that always holds the latest snapshot
    pub fn snapshot_receiver(&self) -> watch::Receiver<TerminalSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Send a command
    #[instrument(skip(self))]
    pub async fn send_command(&self, command: Command) -> Result<(), mpsc::error::SendError<Command>> {
        debug!("Sending command: {:?}", command);
        self.command_tx.send(command).await
    }

    /// Broadcast an event. Having no subscribers is not an error.
    pub fn send_event(&self, event: Event) {
        debug!("Broadcasting event: {:?}", event);
        let _ = self.event_tx.send(event);
    }

    /// Replace the latest snapshot
    pub fn publish(&self, snapshot: TerminalSnapshot) {
        self.snapshot_tx.send_replace(snapshot);
    }
}

pub mod events;
pub mod rng;
pub mod session;
pub mod terminal;

use std::time::Duration;
use teletype_common::{
    error::{Result, TeletypeError},
    traits::RandomSource,
    types::{TerminalConfig, TerminalSnapshot},
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

pub use events::EventBus;
pub use rng::{ScriptedRng, XorShiftRng};
pub use session::SessionManager;
pub use terminal::{StepOutcome, TypingState};

use events::{Command, Event};

/// A typed terminal: the typing state machine plus the timer chain that
/// drives it.
pub struct Terminal {
    state: TypingState,
    rng: Box<dyn RandomSource>,
    event_bus: EventBus,
}

impl Terminal {
    /// Create a terminal with an entropy-seeded random source
    #[instrument(skip(config), fields(commands = config.commands.len()))]
    pub fn new(config: TerminalConfig) -> Self {
        Self::with_rng(config, XorShiftRng::from_entropy())
    }

    /// Create a terminal with a caller-supplied random source
    pub fn with_rng<R: RandomSource + 'static>(config: TerminalConfig, rng: R) -> Self {
        let state = TypingState::new(&config);
        let event_bus = EventBus::new(state.snapshot());
        info!(
            commands = config.commands.len(),
            typing = config.typing_enabled,
            "Terminal created"
        );
        Self {
            state,
            rng: Box::new(rng),
            event_bus,
        }
    }

    /// Get a command sender for external control
    pub fn command_sender(&self) -> mpsc::Sender<Command> {
        self.event_bus.command_sender()
    }

    /// Get an event receiver for monitoring terminal events
    pub fn event_receiver(&self) -> broadcast::Receiver<Event> {
        self.event_bus.event_receiver()
    }

    /// Get a receiver holding the latest snapshot
    pub fn snapshot_receiver(&self) -> watch::Receiver<TerminalSnapshot> {
        self.event_bus.snapshot_receiver()
    }

    /// Get the current typing state
    pub fn state(&self) -> &TypingState {
        &self.state
    }

    /// Run the terminal on its own task. Must be called inside a tokio
    /// runtime. Dropping the returned handle stops the task.
    pub fn spawn(self) -> TerminalHandle {
        let cancel = CancellationToken::new();
        let commands = self.command_sender();
        let snapshots = self.snapshot_receiver();
        let events = self.event_bus.event_sender();
        let task = tokio::spawn(self.run(cancel.clone()));
        TerminalHandle {
            commands,
            snapshots,
            events,
            cancel,
            task: Some(task),
        }
    }

    /// Run the terminal event loop until closed or cancelled
    #[instrument(skip(self, cancel))]
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        info!("Starting terminal run loop");
        let Some(mut command_rx) = self.event_bus.take_command_receiver() else {
            error!("Command receiver already taken");
            return Err(TeletypeError::Event("command receiver already taken".into()));
        };

        let mut caret = caret_interval(self.state.timings().caret_interval);
        let mut deadline = self.schedule();
        self.publish_state();

        loop {
            let step = wait_until(deadline);

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Terminal cancelled");
                    break;
                }

                command = command_rx.recv() => {
                    match command {
                        Some(Command::Reconfigure(config)) => {
                            debug!(commands = config.commands.len(), "Processing reconfigure command");
                            self.state.reconfigure(&config);
                            let period = self.state.timings().caret_interval;
                            if period != caret.period() {
                                caret = caret_interval(period);
                            }
                            deadline = self.schedule();
                            self.publish_state();
                        }
                        Some(Command::SetTyping(enabled)) => {
                            debug!(enabled, "Processing typing command");
                            if self.state.set_typing_enabled(enabled) {
                                deadline = self.schedule();
                                self.publish_state();
                            }
                        }
                        Some(Command::Close) | None => {
                            info!("Received close command");
                            break;
                        }
                    }
                }

                _ = caret.tick() => {
                    let visible = self.state.toggle_caret();
                    self.event_bus.publish(self.state.snapshot());
                    self.event_bus.send_event(Event::CaretToggled(visible));
                }

                _ = step => {
                    let outcome = self.state.advance(&mut *self.rng);
                    deadline = self.schedule();
                    self.publish_state();
                    match outcome {
                        StepOutcome::Revealed { command, completed: true, .. }
                        | StepOutcome::CommandStarted { command, completed: true } => {
                            debug!(command, "Command completed");
                            self.event_bus.send_event(Event::CommandCompleted(command));
                        }
                        StepOutcome::Finished => {
                            info!("All commands typed");
                            self.event_bus.send_event(Event::Finished);
                        }
                        _ => {}
                    }
                }
            }
        }

        self.event_bus.send_event(Event::Closed);
        info!("Terminal run loop completed");
        Ok(())
    }

    /// Deadline of the single pending step, if any
    fn schedule(&self) -> Option<Instant> {
        self.state.next_delay().map(|delay| Instant::now() + delay)
    }

    fn publish_state(&self) {
        let snapshot = self.state.snapshot();
        self.event_bus.publish(snapshot.clone());
        self.event_bus.send_event(Event::StateChanged(snapshot));
    }
}

fn caret_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Owner of a spawned terminal task.
///
/// The task lives exactly as long as the handle: dropping it cancels the
/// pending step and aborts the task, so no state changes after teardown.
pub struct TerminalHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<TerminalSnapshot>,
    events: broadcast::Sender<Event>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<()>>>,
}

impl TerminalHandle {
    /// Replace the configuration; typing restarts from the first command
    pub async fn reconfigure(&self, config: TerminalConfig) -> Result<()> {
        self.send(Command::Reconfigure(config)).await
    }

    /// Pause or resume typing
    pub async fn set_typing(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetTyping(enabled)).await
    }

    /// Ask the task to stop once it has drained earlier commands
    pub async fn close(&self) -> Result<()> {
        self.send(Command::Close).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TeletypeError::Closed)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> TerminalSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn snapshot_receiver(&self) -> watch::Receiver<TerminalSnapshot> {
        self.snapshots.clone()
    }

    /// Stream of snapshots, starting with the current one
    pub fn snapshots(&self) -> WatchStream<TerminalSnapshot> {
        WatchStream::new(self.snapshots.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the terminal and wait for its task to exit
    #[instrument(skip(self))]
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                error!("Terminal task failed: {}", e);
                Err(TeletypeError::Event(format!("terminal task failed: {e}")))
            }
        }
    }
}

impl Drop for TerminalHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

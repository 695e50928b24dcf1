use teletype_common::types::{TerminalConfig, TerminalSnapshot};

/// Commands that can be sent to a running terminal
#[derive(Debug, Clone)]
pub enum Command {
    /// Replace the configuration and start typing from the top
    Reconfigure(TerminalConfig),

    /// Pause or resume automatic typing
    SetTyping(bool),

    /// Stop the terminal
    Close,
}

/// Events emitted by a terminal
#[derive(Debug, Clone)]
pub enum Event {
    /// Revealed text or phase changed
    StateChanged(TerminalSnapshot),

    /// Caret blinked
    CaretToggled(bool),

    /// The command at this index is fully revealed
    CommandCompleted(usize),

    /// Every command has been typed
    Finished,

    /// Terminal stopped; no further events follow
    Closed,
}

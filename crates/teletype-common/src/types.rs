use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display surface dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub rows: u16,
    pub cols: u16,
}

impl Size {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { rows, cols }
    }
}

/// Typing cursor: which command is being typed and how many of its
/// characters are confirmed-revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub command_index: usize,
    pub char_index: usize,
}

impl Position {
    pub fn new(command_index: usize, char_index: usize) -> Self {
        Self {
            command_index,
            char_index,
        }
    }
}

/// Phase of the typing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Typing disabled before the first command was entered.
    Idle,
    /// A command slot is open and waits for its first character.
    AwaitingFirstChar,
    /// At least one character of the active command is revealed.
    Typing,
    /// A wrong character is on screen.
    Glitching { bad: char },
    /// The wrong character was removed; typing resumes after a short pause.
    GlitchReverting,
    /// The active command is complete.
    BetweenCommands,
    /// Every command has been typed.
    Finished,
}

impl Phase {
    pub fn is_glitch(&self) -> bool {
        matches!(self, Phase::Glitching { .. } | Phase::GlitchReverting)
    }
}

pub const DEFAULT_GLITCH_PROBABILITY: f64 = 0.03;
pub const DEFAULT_TYPING_SPEED_MS: i64 = 30;
pub const DEFAULT_INITIAL_DELAY_MS: i64 = 500;
pub const DEFAULT_GLITCH_HOLD_MS: i64 = 200;
pub const DEFAULT_GLITCH_PAUSE_MS: i64 = 100;
pub const DEFAULT_COMMAND_PAUSE_MS: i64 = 1000;
pub const DEFAULT_CARET_INTERVAL_MS: i64 = 500;

/// Terminal configuration as supplied by a host or a config file.
///
/// Values are stored as given; out-of-range numbers are clamped by
/// [`TerminalConfig::timings`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub commands: Vec<String>,
    pub typing_enabled: bool,
    pub glitch_probability: f64,
    pub typing_speed_ms: i64,
    pub initial_delay_ms: i64,
    pub glitch_hold_ms: i64,
    pub glitch_pause_ms: i64,
    pub command_pause_ms: i64,
    pub caret_interval_ms: i64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            typing_enabled: true,
            glitch_probability: DEFAULT_GLITCH_PROBABILITY,
            typing_speed_ms: DEFAULT_TYPING_SPEED_MS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            glitch_hold_ms: DEFAULT_GLITCH_HOLD_MS,
            glitch_pause_ms: DEFAULT_GLITCH_PAUSE_MS,
            command_pause_ms: DEFAULT_COMMAND_PAUSE_MS,
            caret_interval_ms: DEFAULT_CARET_INTERVAL_MS,
        }
    }
}

impl TerminalConfig {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_typing(mut self, enabled: bool) -> Self {
        self.typing_enabled = enabled;
        self
    }

    pub fn with_glitch_probability(mut self, probability: f64) -> Self {
        self.glitch_probability = probability;
        self
    }

    pub fn with_typing_speed_ms(mut self, ms: i64) -> Self {
        self.typing_speed_ms = ms;
        self
    }

    pub fn with_initial_delay_ms(mut self, ms: i64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    pub fn with_caret_interval_ms(mut self, ms: i64) -> Self {
        self.caret_interval_ms = ms;
        self
    }

    /// Resolve the numeric settings, clamping anything out of range.
    pub fn timings(&self) -> Timings {
        Timings {
            glitch_probability: clamp_probability(self.glitch_probability),
            typing_speed: clamp_ms(self.typing_speed_ms),
            initial_delay: clamp_ms(self.initial_delay_ms),
            glitch_hold: clamp_ms(self.glitch_hold_ms),
            glitch_pause: clamp_ms(self.glitch_pause_ms),
            command_pause: clamp_ms(self.command_pause_ms),
            // tokio intervals panic on a zero period
            caret_interval: clamp_ms(self.caret_interval_ms).max(Duration::from_millis(1)),
        }
    }
}

fn clamp_ms(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Clamped timing settings used by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub glitch_probability: f64,
    pub typing_speed: Duration,
    pub initial_delay: Duration,
    pub glitch_hold: Duration,
    pub glitch_pause: Duration,
    pub command_pause: Duration,
    pub caret_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        TerminalConfig::default().timings()
    }
}

/// Read-only view of a terminal at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSnapshot {
    /// Revealed prefix of every command slot entered so far.
    pub lines: Vec<String>,
    /// Number of commands in the sequence.
    pub total: usize,
    pub cursor: Position,
    /// Slot currently being typed, if any.
    pub active: Option<usize>,
    /// Row the caret glyph is drawn on. May equal `lines.len()` when the
    /// caret sits on a fresh, empty prompt row.
    pub caret_row: usize,
    pub caret_visible: bool,
    pub phase: Phase,
    pub typing_enabled: bool,
}

impl TerminalSnapshot {
    /// Revealed text of slot `index`, empty for slots not reached yet.
    pub fn line(&self, index: usize) -> &str {
        self.lines.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Rows a display surface needs: every entered slot plus the caret row.
    pub fn visible_rows(&self) -> usize {
        self.lines.len().max(self.caret_row + 1)
    }
}

use std::time::Duration;
use teletype_common::traits::RandomSource;
use teletype_common::types::{Phase, Position, TerminalConfig, TerminalSnapshot, Timings};
use tracing::{debug, instrument};

use super::cursor::Cursor;
use crate::rng::corrupt_char;

/// What a single [`TypingState::advance`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No step was due (typing disabled, or nothing left to type).
    Stalled,
    /// A new command slot was opened. `completed` is set for empty commands,
    /// which are fully revealed as soon as they start.
    CommandStarted { command: usize, completed: bool },
    /// The next correct character was revealed.
    Revealed { command: usize, ch: char, completed: bool },
    /// A wrong character was put on screen.
    GlitchShown { command: usize, bad: char },
    /// The wrong character was taken off screen again.
    GlitchReverted { command: usize },
    /// The glitch episode ended; normal typing resumes.
    GlitchCleared { command: usize },
    /// The last command has been typed.
    Finished,
}

/// Typing state machine for one terminal.
///
/// The machine is timer-agnostic: the owner asks [`next_delay`] how long to
/// wait, sleeps, then calls [`advance`]. Only one step is ever pending.
///
/// [`next_delay`]: TypingState::next_delay
/// [`advance`]: TypingState::advance
pub struct TypingState {
    commands: Vec<Vec<char>>,
    revealed: Vec<String>,
    cursor: Cursor,
    phase: Phase,
    typing_enabled: bool,
    timings: Timings,
    caret_visible: bool,
}

impl TypingState {
    /// Create a typing state for the given configuration
    #[instrument(skip(config), fields(commands = config.commands.len()))]
    pub fn new(config: &TerminalConfig) -> Self {
        let mut state = Self {
            commands: Vec::new(),
            revealed: Vec::new(),
            cursor: Cursor::new(),
            phase: Phase::Idle,
            typing_enabled: config.typing_enabled,
            timings: config.timings(),
            caret_visible: true,
        };
        state.load(config);
        state
    }

    /// Throw away all progress and start over with a new configuration.
    /// The caret keeps its blink phase.
    #[instrument(skip(self, config), fields(commands = config.commands.len()))]
    pub fn reconfigure(&mut self, config: &TerminalConfig) {
        debug!("Reconfiguring typing state");
        self.load(config);
    }

    fn load(&mut self, config: &TerminalConfig) {
        self.commands = config.commands.iter().map(|c| c.chars().collect()).collect();
        self.revealed.clear();
        self.cursor.reset();
        self.typing_enabled = config.typing_enabled;
        self.timings = config.timings();
        self.phase = Phase::Idle;

        if self.commands.is_empty() {
            self.phase = Phase::Finished;
        } else if self.typing_enabled {
            self.enter_command();
        }
    }

    /// Open the slot for the command under the cursor
    fn enter_command(&mut self) -> StepOutcome {
        let command = self.cursor.command();
        if command >= self.commands.len() {
            debug!("All {} commands typed", self.commands.len());
            self.phase = Phase::Finished;
            return StepOutcome::Finished;
        }

        self.revealed.push(String::new());
        let completed = self.commands[command].is_empty();
        self.phase = if completed {
            Phase::BetweenCommands
        } else {
            Phase::AwaitingFirstChar
        };
        debug!(command, completed, "Entered command");
        StepOutcome::CommandStarted { command, completed }
    }

    /// Delay before the next step should run, or `None` when nothing is
    /// scheduled.
    pub fn next_delay(&self) -> Option<Duration> {
        if !self.typing_enabled {
            return None;
        }
        match self.phase {
            Phase::Idle | Phase::Finished => None,
            Phase::AwaitingFirstChar => Some(self.timings.initial_delay),
            Phase::Typing => Some(self.timings.typing_speed),
            Phase::Glitching { .. } => Some(self.timings.glitch_hold),
            Phase::GlitchReverting => Some(self.timings.glitch_pause),
            Phase::BetweenCommands => Some(self.timings.command_pause),
        }
    }

    /// Run one step of the machine.
    pub fn advance(&mut self, rng: &mut dyn RandomSource) -> StepOutcome {
        if !self.typing_enabled {
            return StepOutcome::Stalled;
        }

        let outcome = match self.phase {
            Phase::Idle => self.enter_command(),
            Phase::AwaitingFirstChar | Phase::Typing => self.type_step(rng),
            Phase::Glitching { .. } => {
                let command = self.cursor.command();
                self.revealed[command] = self.correct_prefix();
                self.phase = Phase::GlitchReverting;
                StepOutcome::GlitchReverted { command }
            }
            Phase::GlitchReverting => {
                self.phase = Phase::Typing;
                StepOutcome::GlitchCleared {
                    command: self.cursor.command(),
                }
            }
            Phase::BetweenCommands => {
                self.cursor.next_command();
                self.enter_command()
            }
            Phase::Finished => StepOutcome::Stalled,
        };
        debug!(?outcome, position = ?self.cursor.position(), "Step");
        outcome
    }

    fn type_step(&mut self, rng: &mut dyn RandomSource) -> StepOutcome {
        let command = self.cursor.command();
        let typed = self.cursor.chars();
        let len = self.commands[command].len();

        if typed > 0 && rng.next_f64() < self.timings.glitch_probability {
            let bad = corrupt_char(rng);
            let mut shown = self.correct_prefix();
            shown.push(bad);
            self.revealed[command] = shown;
            self.phase = Phase::Glitching { bad };
            debug!(command, typed, %bad, "Glitch");
            return StepOutcome::GlitchShown { command, bad };
        }

        if typed >= len {
            self.phase = Phase::BetweenCommands;
            return StepOutcome::Stalled;
        }

        let ch = self.commands[command][typed];
        self.revealed[command].push(ch);
        self.cursor.advance_char();

        let completed = self.cursor.chars() == len;
        self.phase = if completed {
            Phase::BetweenCommands
        } else {
            Phase::Typing
        };
        StepOutcome::Revealed {
            command,
            ch,
            completed,
        }
    }

    fn correct_prefix(&self) -> String {
        self.commands[self.cursor.command()][..self.cursor.chars()]
            .iter()
            .collect()
    }

    /// Enable or disable automatic progression. Returns true when the
    /// setting changed.
    pub fn set_typing_enabled(&mut self, enabled: bool) -> bool {
        if self.typing_enabled == enabled {
            return false;
        }
        debug!(enabled, "Typing toggled");
        self.typing_enabled = enabled;
        if enabled && self.phase == Phase::Idle {
            self.enter_command();
        }
        true
    }

    /// Flip the caret and return the new visibility
    pub fn toggle_caret(&mut self) -> bool {
        self.caret_visible = !self.caret_visible;
        self.caret_visible
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn position(&self) -> Position {
        self.cursor.position()
    }

    /// Revealed text of every slot entered so far
    pub fn revealed(&self) -> &[String] {
        &self.revealed
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn caret_visible(&self) -> bool {
        self.caret_visible
    }

    pub fn typing_enabled(&self) -> bool {
        self.typing_enabled
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Slot being typed, `None` when idle or finished
    pub fn active(&self) -> Option<usize> {
        match self.phase {
            Phase::Idle | Phase::Finished => None,
            _ => Some(self.cursor.command()),
        }
    }

    fn caret_row(&self) -> usize {
        match self.phase {
            Phase::Idle => 0,
            Phase::Finished => self.revealed.len().saturating_sub(1),
            _ => self.cursor.command(),
        }
    }

    /// Capture the observable state
    pub fn snapshot(&self) -> TerminalSnapshot {
        TerminalSnapshot {
            lines: self.revealed.clone(),
            total: self.commands.len(),
            cursor: self.cursor.position(),
            active: self.active(),
            caret_row: self.caret_row(),
            caret_visible: self.caret_visible,
            phase: self.phase,
            typing_enabled: self.typing_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRng;

    fn no_glitch(commands: &[&str]) -> TerminalConfig {
        TerminalConfig::new(commands.iter().copied()).with_glitch_probability(0.0)
    }

    /// Drive the machine to completion, recording the text of the slot each
    /// step touched.
    fn run(state: &mut TypingState, rng: &mut dyn RandomSource) -> Vec<(usize, String)> {
        let mut frames = Vec::new();
        for slot in 0..state.revealed().len() {
            frames.push((slot, state.revealed()[slot].clone()));
        }
        let mut guard = 0;
        while state.next_delay().is_some() {
            guard += 1;
            assert!(guard < 10_000, "machine did not terminate");
            match state.advance(rng) {
                StepOutcome::CommandStarted { command, .. }
                | StepOutcome::Revealed { command, .. }
                | StepOutcome::GlitchShown { command, .. }
                | StepOutcome::GlitchReverted { command } => {
                    frames.push((command, state.revealed()[command].clone()));
                }
                _ => {}
            }
        }
        frames
    }

    #[test]
    fn test_types_commands_in_order_without_glitches() {
        let mut state = TypingState::new(&no_glitch(&["go", "hello"]));
        let mut rng = ScriptedRng::constant(0.0);
        let frames = run(&mut state, &mut rng);

        let expected: Vec<(usize, String)> = [
            (0, ""),
            (0, "g"),
            (0, "go"),
            (1, ""),
            (1, "h"),
            (1, "he"),
            (1, "hel"),
            (1, "hell"),
            (1, "hello"),
        ]
        .into_iter()
        .map(|(i, s)| (i, s.to_string()))
        .collect();
        assert_eq!(frames, expected);
        assert_eq!(state.position().command_index, 2);
        assert!(state.is_finished());
        assert_eq!(state.active(), None);
    }

    #[test]
    fn test_step_delays_follow_phase() {
        let config = no_glitch(&["ab"])
            .with_initial_delay_ms(500)
            .with_typing_speed_ms(40);
        let mut state = TypingState::new(&config);
        let mut rng = ScriptedRng::constant(0.0);

        assert_eq!(state.next_delay(), Some(Duration::from_millis(500)));
        state.advance(&mut rng);
        assert_eq!(state.next_delay(), Some(Duration::from_millis(40)));
        state.advance(&mut rng);
        assert_eq!(state.phase(), Phase::BetweenCommands);
        assert_eq!(state.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(state.advance(&mut rng), StepOutcome::Finished);
        assert_eq!(state.next_delay(), None);
    }

    #[test]
    fn test_glitch_is_undone_without_advancing() {
        let config = TerminalConfig::new(["abc"]).with_glitch_probability(0.5);
        let mut state = TypingState::new(&config);
        // first char: no draw; second step: 0.1 triggers, 0.0 picks 'a'
        let mut rng = ScriptedRng::new([0.1, 0.0]);

        state.advance(&mut rng);
        assert_eq!(state.revealed()[0], "a");
        assert_eq!(rng.draws(), 0);

        let outcome = state.advance(&mut rng);
        assert_eq!(outcome, StepOutcome::GlitchShown { command: 0, bad: 'a' });
        assert_eq!(state.revealed()[0], "aa");
        assert_eq!(state.position(), Position::new(0, 1));
        assert_eq!(state.next_delay(), Some(Duration::from_millis(200)));

        assert_eq!(state.advance(&mut rng), StepOutcome::GlitchReverted { command: 0 });
        assert_eq!(state.revealed()[0], "a");
        assert_eq!(state.position(), Position::new(0, 1));
        assert_eq!(state.next_delay(), Some(Duration::from_millis(100)));

        assert_eq!(state.advance(&mut rng), StepOutcome::GlitchCleared { command: 0 });
        assert_eq!(state.next_delay(), Some(Duration::from_millis(30)));

        // fallback 0.999 never glitches
        state.advance(&mut rng);
        assert_eq!(state.revealed()[0], "ab");
    }

    #[test]
    fn test_first_char_never_glitches() {
        let config = TerminalConfig::new(["x", "y"]).with_glitch_probability(1.0);
        let mut state = TypingState::new(&config);
        let mut rng = ScriptedRng::constant(0.0);

        let frames = run(&mut state, &mut rng);
        assert_eq!(rng.draws(), 0);
        assert_eq!(state.revealed(), ["x".to_string(), "y".to_string()]);
        assert!(frames.iter().all(|(_, text)| text.len() <= 1));
    }

    #[test]
    fn test_typing_disabled_stays_put() {
        let config = TerminalConfig::new(["test"]).with_typing(false);
        let mut state = TypingState::new(&config);
        let mut rng = ScriptedRng::constant(0.0);

        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.next_delay(), None);
        for _ in 0..10 {
            assert_eq!(state.advance(&mut rng), StepOutcome::Stalled);
        }
        assert!(state.revealed().is_empty());
        assert_eq!(state.position(), Position::new(0, 0));
    }

    #[test]
    fn test_enabling_typing_starts_from_idle() {
        let config = TerminalConfig::new(["hi"]).with_typing(false);
        let mut state = TypingState::new(&config);
        assert!(!state.typing_enabled());

        assert!(state.set_typing_enabled(true));
        assert!(!state.set_typing_enabled(true));
        assert!(state.typing_enabled());
        assert_eq!(state.phase(), Phase::AwaitingFirstChar);
        assert_eq!(state.revealed(), [String::new()]);
    }

    #[test]
    fn test_pause_keeps_glitch_episode() {
        let config = TerminalConfig::new(["abc"]).with_glitch_probability(0.5);
        let mut state = TypingState::new(&config);
        let mut rng = ScriptedRng::new([0.0, 0.0]);
        state.advance(&mut rng);
        state.advance(&mut rng);
        assert!(state.phase().is_glitch());

        state.set_typing_enabled(false);
        assert_eq!(state.next_delay(), None);
        assert_eq!(state.advance(&mut rng), StepOutcome::Stalled);
        assert_eq!(state.revealed()[0], "aa");

        state.set_typing_enabled(true);
        assert_eq!(state.advance(&mut rng), StepOutcome::GlitchReverted { command: 0 });
        assert_eq!(state.revealed()[0], "a");
    }

    #[test]
    fn test_empty_sequence_is_finished() {
        let state = TypingState::new(&TerminalConfig::default());
        assert!(state.is_finished());
        assert!(state.revealed().is_empty());
        assert_eq!(state.next_delay(), None);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.caret_row, 0);
        assert_eq!(snapshot.visible_rows(), 1);
    }

    #[test]
    fn test_empty_command_goes_straight_to_pause() {
        let mut state = TypingState::new(&no_glitch(&["", "a"]));
        let mut rng = ScriptedRng::constant(0.0);

        assert_eq!(state.phase(), Phase::BetweenCommands);
        assert_eq!(state.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(
            state.advance(&mut rng),
            StepOutcome::CommandStarted {
                command: 1,
                completed: false
            }
        );
        run(&mut state, &mut rng);
        assert_eq!(state.revealed(), [String::new(), "a".to_string()]);
    }

    #[test]
    fn test_multibyte_commands_type_per_char() {
        let mut state = TypingState::new(&no_glitch(&["• ☕"]));
        let mut rng = ScriptedRng::constant(0.0);
        let frames = run(&mut state, &mut rng);
        let texts: Vec<&str> = frames.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, ["", "•", "• ", "• ☕"]);
    }

    #[test]
    fn test_reconfigure_restarts_from_zero() {
        let mut state = TypingState::new(&no_glitch(&["abc"]));
        let mut rng = ScriptedRng::constant(0.0);
        state.advance(&mut rng);
        state.advance(&mut rng);
        state.toggle_caret();

        state.reconfigure(&no_glitch(&["xyz", "w"]));
        assert_eq!(state.position(), Position::new(0, 0));
        assert_eq!(state.revealed(), [String::new()]);
        assert_eq!(state.phase(), Phase::AwaitingFirstChar);
        assert!(!state.caret_visible());
    }

    #[test]
    fn test_finished_caret_sits_on_last_line() {
        let mut state = TypingState::new(&no_glitch(&["a", "b"]));
        let mut rng = ScriptedRng::constant(0.0);
        run(&mut state, &mut rng);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.caret_row, 1);
        assert_eq!(snapshot.active, None);
        assert_eq!(snapshot.lines, vec!["a".to_string(), "b".to_string()]);
    }
}

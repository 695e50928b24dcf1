use proptest::collection::vec;
use proptest::prelude::*;
use teletype_common::types::{Phase, TerminalConfig};
use teletype_core::{ScriptedRng, StepOutcome, TypingState};

fn prefix(command: &str, chars: usize) -> String {
    command.chars().take(chars).collect()
}

proptest! {
    #[test]
    fn glitches_are_transient_and_prefixes_grow(
        commands in vec("[a-z •☕]{0,12}", 0..5),
        draws in vec(0.0f64..1.0, 0..64),
        probability in 0.0f64..0.6,
    ) {
        let config = TerminalConfig::new(commands.clone()).with_glitch_probability(probability);
        let mut state = TypingState::new(&config);
        let mut rng = ScriptedRng::new(draws).with_fallback(0.999);

        let mut steps = 0;
        while state.next_delay().is_some() {
            steps += 1;
            prop_assert!(steps < 10_000, "machine did not terminate");

            let before = state.position();
            let outcome = state.advance(&mut rng);
            let after = state.position();

            match outcome {
                StepOutcome::GlitchShown { command, bad } => {
                    prop_assert_eq!(after, before);
                    prop_assert!(after.char_index > 0);
                    let mut expected = prefix(&commands[command], after.char_index);
                    expected.push(bad);
                    prop_assert_eq!(&state.revealed()[command], &expected);
                }
                StepOutcome::GlitchReverted { command } | StepOutcome::GlitchCleared { command } => {
                    prop_assert_eq!(after, before);
                    prop_assert_eq!(
                        &state.revealed()[command],
                        &prefix(&commands[command], after.char_index)
                    );
                }
                StepOutcome::Revealed { command, completed, .. } => {
                    prop_assert_eq!(after.char_index, before.char_index + 1);
                    prop_assert_eq!(
                        &state.revealed()[command],
                        &prefix(&commands[command], after.char_index)
                    );
                    prop_assert_eq!(completed, state.revealed()[command] == commands[command]);
                }
                _ => {}
            }

            if !matches!(state.phase(), Phase::Glitching { .. }) {
                let current = after.command_index;
                if current < commands.len() {
                    prop_assert_eq!(
                        &state.revealed()[current],
                        &prefix(&commands[current], after.char_index)
                    );
                }
            }
            for done in 0..after.command_index.min(commands.len()) {
                prop_assert_eq!(&state.revealed()[done], &commands[done]);
            }
        }

        prop_assert!(state.is_finished());
        prop_assert_eq!(state.revealed(), &commands[..]);
        prop_assert_eq!(state.position().command_index, commands.len());
    }

    #[test]
    fn disabled_typing_never_moves(commands in vec("[a-z]{1,8}", 1..4)) {
        let config = TerminalConfig::new(commands).with_typing(false);
        let mut state = TypingState::new(&config);
        let mut rng = ScriptedRng::constant(0.0);
        for _ in 0..50 {
            prop_assert_eq!(state.advance(&mut rng), StepOutcome::Stalled);
        }
        prop_assert!(state.revealed().is_empty());
        prop_assert_eq!(state.position().char_index, 0);
        prop_assert_eq!(state.position().command_index, 0);
    }
}

mod cursor;
mod state;

pub use cursor::Cursor;
pub use state::{StepOutcome, TypingState};

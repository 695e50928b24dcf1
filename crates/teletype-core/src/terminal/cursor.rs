use teletype_common::types::Position;

/// Typing cursor over a command sequence
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    position: Position,
}

impl Cursor {
    /// Create a cursor at the first character of the first command
    pub fn new() -> Self {
        Self {
            position: Position::new(0, 0),
        }
    }

    /// Get the current cursor position
    pub fn position(&self) -> Position {
        self.position
    }

    /// Index of the command being typed
    pub fn command(&self) -> usize {
        self.position.command_index
    }

    /// Number of confirmed characters of the current command
    pub fn chars(&self) -> usize {
        self.position.char_index
    }

    /// Confirm one more character
    pub fn advance_char(&mut self) {
        self.position.char_index += 1;
    }

    /// Move to the start of the next command
    pub fn next_command(&mut self) {
        self.position.command_index += 1;
        self.position.char_index = 0;
    }

    /// Return to the start of the sequence
    pub fn reset(&mut self) {
        self.position = Position::new(0, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_movement() {
        let mut cursor = Cursor::new();
        assert_eq!(cursor.position(), Position::new(0, 0));

        cursor.advance_char();
        cursor.advance_char();
        assert_eq!(cursor.position(), Position::new(0, 2));

        cursor.next_command();
        assert_eq!(cursor.position(), Position::new(1, 0));
    }

    #[test]
    fn test_cursor_reset() {
        let mut cursor = Cursor::new();
        cursor.next_command();
        cursor.advance_char();

        cursor.reset();
        assert_eq!(cursor.command(), 0);
        assert_eq!(cursor.chars(), 0);
    }
}

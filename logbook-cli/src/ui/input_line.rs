//! Single-line text prompt with a cursor.

use unicode_width::UnicodeWidthChar;

use crate::keymap::InputEdit;

#[derive(Clone, Debug, Default)]
pub struct InputLine {
    chars: Vec<char>,
    /// Cursor position in characters, `0..=chars.len()`.
    cursor: usize,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, edit: InputEdit) {
        match edit {
            InputEdit::Insert(c) => {
                self.chars.insert(self.cursor, c);
                self.cursor += 1;
            }
            InputEdit::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.chars.remove(self.cursor);
                }
            }
            InputEdit::Delete => {
                if self.cursor < self.chars.len() {
                    self.chars.remove(self.cursor);
                }
            }
            InputEdit::Left => self.cursor = self.cursor.saturating_sub(1),
            InputEdit::Right => self.cursor = (self.cursor + 1).min(self.chars.len()),
            InputEdit::Home => self.cursor = 0,
            InputEdit::End => self.cursor = self.chars.len(),
        }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    /// Display column of the cursor.
    pub fn cursor_col(&self) -> usize {
        self.chars[..self.cursor]
            .iter()
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputLine {
        let mut input = InputLine::new();
        for c in text.chars() {
            input.apply(InputEdit::Insert(c));
        }
        input
    }

    #[test]
    fn test_insert_at_cursor() {
        let mut input = typed("eror");
        input.apply(InputEdit::Left);
        input.apply(InputEdit::Left);
        input.apply(InputEdit::Insert('r'));
        assert_eq!(input.text(), "error");
        assert_eq!(input.cursor_col(), 3);
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut input = typed("abc");
        input.apply(InputEdit::Backspace);
        assert_eq!(input.text(), "ab");

        input.apply(InputEdit::Home);
        input.apply(InputEdit::Backspace);
        assert_eq!(input.text(), "ab");
        input.apply(InputEdit::Delete);
        assert_eq!(input.text(), "b");

        input.apply(InputEdit::End);
        input.apply(InputEdit::Delete);
        assert_eq!(input.text(), "b");
    }

    #[test]
    fn test_cursor_bounds() {
        let mut input = typed("ab");
        input.apply(InputEdit::Right);
        assert_eq!(input.cursor_col(), 2);
        input.apply(InputEdit::Home);
        input.apply(InputEdit::Left);
        assert_eq!(input.cursor_col(), 0);
    }

    #[test]
    fn test_wide_chars_move_cursor_two_cells() {
        let input = typed("日本");
        assert_eq!(input.cursor_col(), 4);
    }

    #[test]
    fn test_clear() {
        let mut input = typed("abc");
        input.clear();
        assert_eq!(input.text(), "");
        assert_eq!(input.cursor_col(), 0);
    }
}

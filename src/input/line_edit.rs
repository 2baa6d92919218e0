//! Line editor behind `read_str`
//!
//! Pure editing state; drawing and event pumping live in the session.

use serde::{Deserialize, Serialize};

use super::keys::*;
use super::queue::Event;

/// How a `read_str` call ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOutcome {
    /// Confirmed with RETURN
    Ok(String),
    /// Left with ESCAPE or a close event
    Cancelled,
    /// Initial text exceeded the limit; nothing was edited
    TooLong,
}

impl LineOutcome {
    /// Numeric result: character count, `TK_INPUT_CANCELLED` or
    /// `TK_INPUT_TOO_LONG`
    pub fn code(&self) -> i32 {
        match self {
            LineOutcome::Ok(text) => text.chars().count() as i32,
            LineOutcome::Cancelled => TK_INPUT_CANCELLED,
            LineOutcome::TooLong => TK_INPUT_TOO_LONG,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineEditor {
    chars: Vec<char>,
    cursor: usize,
    max: usize,
}

impl LineEditor {
    /// Start editing `initial` with the cursor at its end.
    /// `None` when `initial` is longer than `max`.
    pub fn new(initial: &str, max: usize) -> Option<Self> {
        let chars: Vec<char> = initial.chars().collect();
        if chars.len() > max {
            return None;
        }
        Some(Self {
            cursor: chars.len(),
            chars,
            max,
        })
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Feed one event; returns the outcome once editing ends
    pub fn handle(&mut self, event: &Event) -> Option<LineOutcome> {
        let (code, character) = match *event {
            Event::Close => return Some(LineOutcome::Cancelled),
            Event::Key { code, released: false, character } => (code, character),
            _ => return None,
        };

        match code {
            TK_RETURN => return Some(LineOutcome::Ok(self.text())),
            TK_ESCAPE => return Some(LineOutcome::Cancelled),
            TK_BACKSPACE => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.chars.remove(self.cursor);
                }
            }
            TK_DELETE => {
                if self.cursor < self.chars.len() {
                    self.chars.remove(self.cursor);
                }
            }
            TK_LEFT => self.cursor = self.cursor.saturating_sub(1),
            TK_RIGHT => self.cursor = (self.cursor + 1).min(self.chars.len()),
            TK_HOME => self.cursor = 0,
            TK_END => self.cursor = self.chars.len(),
            _ => {
                if let Some(c) = character.filter(|c| !c.is_control()) {
                    if self.chars.len() < self.max {
                        self.chars.insert(self.cursor, c);
                        self.cursor += 1;
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn press(code: i32, character: Option<char>) -> Event {
        Event::Key { code, released: false, character }
    }

    fn typed(c: char) -> Event {
        press(key_for_char(c).0, Some(c))
    }

    #[test]
    fn test_type_and_confirm() {
        let mut editor = LineEditor::new("ab", 4).unwrap();
        assert_eq!(editor.handle(&typed('c')), None);
        let outcome = editor.handle(&press(TK_RETURN, None)).unwrap();
        assert_eq!(outcome, LineOutcome::Ok("abc".to_string()));
        assert_eq!(outcome.code(), 3);
    }

    #[test]
    fn test_max_length_ignores_input() {
        let mut editor = LineEditor::new("abcd", 4).unwrap();
        editor.handle(&typed('e'));
        assert_eq!(editor.text(), "abcd");
    }

    #[test]
    fn test_too_long() {
        assert!(LineEditor::new("abcde", 4).is_none());
        assert_eq!(LineOutcome::TooLong.code(), TK_INPUT_TOO_LONG);
    }

    #[test]
    fn test_cursor_movement_and_deletion() {
        let mut editor = LineEditor::new("abc", 10).unwrap();
        editor.handle(&press(TK_LEFT, None));
        editor.handle(&press(TK_BACKSPACE, None));
        assert_eq!((editor.text().as_str(), editor.cursor()), ("ac", 1));
        editor.handle(&press(TK_HOME, None));
        editor.handle(&press(TK_DELETE, None));
        assert_eq!(editor.text(), "c");
        editor.handle(&typed('x'));
        assert_eq!(editor.text(), "xc");
        editor.handle(&press(TK_END, None));
        editor.handle(&press(TK_RIGHT, None));
        assert_eq!(editor.cursor(), 2);
    }

    #[test]
    fn test_cancel() {
        let mut editor = LineEditor::new("", 4).unwrap();
        assert_eq!(editor.handle(&press(TK_ESCAPE, None)), Some(LineOutcome::Cancelled));
        assert_eq!(editor.handle(&Event::Close), Some(LineOutcome::Cancelled));
        assert_eq!(LineOutcome::Cancelled.code(), TK_INPUT_CANCELLED);
    }

    #[test]
    fn test_releases_ignored() {
        let mut editor = LineEditor::new("", 4).unwrap();
        editor.handle(&Event::Key { code: TK_A, released: true, character: Some('a') });
        assert_eq!(editor.text(), "");
    }
}

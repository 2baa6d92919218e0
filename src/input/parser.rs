//! Terminal Input Parser
//!
//! Turns raw bytes from a terminal viewer into engine events. Handles:
//! - Regular characters (UTF-8), delivered as key press + release
//! - Control characters, Ctrl+letter and Alt+key
//! - Arrow keys and other CSI / SS3 escape sequences
//! - Mouse reports (X10, SGR extended), converted to pixel positions

use std::time::{Duration, Instant};

use crate::core::Size;

use super::keys::*;
use super::queue::Event;

/// Presses of the same button closer than this count as multi-clicks
const MULTI_CLICK: Duration = Duration::from_millis(500);

/// Input parser state machine
pub struct InputParser {
    /// Buffer for incomplete escape sequences
    buffer: Vec<u8>,
    cell_size: Size,
    /// Button held according to X10 reports, which do not say which
    /// button was released
    held: Option<i32>,
    last_click: Option<(i32, (i32, i32), Instant, i32)>,
}

enum ParseResult {
    Events(Vec<Event>),
    Incomplete,
    Invalid(usize),
}

impl InputParser {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(32),
            cell_size: Size::new(1, 1),
            held: None,
            last_click: None,
        }
    }

    /// Pixel size of a cell, used to report mouse positions
    pub fn set_cell_size(&mut self, size: Size) {
        self.cell_size = size;
    }

    /// Parse input bytes into events. Incomplete sequences are kept for
    /// the next call, except a lone ESC which is taken as the key.
    pub fn parse(&mut self, data: &[u8]) -> Vec<Event> {
        let mut events = Vec::new();
        self.buffer.extend_from_slice(data);

        while !self.buffer.is_empty() {
            match self.try_parse_one() {
                ParseResult::Events(mut parsed) => events.append(&mut parsed),
                ParseResult::Incomplete => break,
                ParseResult::Invalid(skip) => {
                    self.buffer.drain(0..skip.min(self.buffer.len()));
                }
            }
        }

        if self.buffer == [0x1b] {
            self.buffer.clear();
            events.extend(keystroke(TK_ESCAPE, None));
        }

        events
    }

    fn try_parse_one(&mut self) -> ParseResult {
        let first = self.buffer[0];

        if first == 0x1b {
            return self.parse_escape();
        }

        if first < 32 || first == 0x7f {
            self.buffer.remove(0);
            let events = match first {
                0x0d | 0x0a => keystroke(TK_RETURN, None),
                0x09 => keystroke(TK_TAB, None),
                0x7f | 0x08 => keystroke(TK_BACKSPACE, None),
                0x01..=0x1a => chord(TK_CONTROL, TK_A + (first - 1) as i32, None),
                _ => return ParseResult::Invalid(0),
            };
            return ParseResult::Events(events);
        }

        match self.decode_utf8() {
            Some((ch, len)) => {
                self.buffer.drain(0..len);
                ParseResult::Events(char_events(ch))
            }
            None if self.buffer.len() < utf8_len(first) => ParseResult::Incomplete,
            None => ParseResult::Invalid(1),
        }
    }

    fn parse_escape(&mut self) -> ParseResult {
        if self.buffer.len() < 2 {
            return ParseResult::Incomplete;
        }

        match self.buffer[1] {
            b'[' => self.parse_csi(),
            b'O' => self.parse_ss3(),
            // ESC ESC: the first one is the key itself
            0x1b => {
                self.buffer.remove(0);
                ParseResult::Events(keystroke(TK_ESCAPE, None))
            }
            c if c >= 32 && c < 0x7f => {
                self.buffer.drain(0..2);
                let (code, _) = key_for_char(c as char);
                ParseResult::Events(chord(TK_ALT, code, Some(c as char)))
            }
            _ => {
                self.buffer.remove(0);
                ParseResult::Events(keystroke(TK_ESCAPE, None))
            }
        }
    }

    /// CSI sequence: ESC [
    fn parse_csi(&mut self) -> ParseResult {
        if self.buffer.len() < 3 {
            return ParseResult::Incomplete;
        }

        if self.buffer[2] == b'<' {
            return self.parse_sgr_mouse();
        }
        if self.buffer[2] == b'M' {
            return self.parse_x10_mouse();
        }

        let end = self.buffer[2..]
            .iter()
            .position(|&b| b.is_ascii_alphabetic() || b == b'~');

        match end {
            None => ParseResult::Incomplete,
            Some(pos) => {
                let end_idx = 2 + pos;
                let final_byte = self.buffer[end_idx];
                let params: Vec<u8> = self.buffer[2..end_idx].to_vec();
                self.buffer.drain(0..=end_idx);

                match decode_csi(&params, final_byte) {
                    Some(code) => ParseResult::Events(keystroke(code, None)),
                    None => ParseResult::Invalid(0),
                }
            }
        }
    }

    /// SS3 sequence: ESC O (F1-F4 and application cursor keys)
    fn parse_ss3(&mut self) -> ParseResult {
        if self.buffer.len() < 3 {
            return ParseResult::Incomplete;
        }

        let code = match self.buffer[2] {
            b'P' => Some(TK_F1),
            b'Q' => Some(TK_F1 + 1),
            b'R' => Some(TK_F1 + 2),
            b'S' => Some(TK_F1 + 3),
            b'M' => Some(TK_RETURN),
            other => decode_cursor(other),
        };

        self.buffer.drain(0..3);
        match code {
            Some(code) => ParseResult::Events(keystroke(code, None)),
            None => ParseResult::Invalid(0),
        }
    }

    /// X10 mouse: ESC [ M Cb Cx Cy
    fn parse_x10_mouse(&mut self) -> ParseResult {
        if self.buffer.len() < 6 {
            return ParseResult::Incomplete;
        }

        let cb = self.buffer[3].saturating_sub(32);
        let x = self.buffer[4].saturating_sub(33) as i32;
        let y = self.buffer[5].saturating_sub(33) as i32;
        self.buffer.drain(0..6);

        let released = cb & 0x03 == 3 && cb & 0x40 == 0;
        ParseResult::Events(self.mouse(cb, x, y, released))
    }

    /// SGR mouse: ESC [ < Pb ; Px ; Py M/m
    fn parse_sgr_mouse(&mut self) -> ParseResult {
        let end = self.buffer[3..].iter().position(|&b| b == b'M' || b == b'm');

        match end {
            None => ParseResult::Incomplete,
            Some(pos) => {
                let end_idx = 3 + pos;
                let is_release = self.buffer[end_idx] == b'm';
                let params = String::from_utf8_lossy(&self.buffer[3..end_idx]).into_owned();
                self.buffer.drain(0..=end_idx);

                let parts: Vec<i32> = params.split(';').filter_map(|p| p.parse().ok()).collect();
                if parts.len() < 3 {
                    return ParseResult::Invalid(0);
                }

                let pb = parts[0].clamp(0, 255) as u8;
                ParseResult::Events(self.mouse(pb, parts[1] - 1, parts[2] - 1, is_release))
            }
        }
    }

    /// Events for one mouse report at cell (x, y)
    fn mouse(&mut self, cb: u8, x: i32, y: i32, released: bool) -> Vec<Event> {
        let mut events = vec![Event::MouseMove {
            x: x * self.cell_size.width,
            y: y * self.cell_size.height,
        }];

        let bits = cb & 0x03;
        if cb & 0x40 != 0 {
            let delta = if bits == 0 { -1 } else { 1 };
            events.push(Event::MouseScroll { delta });
            return events;
        }
        if cb & 0x20 != 0 {
            return events;
        }

        let code = match bits {
            0 => Some(TK_MOUSE_LEFT),
            1 => Some(TK_MOUSE_MIDDLE),
            2 => Some(TK_MOUSE_RIGHT),
            _ => None,
        };

        if released {
            if let Some(code) = code.or_else(|| self.held.take()) {
                self.held = None;
                events.push(Event::MouseButton { code, released: true, clicks: 0 });
            }
            return events;
        }

        if let Some(code) = code {
            self.held = Some(code);
            let now = Instant::now();
            let clicks = match self.last_click {
                Some((last, cell, at, n)) if last == code && cell == (x, y) && now - at < MULTI_CLICK => n + 1,
                _ => 1,
            };
            self.last_click = Some((code, (x, y), now, clicks));
            events.push(Event::MouseButton { code, released: false, clicks });
        }
        events
    }

    /// Decode a UTF-8 character from the front of the buffer
    fn decode_utf8(&self) -> Option<(char, usize)> {
        let first = *self.buffer.first()?;

        if first < 128 {
            return Some((first as char, 1));
        }

        let len = utf8_len(first);
        if len == 0 || self.buffer.len() < len {
            return None;
        }

        let s = std::str::from_utf8(&self.buffer[0..len]).ok()?;
        s.chars().next().map(|c| (c, len))
    }
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Expected length of a UTF-8 sequence from its lead byte, 0 if invalid
fn utf8_len(first: u8) -> usize {
    if first < 0x80 {
        1
    } else if first & 0xE0 == 0xC0 {
        2
    } else if first & 0xF0 == 0xE0 {
        3
    } else if first & 0xF8 == 0xF0 {
        4
    } else {
        0
    }
}

fn decode_cursor(final_byte: u8) -> Option<i32> {
    match final_byte {
        b'A' => Some(TK_UP),
        b'B' => Some(TK_DOWN),
        b'C' => Some(TK_RIGHT),
        b'D' => Some(TK_LEFT),
        b'H' => Some(TK_HOME),
        b'F' => Some(TK_END),
        _ => None,
    }
}

/// Decode CSI parameters into a key code
fn decode_csi(params: &[u8], final_byte: u8) -> Option<i32> {
    if final_byte != b'~' {
        return decode_cursor(final_byte);
    }
    let num: u32 = params
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0, |acc, &b| acc * 10 + (b - b'0') as u32);
    match num {
        1 | 7 => Some(TK_HOME),
        2 => Some(TK_INSERT),
        3 => Some(TK_DELETE),
        4 | 8 => Some(TK_END),
        5 => Some(TK_PAGEUP),
        6 => Some(TK_PAGEDOWN),
        11..=15 => Some(TK_F1 + (num - 11) as i32),
        17..=21 => Some(TK_F1 + 5 + (num - 17) as i32),
        23 | 24 => Some(TK_F1 + 10 + (num - 23) as i32),
        _ => None,
    }
}

/// Press and release of one key
fn keystroke(code: i32, character: Option<char>) -> Vec<Event> {
    vec![
        Event::Key { code, released: false, character },
        Event::Key { code, released: true, character: None },
    ]
}

/// A key struck while a modifier is held
fn chord(modifier: i32, code: i32, character: Option<char>) -> Vec<Event> {
    let mut events = vec![Event::Key { code: modifier, released: false, character: None }];
    events.extend(keystroke(code, character));
    events.push(Event::Key { code: modifier, released: true, character: None });
    events
}

/// A typed character, wrapped in shift when the layout needs it
fn char_events(ch: char) -> Vec<Event> {
    match key_for_char(ch) {
        (code, true) => chord(TK_SHIFT, code, Some(ch)),
        (code, false) => keystroke(code, Some(ch)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn codes(events: &[Event]) -> Vec<i32> {
        events.iter().map(|e| e.code()).collect()
    }

    #[test]
    fn test_parse_char() {
        let mut parser = InputParser::new();
        let events = parser.parse(b"a");
        assert_eq!(
            events,
            vec![
                Event::Key { code: TK_A, released: false, character: Some('a') },
                Event::Key { code: TK_A, released: true, character: None },
            ]
        );
    }

    #[test]
    fn test_shifted_char() {
        let mut parser = InputParser::new();
        let events = parser.parse(b"A");
        assert_eq!(
            codes(&events),
            vec![TK_SHIFT, TK_A, TK_A | TK_KEY_RELEASED, TK_SHIFT | TK_KEY_RELEASED]
        );
    }

    #[test]
    fn test_unidentified_char_keeps_character() {
        let mut parser = InputParser::new();
        let events = parser.parse("é".as_bytes());
        assert_eq!(
            events[0],
            Event::Key { code: TK_UNIDENTIFIED, released: false, character: Some('é') }
        );
    }

    #[test]
    fn test_parse_arrow_keys() {
        let mut parser = InputParser::new();
        assert_eq!(codes(&parser.parse(b"\x1b[A")), vec![TK_UP, TK_UP | TK_KEY_RELEASED]);
        assert_eq!(codes(&parser.parse(b"\x1bOB")), vec![TK_DOWN, TK_DOWN | TK_KEY_RELEASED]);
        assert_eq!(codes(&parser.parse(b"\x1b[3~"))[0], TK_DELETE);
        assert_eq!(codes(&parser.parse(b"\x1b[24~"))[0], TK_F12);
    }

    #[test]
    fn test_split_sequence() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b[").is_empty());
        assert_eq!(codes(&parser.parse(b"D"))[0], TK_LEFT);
    }

    #[test]
    fn test_lone_escape() {
        let mut parser = InputParser::new();
        assert_eq!(codes(&parser.parse(b"\x1b")), vec![TK_ESCAPE, TK_ESCAPE | TK_KEY_RELEASED]);
    }

    #[test]
    fn test_control_keys() {
        let mut parser = InputParser::new();
        assert_eq!(codes(&parser.parse(b"\r"))[0], TK_RETURN);
        assert_eq!(codes(&parser.parse(b"\x7f"))[0], TK_BACKSPACE);
        assert_eq!(codes(&parser.parse(b"\x03"))[..2].to_vec(), vec![TK_CONTROL, TK_A + 2]);
    }

    #[test]
    fn test_parse_sgr_mouse() {
        let mut parser = InputParser::new();
        parser.set_cell_size(Size::new(8, 16));

        let events = parser.parse(b"\x1b[<0;10;5M");
        assert_eq!(
            events,
            vec![
                Event::MouseMove { x: 72, y: 64 },
                Event::MouseButton { code: TK_MOUSE_LEFT, released: false, clicks: 1 },
            ]
        );

        let events = parser.parse(b"\x1b[<0;10;5M");
        assert_eq!(events[1], Event::MouseButton { code: TK_MOUSE_LEFT, released: false, clicks: 2 });

        let events = parser.parse(b"\x1b[<0;10;5m");
        assert_eq!(events[1].code(), TK_MOUSE_LEFT | TK_KEY_RELEASED);

        let events = parser.parse(b"\x1b[<65;1;1M");
        assert_eq!(events[1], Event::MouseScroll { delta: 1 });
    }

    #[test]
    fn test_parse_x10_mouse() {
        let mut parser = InputParser::new();
        let events = parser.parse(&[0x1b, b'[', b'M', 32 + 2, 33 + 4, 33 + 1]);
        assert_eq!(events[0], Event::MouseMove { x: 4, y: 1 });
        assert_eq!(events[1].code(), TK_MOUSE_RIGHT);
        let events = parser.parse(&[0x1b, b'[', b'M', 32 + 3, 33 + 4, 33 + 1]);
        assert_eq!(events[1].code(), TK_MOUSE_RIGHT | TK_KEY_RELEASED);
    }

    #[test]
    fn test_parse_multiple() {
        let mut parser = InputParser::new();
        let events = parser.parse(b"ab\x1b[A");
        assert_eq!(events.len(), 6);
        assert_eq!(events[2].code(), TK_A + 1);
        assert_eq!(events[4].code(), TK_UP);
    }
}

//! Key codes and state slots
//!
//! Platform-independent scancode-like codes. A release is the press
//! code with `TK_KEY_RELEASED` set. Codes 0xC0.. are state slots only
//! readable through `state()`.

pub const TK_UNIDENTIFIED: i32 = 0x01;

pub const TK_A: i32 = 0x04;
pub const TK_Z: i32 = 0x1D;
pub const TK_1: i32 = 0x1E;
pub const TK_9: i32 = 0x26;
pub const TK_0: i32 = 0x27;
pub const TK_RETURN: i32 = 0x28;
pub const TK_ENTER: i32 = 0x28;
pub const TK_ESCAPE: i32 = 0x29;
pub const TK_BACKSPACE: i32 = 0x2A;
pub const TK_TAB: i32 = 0x2B;
pub const TK_SPACE: i32 = 0x2C;
pub const TK_MINUS: i32 = 0x2D;
pub const TK_EQUALS: i32 = 0x2E;
pub const TK_LBRACKET: i32 = 0x2F;
pub const TK_RBRACKET: i32 = 0x30;
pub const TK_BACKSLASH: i32 = 0x31;
pub const TK_SEMICOLON: i32 = 0x33;
pub const TK_APOSTROPHE: i32 = 0x34;
pub const TK_GRAVE: i32 = 0x35;
pub const TK_COMMA: i32 = 0x36;
pub const TK_PERIOD: i32 = 0x37;
pub const TK_SLASH: i32 = 0x38;
pub const TK_F1: i32 = 0x3A;
pub const TK_F12: i32 = 0x45;
pub const TK_PAUSE: i32 = 0x48;
pub const TK_INSERT: i32 = 0x49;
pub const TK_HOME: i32 = 0x4A;
pub const TK_PAGEUP: i32 = 0x4B;
pub const TK_DELETE: i32 = 0x4C;
pub const TK_END: i32 = 0x4D;
pub const TK_PAGEDOWN: i32 = 0x4E;
pub const TK_RIGHT: i32 = 0x4F;
pub const TK_LEFT: i32 = 0x50;
pub const TK_DOWN: i32 = 0x51;
pub const TK_UP: i32 = 0x52;
pub const TK_KP_DIVIDE: i32 = 0x54;
pub const TK_KP_PERIOD: i32 = 0x63;
pub const TK_SHIFT: i32 = 0x70;
pub const TK_CONTROL: i32 = 0x71;
pub const TK_ALT: i32 = 0x72;

pub const TK_MOUSE_LEFT: i32 = 0x80;
pub const TK_MOUSE_RIGHT: i32 = 0x81;
pub const TK_MOUSE_MIDDLE: i32 = 0x82;
pub const TK_MOUSE_X1: i32 = 0x83;
pub const TK_MOUSE_X2: i32 = 0x84;
pub const TK_MOUSE_MOVE: i32 = 0x85;
pub const TK_MOUSE_SCROLL: i32 = 0x86;
pub const TK_MOUSE_X: i32 = 0x87;
pub const TK_MOUSE_Y: i32 = 0x88;
pub const TK_MOUSE_PIXEL_X: i32 = 0x89;
pub const TK_MOUSE_PIXEL_Y: i32 = 0x8A;
pub const TK_MOUSE_WHEEL: i32 = 0x8B;
pub const TK_MOUSE_CLICKS: i32 = 0x8C;

pub const TK_KEY_RELEASED: i32 = 0x100;

pub const TK_WIDTH: i32 = 0xC0;
pub const TK_HEIGHT: i32 = 0xC1;
pub const TK_CELL_WIDTH: i32 = 0xC2;
pub const TK_CELL_HEIGHT: i32 = 0xC3;
pub const TK_COLOR: i32 = 0xC4;
pub const TK_BKCOLOR: i32 = 0xC5;
pub const TK_LAYER: i32 = 0xC6;
pub const TK_COMPOSITION: i32 = 0xC7;
pub const TK_CHAR: i32 = 0xC8;
pub const TK_WCHAR: i32 = 0xC9;
pub const TK_EVENT: i32 = 0xCA;
pub const TK_FULLSCREEN: i32 = 0xCB;

pub const TK_CLOSE: i32 = 0xE0;
pub const TK_RESIZED: i32 = 0xE1;

pub const TK_OFF: i32 = 0;
pub const TK_ON: i32 = 1;

pub const TK_INPUT_NONE: i32 = 0;
pub const TK_INPUT_CANCELLED: i32 = -1;
pub const TK_INPUT_TOO_LONG: i32 = -2;

/// Size of the state table (covers every code including releases' base)
pub const STATE_SLOTS: usize = 0x100;

/// Whether `code` is a keyboard key
pub fn is_keyboard(code: i32) -> bool {
    (TK_UNIDENTIFIED..=TK_ALT).contains(&(code & !TK_KEY_RELEASED))
}

/// Whether `code` is a mouse event
pub fn is_mouse(code: i32) -> bool {
    (TK_MOUSE_LEFT..=TK_MOUSE_CLICKS).contains(&(code & !TK_KEY_RELEASED))
}

/// Letter and digit keys in code order
const ALNUM: &str = "abcdefghijklmnopqrstuvwxyz1234567890";

/// (unshifted, shifted, code) for the US layout punctuation row
const PUNCTUATION: [(char, char, i32); 11] = [
    ('-', '_', TK_MINUS),
    ('=', '+', TK_EQUALS),
    ('[', '{', TK_LBRACKET),
    (']', '}', TK_RBRACKET),
    ('\\', '|', TK_BACKSLASH),
    (';', ':', TK_SEMICOLON),
    ('\'', '"', TK_APOSTROPHE),
    ('`', '~', TK_GRAVE),
    (',', '<', TK_COMMA),
    ('.', '>', TK_PERIOD),
    ('/', '?', TK_SLASH),
];

const SHIFTED_DIGITS: &str = "!@#$%^&*()";

/// Key that types `ch` on a US layout, and whether shift is needed.
/// Characters without a key map to `TK_UNIDENTIFIED`.
pub fn key_for_char(ch: char) -> (i32, bool) {
    if let Some(i) = ALNUM.find(ch.to_ascii_lowercase()) {
        if ch.is_ascii() {
            return (TK_A + i as i32, ch.is_ascii_uppercase());
        }
    }
    if let Some(i) = SHIFTED_DIGITS.find(ch) {
        return (TK_1 + i as i32, true);
    }
    match ch {
        ' ' => return (TK_SPACE, false),
        '\t' => return (TK_TAB, false),
        '\r' | '\n' => return (TK_RETURN, false),
        _ => {}
    }
    for (plain, shifted, code) in PUNCTUATION {
        if ch == plain {
            return (code, false);
        }
        if ch == shifted {
            return (code, true);
        }
    }
    (TK_UNIDENTIFIED, false)
}

/// Parse a key or event name used in `input.filter`
pub fn code_from_name(name: &str) -> Option<i32> {
    let name = name.trim().to_ascii_lowercase();
    if name.chars().count() == 1 {
        let ch = name.chars().next()?;
        if let Some(i) = ALNUM.find(ch) {
            return Some(TK_A + i as i32);
        }
    }
    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<i32>().ok()) {
        if (1..=12).contains(&n) {
            return Some(TK_F1 + n - 1);
        }
    }
    if let Some(n) = name.strip_prefix("kp-").and_then(|n| n.parse::<i32>().ok()) {
        if (1..=9).contains(&n) {
            return Some(0x59 + n - 1);
        }
        if n == 0 {
            return Some(0x62);
        }
    }

    let code = match name.as_str() {
        "return" | "enter" => TK_RETURN,
        "escape" => TK_ESCAPE,
        "backspace" => TK_BACKSPACE,
        "tab" => TK_TAB,
        "space" => TK_SPACE,
        "minus" => TK_MINUS,
        "equals" => TK_EQUALS,
        "lbracket" => TK_LBRACKET,
        "rbracket" => TK_RBRACKET,
        "backslash" => TK_BACKSLASH,
        "semicolon" => TK_SEMICOLON,
        "apostrophe" => TK_APOSTROPHE,
        "grave" => TK_GRAVE,
        "comma" => TK_COMMA,
        "period" => TK_PERIOD,
        "slash" => TK_SLASH,
        "pause" => TK_PAUSE,
        "insert" => TK_INSERT,
        "home" => TK_HOME,
        "pageup" => TK_PAGEUP,
        "delete" => TK_DELETE,
        "end" => TK_END,
        "pagedown" => TK_PAGEDOWN,
        "right" => TK_RIGHT,
        "left" => TK_LEFT,
        "down" => TK_DOWN,
        "up" => TK_UP,
        "shift" => TK_SHIFT,
        "control" | "ctrl" => TK_CONTROL,
        "alt" => TK_ALT,
        "mouse-left" => TK_MOUSE_LEFT,
        "mouse-right" => TK_MOUSE_RIGHT,
        "mouse-middle" => TK_MOUSE_MIDDLE,
        "mouse-x1" => TK_MOUSE_X1,
        "mouse-x2" => TK_MOUSE_X2,
        "mouse-move" => TK_MOUSE_MOVE,
        "mouse-scroll" => TK_MOUSE_SCROLL,
        "close" => TK_CLOSE,
        "resized" => TK_RESIZED,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_bit() {
        let press = TK_A;
        let release = TK_A | TK_KEY_RELEASED;
        assert_ne!(press, release);
        assert_eq!(press ^ release, TK_KEY_RELEASED);
        assert!(is_keyboard(release));
        assert!(!is_mouse(release));
    }

    #[test]
    fn test_key_for_char() {
        assert_eq!(key_for_char('a'), (TK_A, false));
        assert_eq!(key_for_char('Z'), (TK_Z, true));
        assert_eq!(key_for_char('0'), (TK_0, false));
        assert_eq!(key_for_char('9'), (TK_9, false));
        assert_eq!(key_for_char('!'), (TK_1, true));
        assert_eq!(key_for_char('?'), (TK_SLASH, true));
        assert_eq!(key_for_char(' '), (TK_SPACE, false));
        assert_eq!(key_for_char('é'), (TK_UNIDENTIFIED, false));
    }

    #[test]
    fn test_code_from_name() {
        assert_eq!(code_from_name("a"), Some(TK_A));
        assert_eq!(code_from_name("F12"), Some(TK_F12));
        assert_eq!(code_from_name("escape"), Some(TK_ESCAPE));
        assert_eq!(code_from_name("mouse-left"), Some(TK_MOUSE_LEFT));
        assert_eq!(code_from_name("kp-0"), Some(0x62));
        assert_eq!(code_from_name("bogus"), None);
    }

    #[test]
    fn test_categories() {
        assert!(is_mouse(TK_MOUSE_MOVE));
        assert!(!is_keyboard(TK_CLOSE));
        assert!(!is_mouse(TK_CLOSE));
    }
}

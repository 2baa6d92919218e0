//! Single-byte encodings
//!
//! Narrow entry points (byte strings) are decoded here and nowhere else;
//! everything past this boundary works with Unicode `str`.

use std::fmt;

/// Code page 437, 0x80..=0xFF
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{A0}',
];

/// Code page 437 glyphs for the control range, used for tile indices
const CP437_LOW: [char; 32] = [
    '\0', '☺', '☻', '♥', '♦', '♣', '♠', '•', '◘', '○', '◙', '♂', '♀', '♪', '♫', '☼',
    '►', '◄', '↕', '‼', '¶', '§', '▬', '↨', '↑', '↓', '→', '←', '∟', '↔', '▲', '▼',
];

/// A text encoding for byte-string entry points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    Cp437,
    Latin1,
}

impl Encoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "unicode" => Some(Encoding::Utf8),
            "437" | "cp437" | "ibm437" => Some(Encoding::Cp437),
            "latin1" | "latin-1" | "iso-8859-1" | "1252" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Cp437 => "437",
            Encoding::Latin1 => "latin1",
        }
    }

    /// Decode a byte string. Invalid UTF-8 becomes U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            _ => bytes.iter().map(|&b| self.decode_byte(b)).collect(),
        }
    }

    /// Decode one byte as text; control characters stay controls
    pub fn decode_byte(&self, b: u8) -> char {
        match self {
            Encoding::Cp437 if b >= 0x80 => CP437_HIGH[(b - 0x80) as usize],
            _ => b as char,
        }
    }

    /// Codepoint drawn for tile index `index` of a sheet laid out in
    /// this encoding. 437 maps the control range to its glyphs.
    pub fn tile_code(&self, index: u32) -> u32 {
        match self {
            Encoding::Utf8 => index,
            Encoding::Latin1 => index,
            Encoding::Cp437 => match index {
                1..=0x1F => CP437_LOW[index as usize] as u32,
                0x7F => '⌂' as u32,
                0x80..=0xFF => CP437_HIGH[(index - 0x80) as usize] as u32,
                _ => index,
            },
        }
    }

    /// Inverse of `tile_code`
    pub fn tile_index(&self, code: u32) -> Option<u32> {
        match self {
            Encoding::Utf8 => Some(code),
            Encoding::Latin1 => (code <= 0xFF).then_some(code),
            Encoding::Cp437 => {
                if code < 0x80 && !(1..=0x1F).contains(&code) && code != 0x7F {
                    return Some(code);
                }
                let ch = char::from_u32(code)?;
                CP437_LOW
                    .iter()
                    .position(|&c| c == ch && ch != '\0')
                    .map(|i| i as u32)
                    .or_else(|| (ch == '⌂').then_some(0x7F))
                    .or_else(|| CP437_HIGH.iter().position(|&c| c == ch).map(|i| i as u32 + 0x80))
            }
        }
    }

    /// Encode text; characters without a mapping become `?`
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Latin1 => text
                .chars()
                .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
                .collect(),
            Encoding::Cp437 => text
                .chars()
                .map(|c| {
                    if (c as u32) < 0x80 {
                        c as u8
                    } else {
                        CP437_HIGH
                            .iter()
                            .position(|&h| h == c)
                            .map(|i| i as u8 + 0x80)
                            .unwrap_or(b'?')
                    }
                })
                .collect(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Encoding::from_name("437"), Some(Encoding::Cp437));
        assert_eq!(Encoding::from_name("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::from_name("koi8"), None);
    }

    #[test]
    fn test_decode_cp437() {
        assert_eq!(Encoding::Cp437.decode(&[b'A', 0xB3, 0xDB, b'\n']), "A│█\n");
        assert_eq!(Encoding::Latin1.decode(&[0xE9]), "é");
        assert_eq!(Encoding::Utf8.decode(&[0xFF]), "\u{FFFD}");
    }

    #[test]
    fn test_tile_codes() {
        assert_eq!(Encoding::Cp437.tile_code(1), '☺' as u32);
        assert_eq!(Encoding::Cp437.tile_code(b'A' as u32), 'A' as u32);
        assert_eq!(Encoding::Cp437.tile_code(0xC4), '─' as u32);
        assert_eq!(Encoding::Cp437.tile_index('─' as u32), Some(0xC4));
        assert_eq!(Encoding::Cp437.tile_index('☺' as u32), Some(1));
        assert_eq!(Encoding::Cp437.tile_index('€' as u32), None);
        assert_eq!(Encoding::Latin1.tile_index(0x100), None);
    }

    #[test]
    fn test_encode() {
        assert_eq!(Encoding::Cp437.encode("a░€"), vec![b'a', 0xB0, b'?']);
        assert_eq!(Encoding::Latin1.encode("é"), vec![0xE9]);
    }
}

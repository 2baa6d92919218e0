//! Print markup
//!
//! Inline tags recognized by `print` when postformatting is enabled:
//!
//! - `[color=X]` / `[c=X]` and `[/color]` / `[/c]`
//! - `[bkcolor=X]` and `[/bkcolor]`
//! - `[U+E001]` / `[0xE001]` for a literal code
//! - `[+]` to compose the next glyph onto the previous cell
//! - `[[` and `]]` for literal brackets
//!
//! Unknown or malformed tags are dropped.

use crate::core::Color;

/// One element of formatted text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A code to draw
    Code(u32),
    /// Hard line break
    Newline,
    /// Push a foreground color
    Color(Color),
    /// Restore the previous foreground color
    PopColor,
    /// Push a background color
    BkColor(Color),
    /// Restore the previous background color
    PopBkColor,
    /// Draw the next code in the previous code's cell
    Combine,
}

/// Split text into tokens. With `postformatting` off every character is
/// taken literally.
pub fn tokenize(text: &str, postformatting: bool) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => tokens.push(Token::Newline),
            '\r' => {}
            '[' if postformatting => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    tokens.push(Token::Code('[' as u32));
                    continue;
                }
                let mut tag = String::new();
                let mut closed = false;
                for t in chars.by_ref() {
                    if t == ']' {
                        closed = true;
                        break;
                    }
                    tag.push(t);
                }
                if closed {
                    if let Some(token) = parse_tag(&tag) {
                        tokens.push(token);
                    }
                }
            }
            ']' if postformatting => {
                if chars.peek() == Some(&']') {
                    chars.next();
                }
                tokens.push(Token::Code(']' as u32));
            }
            c => tokens.push(Token::Code(c as u32)),
        }
    }

    tokens
}

fn parse_tag(tag: &str) -> Option<Token> {
    let tag = tag.trim();
    if tag == "+" {
        return Some(Token::Combine);
    }
    if let Some(hex) = tag.strip_prefix("U+").or_else(|| tag.strip_prefix("u+")) {
        return u32::from_str_radix(hex, 16).ok().map(Token::Code);
    }
    if let Some(hex) = tag.strip_prefix("0x").or_else(|| tag.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok().map(Token::Code);
    }

    match tag.split_once('=') {
        Some((name, value)) => match name.trim().to_ascii_lowercase().as_str() {
            "color" | "c" => Color::parse(value).map(Token::Color),
            "bkcolor" | "b" => Color::parse(value).map(Token::BkColor),
            _ => None,
        },
        None => match tag.to_ascii_lowercase().as_str() {
            "/color" | "/c" => Some(Token::PopColor),
            "/bkcolor" | "/b" => Some(Token::PopBkColor),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn codes(s: &str) -> Vec<Token> {
        s.chars().map(|c| Token::Code(c as u32)).collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(tokenize("ab", true), codes("ab"));
        assert_eq!(
            tokenize("a\nb", true),
            vec![Token::Code('a' as u32), Token::Newline, Token::Code('b' as u32)]
        );
    }

    #[test]
    fn test_color_tags() {
        assert_eq!(
            tokenize("[color=red]x[/color]", true),
            vec![
                Token::Color(Color::rgb(255, 0, 0)),
                Token::Code('x' as u32),
                Token::PopColor,
            ]
        );
        assert_eq!(tokenize("[c=#0000FF][/c]", true), vec![Token::Color(Color(0xFF00_00FF)), Token::PopColor]);
        assert_eq!(tokenize("[bkcolor=black]", true), vec![Token::BkColor(Color::BLACK)]);
    }

    #[test]
    fn test_codes_and_escapes() {
        assert_eq!(tokenize("[U+E001][0x41]", true), vec![Token::Code(0xE001), Token::Code(0x41)]);
        assert_eq!(tokenize("[[x]]", true), codes("[x]"));
        assert_eq!(tokenize("a[+]b", true)[1], Token::Combine);
    }

    #[test]
    fn test_unknown_and_unclosed_tags_dropped() {
        assert_eq!(tokenize("[font=big]a", true), codes("a"));
        assert_eq!(tokenize("[color=nosuch]a", true), codes("a"));
        assert_eq!(tokenize("a[color=red", true), codes("a"));
    }

    #[test]
    fn test_postformatting_off() {
        assert_eq!(tokenize("[c=red]", false), codes("[c=red]"));
    }
}

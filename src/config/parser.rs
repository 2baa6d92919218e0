//! Option string parser
//!
//! Two spellings are accepted and may be mixed:
//!
//! ```text
//! window.size=80x25; window.title='My game'
//! font: tiles.png, size=8x16; 0xE000: icons.png, size=16x16
//! ```
//!
//! Properties are separated by `;`. In the grouped form the nameless
//! value becomes the `name` attribute. Values may be quoted with `'…'`,
//! `"…"` or `[…]`; a backslash escapes the next character. Whitespace
//! around names and values is dropped. Empty values are ignored.

use std::collections::BTreeMap;

use crate::error::{EngineError, Result};

/// Attributes of one option group, e.g. `window` or `0xE000`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionGroup {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) {
        self.chars.next();
    }

    /// Read until an unquoted char from `stops`. Inner whitespace is
    /// kept, leading and trailing whitespace is not.
    fn read_until(&mut self, stops: &str) -> String {
        let mut value = String::new();
        let mut space = String::new();
        let mut closing: Option<char> = None;

        while let Some(c) = self.peek() {
            if closing.is_none() && stops.contains(c) {
                break;
            }
            self.bump();
            match closing {
                Some(q) if c == q => closing = None,
                Some(_) => value.push(c),
                None if c.is_whitespace() => space.push(c),
                None if c == '\'' || c == '"' || c == '[' => {
                    closing = Some(if c == '[' { ']' } else { c });
                    space.clear();
                }
                None => {
                    let c = if c == '\\' {
                        match self.chars.next() {
                            Some(escaped) => escaped,
                            None => break,
                        }
                    } else {
                        c
                    };
                    if !value.is_empty() {
                        value.push_str(&space);
                    }
                    space.clear();
                    value.push(c);
                }
            }
        }
        value
    }
}

#[derive(Default)]
struct Groups {
    groups: Vec<OptionGroup>,
}

impl Groups {
    /// Store `group.attr=value`. `a.b.c` is group `a.b`, attribute `c`.
    fn keep(&mut self, name: &str, value: String) -> Result<()> {
        if name.is_empty() || value.is_empty() {
            return Ok(());
        }
        let first = name
            .find('.')
            .ok_or_else(|| EngineError::config(format!("option '{}' has no group", name)))?;
        let split = name[first + 1..].find('.').map(|p| first + 1 + p).unwrap_or(first);
        if split == 0 || split + 1 >= name.len() {
            return Err(EngineError::config(format!("malformed option name '{}'", name)));
        }
        let (group, attribute) = (&name[..split], &name[split + 1..]);

        let index = match self.groups.iter().position(|g| g.name == group) {
            Some(i) => i,
            None => {
                self.groups.push(OptionGroup {
                    name: group.to_string(),
                    attributes: BTreeMap::new(),
                });
                self.groups.len() - 1
            }
        };
        self.groups[index].attributes.insert(attribute.to_string(), value);
        Ok(())
    }
}

/// Split an option string into groups, in order of first appearance
pub fn parse_options(s: &str) -> Result<Vec<OptionGroup>> {
    let mut cursor = Cursor { chars: s.chars().peekable() };
    let mut groups = Groups::default();

    while cursor.peek().is_some() {
        let name = cursor.read_until(":=;");
        match cursor.peek() {
            Some('=') => {
                cursor.bump();
                let value = cursor.read_until(";");
                groups.keep(&name, value)?;
            }
            Some(':') => {
                while matches!(cursor.peek(), Some(c) if c != ';') {
                    cursor.bump();
                    let sub = cursor.read_until("=,;");
                    if cursor.peek() == Some('=') {
                        cursor.bump();
                        let value = cursor.read_until(",;");
                        groups.keep(&format!("{}.{}", name, sub), value)?;
                    } else {
                        groups.keep(&format!("{}.name", name), sub)?;
                    }
                }
            }
            Some(';') => {
                cursor.bump();
                if !name.is_empty() {
                    return Err(EngineError::config(format!("option '{}' has no value", name)));
                }
            }
            _ => {
                if !name.is_empty() {
                    return Err(EngineError::config(format!("option '{}' has no value", name)));
                }
                break;
            }
        }
    }

    Ok(groups.groups)
}

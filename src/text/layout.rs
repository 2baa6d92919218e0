//! Text layout shared by print and measure
//!
//! Lines break at `\n`. With a box width, words wrap greedily: a word
//! that does not fit moves to the next line, a word wider than the box
//! is broken by character, and spaces at a wrap point are dropped. With
//! a box height, lines that do not fit are cut. Both `print` and
//! `measure` go through `TextLayout::new`, so their sizes always agree.

use unicode_width::UnicodeWidthChar;

use crate::core::{Color, Size};

use super::markup::Token;

pub const ALIGN_DEFAULT: i32 = 0;
pub const ALIGN_LEFT: i32 = 1;
pub const ALIGN_RIGHT: i32 = 2;
pub const ALIGN_CENTER: i32 = 3;
pub const ALIGN_TOP: i32 = 4;
pub const ALIGN_BOTTOM: i32 = 8;
pub const ALIGN_MIDDLE: i32 = 12;

/// One laid-out code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub code: u32,
    /// Cells the cursor moves after this code
    pub advance: i32,
    /// Rows the glyph occupies
    pub rows: i32,
    /// Color set by markup, if any
    pub fg: Option<Color>,
    /// Background set by markup, if any
    pub bg: Option<Color>,
    /// Drawn in the previous code's cell
    pub combine: bool,
}

impl Item {
    fn is_space(&self) -> bool {
        self.code == 0x20 && !self.combine
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub items: Vec<Item>,
    pub width: i32,
    pub height: i32,
}

impl Line {
    fn push(&mut self, item: Item) {
        self.width += item.advance;
        self.height = self.height.max(item.rows);
        self.items.push(item);
    }

    fn trim_end(&mut self) {
        while self.items.last().map(|i| i.is_space()).unwrap_or(false) {
            if let Some(item) = self.items.pop() {
                self.width -= item.advance;
            }
        }
    }

    fn finish(mut self) -> Self {
        self.height = self.height.max(1);
        self
    }
}

/// A code positioned in cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub item: Item,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLayout {
    pub lines: Vec<Line>,
    /// Widest line by total height
    pub size: Size,
}

impl TextLayout {
    /// Lay out tokens inside `bounds` (0 = unbounded). `spacing` gives
    /// the cell footprint of a code's glyph.
    pub fn new(tokens: &[Token], spacing: impl Fn(u32) -> Size, bounds: Size) -> Self {
        let mut raw_lines: Vec<Vec<Item>> = Vec::new();
        let mut current: Vec<Item> = Vec::new();
        let mut fg_stack: Vec<Color> = Vec::new();
        let mut bg_stack: Vec<Color> = Vec::new();
        let mut combine_next = false;
        let mut any = false;

        for token in tokens {
            match *token {
                Token::Code(code) => {
                    any = true;
                    let cell = spacing(code);
                    let width = char::from_u32(code).and_then(|c| c.width());
                    let zero_width = width == Some(0) && code != 0;
                    let combine = combine_next || zero_width;
                    combine_next = false;
                    current.push(Item {
                        code,
                        advance: if combine { 0 } else { cell.width.max(width.unwrap_or(1) as i32) },
                        rows: cell.height.max(1),
                        fg: fg_stack.last().copied(),
                        bg: bg_stack.last().copied(),
                        combine,
                    });
                }
                Token::Newline => {
                    any = true;
                    raw_lines.push(std::mem::take(&mut current));
                }
                Token::Color(c) => fg_stack.push(c),
                Token::PopColor => {
                    fg_stack.pop();
                }
                Token::BkColor(c) => bg_stack.push(c),
                Token::PopBkColor => {
                    bg_stack.pop();
                }
                Token::Combine => combine_next = true,
            }
        }
        if !any {
            return Self::default();
        }
        raw_lines.push(current);

        let mut lines = Vec::new();
        for raw in raw_lines {
            if bounds.width > 0 {
                wrap_line(raw, bounds.width, &mut lines);
            } else {
                let mut line = Line::default();
                for item in raw {
                    line.push(item);
                }
                lines.push(line.finish());
            }
        }

        if bounds.height > 0 {
            let mut used = 0;
            let keep = lines
                .iter()
                .take_while(|l| {
                    used += l.height;
                    used <= bounds.height
                })
                .count();
            lines.truncate(keep);
        }

        let size = Size::new(
            lines.iter().map(|l| l.width).max().unwrap_or(0),
            lines.iter().map(|l| l.height).sum(),
        );
        Self { lines, size }
    }

    /// Position every item. Without a box, (x, y) is the anchor that
    /// alignment is relative to; with one, alignment is inside the box.
    pub fn place(&self, x: i32, y: i32, bounds: Size, align: i32) -> Vec<Placement> {
        let vertical = align & ALIGN_MIDDLE;
        let horizontal = align & 3;

        // Coordinates come from the caller; far off-grid text saturates
        // instead of overflowing and is dropped when drawn
        let top = match (vertical, bounds.height > 0) {
            (ALIGN_BOTTOM, true) => y.saturating_add(bounds.height - self.size.height),
            (ALIGN_BOTTOM, false) => y.saturating_sub(self.size.height - 1),
            (ALIGN_MIDDLE, true) => y.saturating_add((bounds.height - self.size.height) / 2),
            (ALIGN_MIDDLE, false) => y.saturating_sub(self.size.height / 2),
            _ => y,
        };

        let mut out = Vec::new();
        let mut row = top;
        for line in &self.lines {
            let left = match (horizontal, bounds.width > 0) {
                (ALIGN_RIGHT, true) => x.saturating_add(bounds.width - line.width),
                (ALIGN_RIGHT, false) => x.saturating_sub(line.width - 1),
                (ALIGN_CENTER, true) => x.saturating_add((bounds.width - line.width) / 2),
                (ALIGN_CENTER, false) => x.saturating_sub(line.width / 2),
                _ => x,
            };

            let mut cursor = left;
            let mut last = left;
            for item in &line.items {
                if item.combine {
                    out.push(Placement { x: last, y: row, item: *item });
                } else {
                    out.push(Placement { x: cursor, y: row, item: *item });
                    last = cursor;
                    cursor = cursor.saturating_add(item.advance);
                }
            }
            row = row.saturating_add(line.height);
        }
        out
    }
}

/// Split a line into alternating runs of spaces and non-spaces.
/// Combining items stay with the run they follow.
fn segments(items: Vec<Item>) -> Vec<Vec<Item>> {
    let mut segs: Vec<Vec<Item>> = Vec::new();
    for item in items {
        let start_new = match segs.last().and_then(|s| s.first()) {
            Some(first) => !item.combine && first.is_space() != item.is_space(),
            None => true,
        };
        if start_new {
            segs.push(vec![item]);
        } else if let Some(seg) = segs.last_mut() {
            seg.push(item);
        }
    }
    segs
}

fn wrap_line(items: Vec<Item>, max_width: i32, lines: &mut Vec<Line>) {
    let mut current = Line::default();

    for seg in segments(items) {
        let seg_width: i32 = seg.iter().map(|i| i.advance).sum();
        let is_space = seg.first().map(|i| i.is_space()).unwrap_or(false);

        if current.width + seg_width > max_width {
            if current.width > 0 {
                current.trim_end();
                lines.push(std::mem::take(&mut current).finish());
            }

            // Skip spaces at the start of a wrapped line
            if is_space {
                continue;
            }

            // Word wider than the box: break it by character
            if seg_width > max_width {
                for item in seg {
                    if current.width + item.advance > max_width && current.width > 0 {
                        lines.push(std::mem::take(&mut current).finish());
                    }
                    current.push(item);
                }
                continue;
            }
        }

        for item in seg {
            current.push(item);
        }
    }

    lines.push(current.finish());
}

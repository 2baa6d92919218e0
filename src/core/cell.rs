//! Cell - The fundamental display unit
//!
//! Each cell of a layer holds:
//! - A background color
//! - A stack of leaves (glyphs drawn on top of each other)
//!
//! A leaf carries the codepoint, its tint, an optional multi-cell span
//! and optional per-corner pixel offsets.

use serde::{Deserialize, Serialize};

use super::color::Color;

/// Per-corner pixel offsets: top-left, top-right, bottom-right, bottom-left
pub type Corners = [(i32, i32); 4];

/// One glyph placed in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    /// Codepoint (or tile code) to draw
    pub code: u32,
    /// Foreground tint
    pub color: Color,
    /// Cells the glyph is stretched over; `None` draws it at natural size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<(i32, i32)>,
    /// Corner displacement of the destination quad
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corners: Option<Corners>,
}

impl Leaf {
    pub fn new(code: u32, color: Color) -> Self {
        Self {
            code,
            color,
            span: None,
            corners: None,
        }
    }

    /// True when the glyph needs the scaled/warped drawing path
    pub fn is_extended(&self) -> bool {
        self.span.is_some() || self.corners.is_some()
    }
}

/// A single layer cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Glyph stack, bottom first
    pub leaves: Vec<Leaf>,
    /// Background color
    pub bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Color::TRANSPARENT)
    }
}

impl Cell {
    /// An empty cell with the given background
    pub fn blank(bg: Color) -> Self {
        Self {
            leaves: Vec::new(),
            bg,
        }
    }

    /// True when no glyph has been placed
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Topmost glyph
    pub fn top(&self) -> Option<&Leaf> {
        self.leaves.last()
    }

    /// Replace the stack with a single leaf
    pub fn replace(&mut self, leaf: Leaf) {
        self.leaves.clear();
        self.leaves.push(leaf);
    }

    /// Add a leaf on top of the stack
    pub fn stack(&mut self, leaf: Leaf) {
        self.leaves.push(leaf);
    }

    /// Clear the cell to the given background
    pub fn clear(&mut self, bg: Color) {
        self.leaves.clear();
        self.bg = bg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_replace_and_stack() {
        let mut cell = Cell::blank(Color::BLACK);
        cell.replace(Leaf::new('a' as u32, Color::WHITE));
        cell.replace(Leaf::new('b' as u32, Color::WHITE));
        assert_eq!(cell.leaves.len(), 1);
        cell.stack(Leaf::new('_' as u32, Color::WHITE));
        assert_eq!(cell.leaves.len(), 2);
        assert_eq!(cell.top().map(|l| l.code), Some('_' as u32));
    }

    #[test]
    fn test_cell_clear() {
        let mut cell = Cell::default();
        cell.stack(Leaf::new('x' as u32, Color::WHITE));
        cell.clear(Color::BLACK);
        assert!(cell.is_empty());
        assert_eq!(cell.bg, Color::BLACK);
    }
}

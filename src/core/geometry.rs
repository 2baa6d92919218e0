//! Geometry primitives
//!
//! Sizes, points and rectangles in cell or pixel units, plus the
//! `WxH` notation used throughout option strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width and height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Number of units covered (0 for degenerate sizes)
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Parse `WxH` (e.g. `80x25`). Both parts must be plain integers.
    pub fn parse(s: &str) -> Option<Size> {
        let (w, h) = s.trim().split_once(['x', 'X'])?;
        let w = w.trim().parse::<i32>().ok()?;
        let h = h.trim().parse::<i32>().ok()?;
        Some(Size::new(w, h))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::ops::Mul for Size {
    type Output = Size;

    fn mul(self, rhs: Size) -> Size {
        Size::new(self.width * rhs.width, self.height * rhs.height)
    }
}

/// A position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Overlapping part of two rectangles (empty when disjoint)
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        Rect::new(x, y, r.saturating_sub(x).max(0), b.saturating_sub(y).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_parse() {
        assert_eq!(Size::parse("80x25"), Some(Size::new(80, 25)));
        assert_eq!(Size::parse(" 8X16 "), Some(Size::new(8, 16)));
        assert_eq!(Size::parse("abc"), None);
        assert_eq!(Size::parse("80x"), None);
        assert_eq!(Size::parse("x25"), None);
    }

    #[test]
    fn test_size_display() {
        assert_eq!(Size::new(80, 25).to_string(), "80x25");
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Rect::new(5, 5, 5, 5));
        assert!(a.intersection(&Rect::new(20, 20, 2, 2)).is_empty());
        assert!(a.contains(9, 9));
        assert!(!a.contains(10, 0));
    }

    #[test]
    fn test_rect_edges_saturate() {
        let wide = Rect::new(1, 0, i32::MAX, 1);
        assert_eq!(wide.right(), i32::MAX);
        assert!(wide.contains(1_000_000, 0));
        let grid = Rect::new(0, 0, 80, 25);
        assert_eq!(wide.intersection(&grid), Rect::new(1, 0, 79, 1));
        let far = Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(far.intersection(&Rect::new(i32::MIN, i32::MIN, 1, 1)), Rect::new(i32::MIN, i32::MIN, 1, 1));
    }
}

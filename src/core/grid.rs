//! Cell Grid - One layer's display buffer
//!
//! A 2D array of cells in row-major order. Every accessor is
//! bounds-checked; writes outside the grid are ignored.

use super::cell::{Cell, Leaf};
use super::color::Color;
use super::geometry::{Rect, Size};

/// A 2D array of layer cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Grid width in columns
    pub cols: usize,
    /// Grid height in rows
    pub rows: usize,
    /// Background given to cleared cells
    blank_bg: Color,
    /// The cell buffer (row-major order)
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a new grid whose cells start with `blank_bg`
    pub fn new(size: Size, blank_bg: Color) -> Self {
        let cols = size.width.max(0) as usize;
        let rows = size.height.max(0) as usize;
        Self {
            cols,
            rows,
            blank_bg,
            cells: vec![Cell::blank(blank_bg); cols * rows],
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.cols as i32, self.rows as i32)
    }

    pub fn blank_bg(&self) -> Color {
        self.blank_bg
    }

    /// Get the index for a position
    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows {
            Some(y as usize * self.cols + x as usize)
        } else {
            None
        }
    }

    /// Get a reference to a cell
    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Get a mutable reference to a cell
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.index(x, y).map(|i| &mut self.cells[i])
    }

    /// Place a leaf, replacing the stack or stacking on top
    pub fn put(&mut self, x: i32, y: i32, leaf: Leaf, stack: bool) {
        if let Some(cell) = self.get_mut(x, y) {
            if stack {
                cell.stack(leaf);
            } else {
                cell.replace(leaf);
            }
        }
    }

    /// Set a cell's background
    pub fn set_bg(&mut self, x: i32, y: i32, bg: Color) {
        if let Some(cell) = self.get_mut(x, y) {
            cell.bg = bg;
        }
    }

    /// Clear the entire grid, giving cells a new blank background
    pub fn clear_with(&mut self, bg: Color) {
        self.blank_bg = bg;
        for cell in &mut self.cells {
            cell.clear(bg);
        }
    }

    /// Clear the part of `area` that lies on the grid
    pub fn clear_area(&mut self, area: Rect, bg: Color) {
        let area = area.intersection(&Rect::from_size(self.size()));
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                if let Some(cell) = self.get_mut(x, y) {
                    cell.clear(bg);
                }
            }
        }
    }

    /// Copy contents from another grid of the same size
    pub fn copy_from(&mut self, other: &Grid) {
        if self.cols == other.cols && self.rows == other.rows {
            self.blank_bg = other.blank_bg;
            self.cells.clone_from(&other.cells);
        }
    }

    /// Resize the grid; content is discarded
    pub fn resize(&mut self, size: Size) {
        *self = Grid::new(size, self.blank_bg);
    }

    /// Iterate over all cells with positions
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &Cell)> {
        let cols = self.cols.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i % cols) as i32, (i / cols) as i32, cell))
    }
}

//! Renderer Module
//!
//! The compositor turns the front scene into a `Frame`; surfaces
//! present frames somewhere (memory, an ANSI terminal, network viewers).

pub mod ansi;
pub mod compose;
pub mod headless;

pub use ansi::{AnsiEncoder, AnsiSurface};
pub use compose::Renderer;
pub use headless::{FrameHandle, HeadlessSurface};

use crate::core::{Color, Size};
use crate::error::Result;
use crate::font::Bitmap;

/// What a text surface needs to know about one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCell {
    /// Topmost visible code, 0 when blank
    pub code: u32,
    /// Tint of that code
    pub fg: Color,
    /// Effective background after all layers
    pub bg: Color,
}

impl Default for FrameCell {
    fn default() -> Self {
        Self {
            code: 0,
            fg: Color::TRANSPARENT,
            bg: Color::BLACK,
        }
    }
}

/// One composed picture of the stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Size in cells
    pub size: Size,
    /// Pixel size of a cell
    pub cell_size: Size,
    /// ARGB pixels, `size * cell_size`
    pub pixels: Bitmap,
    /// Per-cell summary in row-major order
    pub cells: Vec<FrameCell>,
}

impl Frame {
    pub fn cell(&self, x: i32, y: i32) -> Option<&FrameCell> {
        if x < 0 || y < 0 || x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.cells.get((y * self.size.width + x) as usize)
    }
}

/// Where frames end up
pub trait Surface: Send {
    /// Surface name
    fn name(&self) -> &str;

    /// Prepare for a stage of `size` cells of `cell_size` pixels
    fn init(&mut self, title: &str, size: Size, cell_size: Size) -> Result<()>;

    /// Show a frame
    fn present(&mut self, frame: &Frame) -> Result<()>;

    /// Change the window title
    fn set_title(&mut self, title: &str);

    /// Release the surface
    fn shutdown(&mut self);
}

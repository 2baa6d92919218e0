//! ANSI Truecolor Surface
//!
//! Shows frames on ANSI terminals using the per-cell summary:
//! - 24-bit SGR colors (38;2 / 48;2)
//! - Incremental updates against the previously sent frame
//! - Hidden cursor, window title via OSC, SGR mouse reporting

use std::fmt::Write as _;
use std::io::Write;

use bytes::{Bytes, BytesMut};
use unicode_width::UnicodeWidthChar;

use crate::core::{Color, Size};
use crate::error::Result;

use super::{Frame, FrameCell, Surface};

/// ANSI escape sequences
const CSI: &str = "\x1b[";

/// Encodes frames as ANSI byte streams
pub struct AnsiEncoder {
    size: Size,
    previous: Option<Vec<FrameCell>>,
    /// Track current colors to minimize escape codes
    current_fg: Option<Color>,
    current_bg: Option<Color>,
}

impl AnsiEncoder {
    pub fn new() -> Self {
        Self {
            size: Size::default(),
            previous: None,
            current_fg: None,
            current_bg: None,
        }
    }

    /// Forget what the terminal shows; the next frame is sent in full
    pub fn reset(&mut self) {
        self.previous = None;
        self.current_fg = None;
        self.current_bg = None;
    }

    /// Hide the cursor, clear, enable mouse reporting
    pub fn init(&mut self) -> Bytes {
        self.reset();
        // Any-motion tracking with SGR extended coordinates
        Bytes::from(format!("{CSI}?25l{CSI}2J{CSI}H{CSI}0m{CSI}?1003h{CSI}?1006h"))
    }

    /// Undo everything `init` did
    pub fn shutdown(&self) -> Bytes {
        Bytes::from(format!(
            "{CSI}?1003l{CSI}?1006l{CSI}0m{CSI}?25h{CSI}2J{CSI}H"
        ))
    }

    pub fn title(&self, title: &str) -> Bytes {
        let clean: String = title.chars().filter(|c| !c.is_control()).collect();
        Bytes::from(format!("\x1b]0;{}\x07", clean))
    }

    fn sgr(&mut self, out: &mut BytesMut, fg: Color, bg: Color) {
        let mut codes = Vec::new();
        if self.current_fg != Some(fg) {
            codes.push(format!("38;2;{};{};{}", fg.r(), fg.g(), fg.b()));
        }
        if self.current_bg != Some(bg) {
            codes.push(format!("48;2;{};{};{}", bg.r(), bg.g(), bg.b()));
        }
        self.current_fg = Some(fg);
        self.current_bg = Some(bg);
        if !codes.is_empty() {
            let _ = write!(out, "{}{}m", CSI, codes.join(";"));
        }
    }

    /// Character and width to print for a cell
    fn glyph(cell: &FrameCell) -> (char, usize) {
        match char::from_u32(cell.code) {
            Some(c) if !c.is_control() && cell.code != 0 && !cell.fg.is_transparent() => match c.width() {
                Some(w @ 1..=2) => (c, w),
                _ => (' ', 1),
            },
            _ => (' ', 1),
        }
    }

    fn render_cell(&mut self, out: &mut BytesMut, cell: &FrameCell) -> usize {
        let bg = cell.bg.over(Color::BLACK);
        let fg = cell.fg.over(bg);
        self.sgr(out, fg, bg);
        let (c, width) = Self::glyph(cell);
        out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
        width
    }

    /// Encode a frame; only changed cells are sent when the previous
    /// frame had the same size
    pub fn render(&mut self, frame: &Frame) -> Bytes {
        let full = match &self.previous {
            Some(prev) => self.size != frame.size || prev.len() != frame.cells.len(),
            None => true,
        };
        let previous = if full { None } else { self.previous.take() };
        self.size = frame.size;

        let mut out = BytesMut::with_capacity(frame.cells.len() * 8);
        if full {
            self.current_fg = None;
            self.current_bg = None;
            let _ = write!(out, "{}0m{}2J", CSI, CSI);
        }

        let cols = frame.size.width.max(0) as usize;
        for y in 0..frame.size.height.max(0) as usize {
            let mut cursor: Option<usize> = None;
            let mut x = 0;
            while x < cols {
                let index = y * cols + x;
                let cell = &frame.cells[index];
                let changed = previous.as_ref().map(|p| p[index] != *cell).unwrap_or(true);
                if !changed {
                    x += 1;
                    continue;
                }
                if cursor != Some(x) {
                    let _ = write!(out, "{}{};{}H", CSI, y + 1, x + 1);
                }
                let width = self.render_cell(&mut out, cell);
                x += width;
                cursor = Some(x);
            }
        }

        self.previous = Some(frame.cells.clone());
        out.freeze()
    }
}

impl Default for AnsiEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Surface writing ANSI output to any writer, e.g. stdout
pub struct AnsiSurface<W: Write + Send> {
    out: W,
    encoder: AnsiEncoder,
}

impl<W: Write + Send> AnsiSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            encoder: AnsiEncoder::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Surface for AnsiSurface<W> {
    fn name(&self) -> &str {
        "ansi"
    }

    fn init(&mut self, title: &str, _size: Size, _cell_size: Size) -> Result<()> {
        let init = self.encoder.init();
        self.out.write_all(&init)?;
        self.out.write_all(&self.encoder.title(title))?;
        self.out.flush()?;
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        let bytes = self.encoder.render(frame);
        self.out.write_all(&bytes)?;
        self.out.flush()?;
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        let _ = self.out.write_all(&self.encoder.title(title));
    }

    fn shutdown(&mut self) {
        let _ = self.out.write_all(&self.encoder.shutdown());
        let _ = self.out.flush();
    }
}

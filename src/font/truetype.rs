//! TrueType tileset
//!
//! Outline fonts rasterized on demand with fontdue. `size=N` picks an
//! N pixel font and derives the cell from its metrics; `size=WxH` fixes
//! the cell and scales the font to fit its height.

use std::path::Path;

use fontdue::{Font, FontSettings};
use log::info;

use crate::core::{Color, Point, Size};
use crate::error::{EngineError, Result};
use crate::text::Encoding;

use super::bitmap::Bitmap;
use super::tileset::{RasterGlyph, RasterMode, Tileset, TilesetSpec};

pub struct TrueTypeTileset {
    font: Font,
    px: f32,
    ascent: i32,
    tile: Size,
    spacing: Size,
    base: u32,
    codepage: Encoding,
    mode: RasterMode,
}

impl TrueTypeTileset {
    pub fn load(path: &Path, spec: &TilesetSpec) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| EngineError::font(format!("cannot read '{}': {}", path.display(), e)))?;
        let tileset = Self::from_bytes(&data, spec)
            .map_err(|e| EngineError::font(format!("'{}': {}", path.display(), e)))?;
        info!(
            "Loaded TrueType tileset '{}' at {:.1}px, cell {}",
            path.display(),
            tileset.px,
            tileset.tile
        );
        Ok(tileset)
    }

    pub fn from_bytes(data: &[u8], spec: &TilesetSpec) -> std::result::Result<Self, String> {
        let font = Font::from_bytes(data, FontSettings::default()).map_err(|e| e.to_string())?;
        let requested = spec.size.ok_or("missing size")?;

        let line_height = |px: f32| {
            font.horizontal_line_metrics(px)
                .map(|m| m.new_line_size)
                .unwrap_or(px)
        };

        let (px, tile) = if requested.width == 0 {
            let px = requested.height as f32;
            let width = font.metrics('M', px).advance_width.ceil() as i32;
            (px, Size::new(width.max(1), line_height(px).ceil() as i32))
        } else {
            let h = requested.height as f32;
            let px = h * h / line_height(h).max(1.0);
            (px, requested)
        };

        let ascent = font
            .horizontal_line_metrics(px)
            .map(|m| m.ascent.round() as i32)
            .unwrap_or(tile.height);

        Ok(Self {
            font,
            px,
            ascent,
            tile,
            spacing: spec.spacing,
            base: spec.base,
            codepage: spec.codepage,
            mode: spec.mode,
        })
    }

    /// Character in the font that draws `code`
    fn char_for(&self, code: u32) -> Option<char> {
        let code = if self.base == 0 {
            code
        } else {
            self.codepage.tile_code(code.checked_sub(self.base)?)
        };
        char::from_u32(code)
    }
}

impl Tileset for TrueTypeTileset {
    fn kind(&self) -> &'static str {
        "truetype"
    }

    fn bounding_box(&self) -> Size {
        self.tile
    }

    fn spacing(&self) -> Size {
        self.spacing
    }

    fn provides(&self, code: u32) -> bool {
        self.char_for(code)
            .map(|c| c == ' ' || self.font.lookup_glyph_index(c) != 0)
            .unwrap_or(false)
    }

    fn rasterize(&mut self, code: u32) -> Option<RasterGlyph> {
        let ch = self.char_for(code)?;
        let (metrics, coverage) = self.font.rasterize(ch, self.px);

        let size = Size::new(metrics.width as i32, metrics.height as i32);
        let pixels = coverage
            .iter()
            .map(|&c| {
                let alpha = match self.mode {
                    RasterMode::Monochrome if c >= 128 => 255,
                    RasterMode::Monochrome => 0,
                    RasterMode::Normal => c,
                };
                Color::WHITE.with_alpha(alpha)
            })
            .collect();
        let bitmap = Bitmap::from_pixels(size, pixels)?;

        // Baseline sits `ascent` pixels below the cell top
        let offset = Point::new(metrics.xmin, self.ascent - metrics.height as i32 - metrics.ymin);
        Some(RasterGlyph { bitmap, offset })
    }
}

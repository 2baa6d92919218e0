//! Bitmap tileset
//!
//! A PNG tile sheet cut into equal tiles. Tile `i` draws code
//! `base + i`, or for the base font the code the sheet's codepage
//! assigns to index `i`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::info;

use crate::core::{Color, Point, Rect, Size};
use crate::error::{EngineError, Result};
use crate::text::Encoding;

use super::bitmap::Bitmap;
use super::tileset::{RasterGlyph, Tileset, TilesetSpec, Transparency};

pub struct SheetTileset {
    sheet: Bitmap,
    tile: Size,
    spacing: Size,
    base: u32,
    codepage: Encoding,
    columns: i32,
    count: u32,
}

impl SheetTileset {
    pub fn load(path: &Path, spec: &TilesetSpec) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| EngineError::font(format!("cannot open '{}': {}", path.display(), e)))?;
        let sheet = decode_png(BufReader::new(file))
            .map_err(|e| EngineError::font(format!("cannot decode '{}': {}", path.display(), e)))?;
        let tileset = Self::from_bitmap(sheet, spec)?;
        info!(
            "Loaded bitmap tileset '{}': {} tiles of {}",
            path.display(),
            tileset.count,
            tileset.tile
        );
        Ok(tileset)
    }

    pub fn from_bitmap(mut sheet: Bitmap, spec: &TilesetSpec) -> Result<Self> {
        let tile = spec
            .size
            .filter(|s| s.width > 0 && s.height > 0)
            .ok_or_else(|| EngineError::config("bitmap tileset requires size=WxH"))?;
        if sheet.width() < tile.width || sheet.height() < tile.height {
            return Err(EngineError::font(format!(
                "tile size {} exceeds image size {}",
                tile,
                sheet.size()
            )));
        }

        match spec.transparent {
            Transparency::Alpha => {}
            Transparency::Auto => {
                let key = sheet.get(0, 0);
                sheet.key_out(key);
            }
            Transparency::Key(key) => sheet.key_out(key),
        }

        let columns = sheet.width() / tile.width;
        let rows = sheet.height() / tile.height;
        Ok(Self {
            sheet,
            tile,
            spacing: spec.spacing,
            base: spec.base,
            codepage: spec.codepage,
            columns,
            count: (columns * rows) as u32,
        })
    }

    fn index_of(&self, code: u32) -> Option<u32> {
        let index = if self.base == 0 {
            self.codepage.tile_index(code)?
        } else {
            code.checked_sub(self.base)?
        };
        (index < self.count).then_some(index)
    }
}

impl Tileset for SheetTileset {
    fn kind(&self) -> &'static str {
        "bitmap"
    }

    fn bounding_box(&self) -> Size {
        self.tile
    }

    fn spacing(&self) -> Size {
        self.spacing
    }

    fn provides(&self, code: u32) -> bool {
        self.index_of(code).is_some()
    }

    fn rasterize(&mut self, code: u32) -> Option<RasterGlyph> {
        let index = self.index_of(code)? as i32;
        let x = (index % self.columns) * self.tile.width;
        let y = (index / self.columns) * self.tile.height;
        Some(RasterGlyph {
            bitmap: self.sheet.extract(Rect::new(x, y, self.tile.width, self.tile.height)),
            offset: Point::default(),
        })
    }
}

/// Decode any 8-bit-or-less PNG into ARGB pixels
pub fn decode_png<R: Read>(reader: R) -> std::result::Result<Bitmap, png::DecodingError> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    let data = &buf[..frame.buffer_size()];

    let channels = match frame.color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => 3,
    };

    let pixels: Vec<Color> = data
        .chunks_exact(channels)
        .map(|px| match px {
            [l] => Color::rgb(*l, *l, *l),
            [l, a] => Color::from_argb(*a, *l, *l, *l),
            [r, g, b] => Color::rgb(*r, *g, *b),
            [r, g, b, a] => Color::from_argb(*a, *r, *g, *b),
            _ => Color::TRANSPARENT,
        })
        .collect();

    let size = Size::new(frame.width as i32, frame.height as i32);
    Bitmap::from_pixels(size, pixels).ok_or(png::DecodingError::LimitsExceeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Encode a 4x2 sheet of two 2x2 tiles: tile 0 white, tile 1 magenta
    fn sheet_png() -> Vec<u8> {
        let mut data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut data, 4, 2);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            let mut pixels = Vec::new();
            for _y in 0..2 {
                pixels.extend_from_slice(&[255, 255, 255, 255, 255, 255, 255, 255]);
                pixels.extend_from_slice(&[255, 0, 255, 255, 255, 0, 255, 255]);
            }
            writer.write_image_data(&pixels).unwrap();
        }
        data
    }

    fn spec(base: u32, extra: &[(&str, &str)]) -> TilesetSpec {
        let mut attrs: BTreeMap<String, String> = BTreeMap::new();
        attrs.insert("name".into(), "sheet.png".into());
        attrs.insert("size".into(), "2x2".into());
        for (k, v) in extra {
            attrs.insert(k.to_string(), v.to_string());
        }
        TilesetSpec::parse(base, &attrs).unwrap()
    }

    #[test]
    fn test_decode_png() {
        let bmp = decode_png(sheet_png().as_slice()).unwrap();
        assert_eq!(bmp.size(), Size::new(4, 2));
        assert_eq!(bmp.get(0, 0), Color::WHITE);
        assert_eq!(bmp.get(3, 1), Color::rgb(255, 0, 255));
    }

    #[test]
    fn test_tiles_at_base() {
        let bmp = decode_png(sheet_png().as_slice()).unwrap();
        let mut t = SheetTileset::from_bitmap(bmp, &spec(0xE000, &[])).unwrap();
        assert!(t.provides(0xE000));
        assert!(t.provides(0xE001));
        assert!(!t.provides(0xE002));
        assert!(!t.provides(0x41));
        let glyph = t.rasterize(0xE001).unwrap();
        assert_eq!(glyph.bitmap.get(0, 0), Color::rgb(255, 0, 255));
    }

    #[test]
    fn test_color_key() {
        let bmp = decode_png(sheet_png().as_slice()).unwrap();
        let mut t = SheetTileset::from_bitmap(bmp, &spec(0xE000, &[("transparent", "#FF00FF")])).unwrap();
        let glyph = t.rasterize(0xE001).unwrap();
        assert_eq!(glyph.bitmap.get(0, 0), Color::TRANSPARENT);
        let glyph = t.rasterize(0xE000).unwrap();
        assert_eq!(glyph.bitmap.get(0, 0), Color::WHITE);
    }

    #[test]
    fn test_tile_larger_than_sheet() {
        let bmp = Bitmap::new(Size::new(1, 1), Color::WHITE);
        assert!(SheetTileset::from_bitmap(bmp, &spec(0, &[])).is_err());
    }
}

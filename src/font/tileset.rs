//! Tilesets - Sources of glyph bitmaps
//!
//! A tileset is configured from an option group (`font: ...` or
//! `0xE000: ...`) and provides glyphs for a set of codes. Loading a
//! tileset can fail; once loaded, rasterizing is infallible per code.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::{Color, Point, Size};
use crate::error::{EngineError, Result};
use crate::text::Encoding;

use super::bitmap::Bitmap;
use super::dynamic::DynamicTileset;
use super::sheet::SheetTileset;
use super::truetype::TrueTypeTileset;

/// Tile size of the built-in default font
pub const DEFAULT_TILE: Size = Size::new(8, 16);

/// A glyph rendered by a tileset, positioned relative to its cell
#[derive(Debug, Clone)]
pub struct RasterGlyph {
    pub bitmap: Bitmap,
    pub offset: Point,
}

/// A source of glyph bitmaps
pub trait Tileset: Send {
    /// Short type name ("dynamic", "bitmap", "truetype")
    fn kind(&self) -> &'static str;

    /// Pixel size of one tile
    fn bounding_box(&self) -> Size;

    /// Cells a glyph from this tileset occupies
    fn spacing(&self) -> Size;

    /// Whether the tileset has a glyph for `code`
    fn provides(&self, code: u32) -> bool;

    /// Render the glyph for `code`
    fn rasterize(&mut self, code: u32) -> Option<RasterGlyph>;
}

/// Where a tileset comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilesetSource {
    Default,
    Dynamic,
    None,
    Bitmap(PathBuf),
    TrueType(PathBuf),
}

/// Color keying for bitmap sheets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transparency {
    /// Keep the image's alpha channel
    Alpha,
    /// Key out the color of the top-left pixel
    Auto,
    Key(Color),
}

/// Rasterization mode for outline fonts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RasterMode {
    #[default]
    Normal,
    Monochrome,
}

/// A validated tileset configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetSpec {
    pub base: u32,
    pub source: TilesetSource,
    pub size: Option<Size>,
    pub spacing: Size,
    pub codepage: Encoding,
    pub transparent: Transparency,
    pub mode: RasterMode,
    /// Attributes as given, for readback
    pub attributes: BTreeMap<String, String>,
}

const ATTRIBUTES: [&str; 6] = ["name", "size", "spacing", "codepage", "transparent", "mode"];

impl TilesetSpec {
    /// Validate the attributes of a font group. The nameless value is
    /// stored under `name`.
    pub fn parse(base: u32, attributes: &BTreeMap<String, String>) -> Result<Self> {
        if let Some(unknown) = attributes.keys().find(|k| !ATTRIBUTES.contains(&k.as_str())) {
            return Err(EngineError::config(format!("unknown font attribute '{}'", unknown)));
        }

        let name = attributes.get("name").map(|s| s.trim()).unwrap_or("default");
        let source = match name.to_ascii_lowercase().as_str() {
            "" | "default" => TilesetSource::Default,
            "dynamic" => TilesetSource::Dynamic,
            "none" => TilesetSource::None,
            lower if lower.ends_with(".ttf") || lower.ends_with(".otf") => {
                TilesetSource::TrueType(PathBuf::from(name))
            }
            lower if lower.ends_with(".png") => TilesetSource::Bitmap(PathBuf::from(name)),
            _ => return Err(EngineError::font(format!("unsupported tileset source '{}'", name))),
        };

        if base == 0 && source == TilesetSource::None {
            return Err(EngineError::config("the base font cannot be removed"));
        }

        let size = match attributes.get("size") {
            None => None,
            Some(v) => Some(parse_tile_size(v, &source)?),
        };

        let spacing = match attributes.get("spacing") {
            None => Size::new(1, 1),
            Some(v) => Size::parse(v)
                .filter(|s| s.width >= 1 && s.height >= 1)
                .ok_or_else(|| EngineError::config(format!("invalid font spacing '{}'", v)))?,
        };

        let codepage = match attributes.get("codepage") {
            None => Encoding::Utf8,
            Some(v) => Encoding::from_name(v)
                .ok_or_else(|| EngineError::config(format!("unknown codepage '{}'", v)))?,
        };

        let transparent = match attributes.get("transparent").map(|s| s.trim()) {
            None => Transparency::Alpha,
            Some("auto") => Transparency::Auto,
            Some(v) => Transparency::Key(
                Color::parse(v).ok_or_else(|| EngineError::config(format!("invalid transparent color '{}'", v)))?,
            ),
        };

        let mode = match attributes.get("mode").map(|s| s.trim()) {
            None | Some("normal") => RasterMode::Normal,
            Some("monochrome") => RasterMode::Monochrome,
            Some(v) => return Err(EngineError::config(format!("unknown font mode '{}'", v))),
        };

        match &source {
            TilesetSource::Bitmap(_) | TilesetSource::Dynamic | TilesetSource::TrueType(_) if size.is_none() => {
                return Err(EngineError::config(format!("font '{}' requires a size", name)));
            }
            _ => {}
        }

        Ok(Self {
            base,
            source,
            size,
            spacing,
            codepage,
            transparent,
            mode,
            attributes: attributes.clone(),
        })
    }

    /// Load the tileset. `Ok(None)` means the source is `none`.
    pub fn load(&self) -> Result<Option<Box<dyn Tileset>>> {
        let tileset: Box<dyn Tileset> = match &self.source {
            TilesetSource::None => return Ok(None),
            TilesetSource::Default => Box::new(DynamicTileset::new(self.size.unwrap_or(DEFAULT_TILE), self.spacing)),
            TilesetSource::Dynamic => Box::new(DynamicTileset::new(self.size.unwrap_or(DEFAULT_TILE), self.spacing)),
            TilesetSource::Bitmap(path) => Box::new(SheetTileset::load(path, self)?),
            TilesetSource::TrueType(path) => Box::new(TrueTypeTileset::load(path, self)?),
        };
        Ok(Some(tileset))
    }
}

/// `WxH`, or for outline fonts a bare pixel height
fn parse_tile_size(value: &str, source: &TilesetSource) -> Result<Size> {
    let parsed = match (Size::parse(value), source) {
        (Some(s), _) => Some(s),
        (None, TilesetSource::TrueType(_)) => value.trim().parse::<i32>().ok().map(|h| Size::new(0, h)),
        _ => None,
    };
    parsed
        .filter(|s| s.width >= 0 && s.height > 0 && s.width <= 256 && s.height <= 256)
        .ok_or_else(|| EngineError::config(format!("invalid font size '{}'", value)))
}

/// Parse a base code group name: `font` is 0, otherwise `0xE000`,
/// `U+E000` or a decimal code.
pub fn parse_base_code(group: &str) -> Option<u32> {
    let g = group.trim();
    if g == "font" {
        return Some(0);
    }
    if let Some(hex) = g.strip_prefix("0x").or_else(|| g.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = g.strip_prefix("U+").or_else(|| g.strip_prefix("u+")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()) {
        return g.parse().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_default() {
        let spec = TilesetSpec::parse(0, &attrs(&[("name", "default")])).unwrap();
        assert_eq!(spec.source, TilesetSource::Default);
        assert_eq!(spec.spacing, Size::new(1, 1));
    }

    #[test]
    fn test_parse_bitmap_requires_size() {
        let err = TilesetSpec::parse(0, &attrs(&[("name", "tiles.png")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        let spec = TilesetSpec::parse(
            0xE000,
            &attrs(&[("name", "tiles.png"), ("size", "16x16"), ("spacing", "2x2"), ("transparent", "auto")]),
        )
        .unwrap();
        assert_eq!(spec.size, Some(Size::new(16, 16)));
        assert_eq!(spec.spacing, Size::new(2, 2));
        assert_eq!(spec.transparent, Transparency::Auto);
    }

    #[test]
    fn test_parse_truetype_size() {
        let spec = TilesetSpec::parse(0, &attrs(&[("name", "Mono.ttf"), ("size", "12")])).unwrap();
        assert_eq!(spec.size, Some(Size::new(0, 12)));
    }

    #[test]
    fn test_parse_rejects() {
        assert!(TilesetSpec::parse(0, &attrs(&[("name", "none")])).is_err());
        assert!(TilesetSpec::parse(0, &attrs(&[("name", "font.bdf")])).is_err());
        assert!(TilesetSpec::parse(0, &attrs(&[("name", "default"), ("bogus", "1")])).is_err());
        assert!(TilesetSpec::parse(0, &attrs(&[("name", "dynamic"), ("size", "0x0")])).is_err());
        assert!(TilesetSpec::parse(0xE000, &attrs(&[("name", "none")])).is_ok());
    }

    #[test]
    fn test_parse_base_code() {
        assert_eq!(parse_base_code("font"), Some(0));
        assert_eq!(parse_base_code("0xE000"), Some(0xE000));
        assert_eq!(parse_base_code("U+E100"), Some(0xE100));
        assert_eq!(parse_base_code("57344"), Some(57344));
        assert_eq!(parse_base_code("window"), None);
    }

    #[test]
    fn test_missing_file_is_font_error() {
        let spec = TilesetSpec::parse(0, &attrs(&[("name", "/nonexistent/tiles.png"), ("size", "8x8")])).unwrap();
        assert!(matches!(spec.load(), Err(EngineError::FontLoad(_))));
    }
}

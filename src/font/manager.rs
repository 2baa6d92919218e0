//! Font Manager - Tileset registry and glyph cache
//!
//! Tilesets are keyed by base code. A code is drawn by the tileset with
//! the highest base that provides it; codes nobody provides get the
//! replacement box. Glyphs are rasterized on first use and packed into
//! the shared atlas. Reconfiguration rebuilds the atlas, so callers must
//! look glyphs up again every frame.
//!
//! The default base font is the procedural tileset, which has no
//! letters or digits: until a bitmap or TrueType `font` is configured,
//! composed frames show ASCII text as replacement boxes. Text surfaces
//! such as the ANSI encoder still show the codes themselves.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};

use crate::core::{Point, Size};
use crate::error::Result;

use super::atlas::{Atlas, AtlasRect};
use super::dynamic::{DynamicTileset, REPLACEMENT};
use super::tileset::{Tileset, TilesetSource, TilesetSpec, Transparency, DEFAULT_TILE};

/// A glyph resident in the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub code: u32,
    pub rect: AtlasRect,
    /// Placement relative to the cell's top-left pixel
    pub offset: Point,
    /// Cells the glyph occupies
    pub spacing: Size,
}

struct Entry {
    spec: TilesetSpec,
    tileset: Box<dyn Tileset>,
}

/// A tileset that loaded successfully but is not yet installed
pub struct PendingTileset {
    base: u32,
    spec: TilesetSpec,
    tileset: Option<Box<dyn Tileset>>,
}

impl PendingTileset {
    /// Cell size this would set when installed as the base font
    pub fn base_cell_size(&self) -> Option<Size> {
        if self.base != 0 {
            return None;
        }
        self.tileset.as_ref().map(|t| t.bounding_box())
    }
}

pub struct FontManager {
    tilesets: BTreeMap<u32, Entry>,
    fallback: DynamicTileset,
    cell_size: Size,
    atlas: Atlas,
    glyphs: HashMap<u32, Glyph>,
}

impl FontManager {
    /// A manager holding only the default base font
    pub fn new() -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), "default".to_string());
        let spec = TilesetSpec {
            base: 0,
            source: TilesetSource::Default,
            size: None,
            spacing: Size::new(1, 1),
            codepage: Default::default(),
            transparent: Transparency::Alpha,
            mode: Default::default(),
            attributes,
        };
        let mut tilesets = BTreeMap::new();
        tilesets.insert(
            0,
            Entry {
                spec,
                tileset: Box::new(DynamicTileset::new(DEFAULT_TILE, Size::new(1, 1))),
            },
        );
        Self {
            tilesets,
            fallback: DynamicTileset::new(DEFAULT_TILE, Size::new(1, 1)),
            cell_size: DEFAULT_TILE,
            atlas: Atlas::new(),
            glyphs: HashMap::new(),
        }
    }

    /// Validate and load a tileset without touching current state.
    /// Attributes of a group without a name are merged over the
    /// tileset already configured at that base.
    pub fn prepare(&self, base: u32, attributes: &BTreeMap<String, String>) -> Result<PendingTileset> {
        let merged = match (attributes.contains_key("name"), self.tilesets.get(&base)) {
            (false, Some(entry)) => {
                let mut merged = entry.spec.attributes.clone();
                merged.extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
                merged
            }
            _ => attributes.clone(),
        };
        let spec = TilesetSpec::parse(base, &merged)?;
        let tileset = spec.load()?;
        Ok(PendingTileset { base, spec, tileset })
    }

    /// Install prepared tilesets and rebuild the atlas
    pub fn apply(&mut self, pending: Vec<PendingTileset>) {
        if pending.is_empty() {
            return;
        }
        for p in pending {
            match p.tileset {
                Some(tileset) => {
                    info!("Tileset at base {:#X}: {} {}", p.base, tileset.kind(), tileset.bounding_box());
                    self.tilesets.insert(p.base, Entry { spec: p.spec, tileset });
                }
                None => {
                    info!("Tileset at base {:#X} removed", p.base);
                    self.tilesets.remove(&p.base);
                }
            }
        }
        self.invalidate();
    }

    /// Pixel size of a cell as derived from the base tileset
    pub fn base_cell_size(&self) -> Size {
        self.tilesets
            .get(&0)
            .map(|e| e.tileset.bounding_box())
            .unwrap_or(DEFAULT_TILE)
    }

    /// Cell size used for drawing; sizes the replacement glyph
    pub fn set_cell_size(&mut self, size: Size) {
        if size != self.cell_size {
            self.cell_size = size;
            self.fallback = DynamicTileset::new(size, Size::new(1, 1));
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.glyphs.clear();
        self.atlas.rebuild();
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    /// Configured attribute of the tileset at `base`
    pub fn attribute(&self, base: u32, key: &str) -> Option<String> {
        self.tilesets.get(&base)?.spec.attributes.get(key).cloned()
    }

    /// Spacing of the glyph that would draw `code`, without rasterizing
    pub fn spacing(&self, code: u32) -> Size {
        self.provider(code)
            .map(|e| e.tileset.spacing())
            .unwrap_or(Size::new(1, 1))
    }

    fn provider(&self, code: u32) -> Option<&Entry> {
        self.tilesets.values().rev().find(|e| e.tileset.provides(code))
    }

    /// The glyph drawing `code`, rasterizing it on first use.
    /// Code 0 is blank and has no glyph.
    pub fn glyph(&mut self, code: u32) -> Option<Glyph> {
        if code == 0 {
            return None;
        }
        if let Some(glyph) = self.glyphs.get(&code) {
            return Some(*glyph);
        }

        let base = self
            .tilesets
            .iter()
            .rev()
            .find(|(_, e)| e.tileset.provides(code))
            .map(|(base, _)| *base);

        let (raster, spacing) = match base.and_then(|b| self.tilesets.get_mut(&b)) {
            Some(entry) => (entry.tileset.rasterize(code), entry.tileset.spacing()),
            None => (None, Size::new(1, 1)),
        };
        let raster = match raster {
            Some(r) => r,
            None => {
                debug!("No tileset provides {:#X}, using replacement", code);
                self.fallback.rasterize(REPLACEMENT)?
            }
        };

        let glyph = Glyph {
            code,
            rect: self.atlas.add(&raster.bitmap),
            offset: raster.offset,
            spacing,
        };
        self.glyphs.insert(code, glyph);
        Some(glyph)
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_font() {
        let mut fonts = FontManager::new();
        assert_eq!(fonts.base_cell_size(), Size::new(8, 16));
        assert!(fonts.glyph(0).is_none());
        let g = fonts.glyph('█' as u32).unwrap();
        assert_eq!(g.rect.rect.width, 8);
    }

    #[test]
    fn test_unprovided_code_gets_replacement() {
        let mut fonts = FontManager::new();
        let g = fonts.glyph('A' as u32).unwrap();
        let texture = fonts.atlas().texture();
        assert_eq!(texture.get(g.rect.rect.x + 1, g.rect.rect.y + 1).a(), 255);
    }

    #[test]
    fn test_default_font_draws_ascii_as_replacement() {
        let mut fonts = FontManager::new();
        let letter = fonts.glyph('A' as u32).unwrap();
        let boxed = fonts.glyph(REPLACEMENT).unwrap();
        let texture = fonts.atlas().texture();
        assert_eq!(texture.extract(letter.rect.rect), texture.extract(boxed.rect.rect));
    }

    #[test]
    fn test_glyph_cached_until_reconfigured() {
        let mut fonts = FontManager::new();
        let first = fonts.glyph('█' as u32).unwrap();
        assert_eq!(fonts.glyph('█' as u32).unwrap(), first);

        let pending = fonts.prepare(0, &attrs(&[("name", "dynamic"), ("size", "10x20")])).unwrap();
        fonts.apply(vec![pending]);
        assert!(!fonts.atlas().is_current(&first.rect));
        assert_eq!(fonts.base_cell_size(), Size::new(10, 20));
        let again = fonts.glyph('█' as u32).unwrap();
        assert_eq!(again.rect.rect.width, 10);
    }

    #[test]
    fn test_highest_base_wins() {
        let mut fonts = FontManager::new();
        let pending = fonts
            .prepare(0x2500, &attrs(&[("name", "dynamic"), ("size", "4x4"), ("spacing", "2x1")]))
            .unwrap();
        fonts.apply(vec![pending]);
        assert_eq!(fonts.spacing('█' as u32), Size::new(2, 1));
        assert_eq!(fonts.spacing(' ' as u32), Size::new(2, 1));
        assert_eq!(fonts.glyph('█' as u32).unwrap().rect.rect.width, 4);
    }

    #[test]
    fn test_merge_attributes_without_name() {
        let mut fonts = FontManager::new();
        let pending = fonts.prepare(0, &attrs(&[("name", "dynamic"), ("size", "8x8")])).unwrap();
        fonts.apply(vec![pending]);
        let pending = fonts.prepare(0, &attrs(&[("spacing", "2x2")])).unwrap();
        fonts.apply(vec![pending]);
        assert_eq!(fonts.attribute(0, "size").as_deref(), Some("8x8"));
        assert_eq!(fonts.attribute(0, "spacing").as_deref(), Some("2x2"));
    }

    #[test]
    fn test_failed_prepare_keeps_fonts() {
        let fonts = FontManager::new();
        assert!(fonts.prepare(0, &attrs(&[("name", "/nonexistent/x.png"), ("size", "8x8")])).is_err());
        assert_eq!(fonts.attribute(0, "name").as_deref(), Some("default"));
    }

    #[test]
    fn test_remove_tileset() {
        let mut fonts = FontManager::new();
        let pending = fonts.prepare(0xE000, &attrs(&[("name", "dynamic"), ("size", "8x8")])).unwrap();
        fonts.apply(vec![pending]);
        assert!(fonts.attribute(0xE000, "name").is_some());
        let pending = fonts.prepare(0xE000, &attrs(&[("name", "none")])).unwrap();
        fonts.apply(vec![pending]);
        assert!(fonts.attribute(0xE000, "name").is_none());
    }
}

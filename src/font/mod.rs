//! Font Module
//!
//! Tilesets, the glyph atlas and the manager that ties them together:
//! - Bitmap: ARGB pixel buffers
//! - Atlas: shelf-packed glyph texture
//! - Tileset: dynamic, bitmap sheet and TrueType glyph sources
//! - FontManager: lookup by code with lazy rasterization

pub mod atlas;
pub mod bitmap;
pub mod dynamic;
pub mod manager;
pub mod sheet;
pub mod tileset;
pub mod truetype;

pub use atlas::{Atlas, AtlasRect};
pub use bitmap::Bitmap;
pub use manager::{FontManager, Glyph, PendingTileset};
pub use tileset::{parse_base_code, RasterGlyph, Tileset, TilesetSpec};

//! Atlas - Shelf-packed glyph texture
//!
//! Glyphs are packed left to right on shelves whose height is set by the
//! first glyph placed on them. When no shelf fits, the texture doubles
//! in height; existing rectangles stay valid across growth. A rebuild
//! bumps the generation, which invalidates every rectangle handed out
//! before it.

use log::debug;

use crate::core::{Color, Rect, Size};

use super::bitmap::Bitmap;

const INITIAL_SIZE: Size = Size::new(256, 256);
const PADDING: i32 = 1;

/// Location of a packed glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasRect {
    pub rect: Rect,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Shelf {
    y: i32,
    height: i32,
    cursor: i32,
}

pub struct Atlas {
    texture: Bitmap,
    shelves: Vec<Shelf>,
    generation: u64,
}

impl Atlas {
    pub fn new() -> Self {
        Self {
            texture: Bitmap::new(INITIAL_SIZE, Color::TRANSPARENT),
            shelves: Vec::new(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn texture(&self) -> &Bitmap {
        &self.texture
    }

    /// Whether `rect` was packed since the last rebuild
    pub fn is_current(&self, rect: &AtlasRect) -> bool {
        rect.generation == self.generation
    }

    /// Drop every glyph and start a new generation
    pub fn rebuild(&mut self) {
        self.generation += 1;
        self.shelves.clear();
        self.texture = Bitmap::new(INITIAL_SIZE, Color::TRANSPARENT);
        debug!("Atlas rebuilt, generation {}", self.generation);
    }

    /// Pack a bitmap and return where it landed
    pub fn add(&mut self, bitmap: &Bitmap) -> AtlasRect {
        let w = bitmap.width().max(1);
        let h = bitmap.height().max(1);

        // Widen first so a single wide glyph always fits on a shelf
        while w + PADDING > self.texture.width() {
            self.grow(Size::new(self.texture.width() * 2, self.texture.height()));
        }

        let slot = loop {
            if let Some(slot) = self.find_slot(w, h) {
                break slot;
            }
            let next_y = self.shelves.last().map(|s| s.y + s.height + PADDING).unwrap_or(0);
            if next_y + h + PADDING <= self.texture.height() {
                self.shelves.push(Shelf { y: next_y, height: h, cursor: 0 });
                continue;
            }
            self.grow(Size::new(self.texture.width(), self.texture.height() * 2));
        };

        self.texture.blit(bitmap, slot.x, slot.y);
        AtlasRect {
            rect: Rect::new(slot.x, slot.y, bitmap.width(), bitmap.height()),
            generation: self.generation,
        }
    }

    fn find_slot(&mut self, w: i32, h: i32) -> Option<crate::core::Point> {
        let width = self.texture.width();
        let shelf = self
            .shelves
            .iter_mut()
            .find(|s| s.height >= h && s.cursor + w + PADDING <= width)?;
        let point = crate::core::Point::new(shelf.cursor, shelf.y);
        shelf.cursor += w + PADDING;
        Some(point)
    }

    fn grow(&mut self, size: Size) {
        let mut texture = Bitmap::new(size, Color::TRANSPARENT);
        texture.blit(&self.texture, 0, 0);
        self.texture = texture;
        debug!("Atlas grown to {}", size);
    }
}

impl Default for Atlas {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_without_overlap() {
        let mut atlas = Atlas::new();
        let glyph = Bitmap::new(Size::new(8, 16), Color::WHITE);
        let rects: Vec<_> = (0..100).map(|_| atlas.add(&glyph).rect).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(a.intersection(b).is_empty(), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_growth_keeps_pixels() {
        let mut atlas = Atlas::new();
        let mut glyph = Bitmap::new(Size::new(64, 64), Color::TRANSPARENT);
        glyph.set(0, 0, Color::WHITE);
        let first = atlas.add(&glyph);
        for _ in 0..40 {
            atlas.add(&glyph);
        }
        assert!(atlas.texture().height() > 256);
        assert_eq!(atlas.texture().get(first.rect.x, first.rect.y), Color::WHITE);
        assert!(atlas.is_current(&first));
    }

    #[test]
    fn test_rebuild_invalidates() {
        let mut atlas = Atlas::new();
        let r = atlas.add(&Bitmap::new(Size::new(4, 4), Color::WHITE));
        atlas.rebuild();
        assert!(!atlas.is_current(&r));
        let r2 = atlas.add(&Bitmap::new(Size::new(4, 4), Color::WHITE));
        assert!(atlas.is_current(&r2));
    }

    #[test]
    fn test_wide_glyph_widens_texture() {
        let mut atlas = Atlas::new();
        let r = atlas.add(&Bitmap::new(Size::new(600, 10), Color::WHITE));
        assert!(atlas.texture().width() >= 601);
        assert_eq!(r.rect.width, 600);
    }
}

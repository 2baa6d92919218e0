//! Dynamic tileset
//!
//! Procedurally drawn glyphs sized to any tile: space, the replacement
//! character box, block elements (U+2580..U+259F) and light/double box
//! drawing lines.

use crate::core::{Color, Point, Rect, Size};

use super::bitmap::Bitmap;
use super::tileset::{RasterGlyph, Tileset};

pub const REPLACEMENT: u32 = 0xFFFD;

/// Arm weights (up, down, left, right); 1 = light, 2 = double
type Arms = (u8, u8, u8, u8);

const BOX_DRAWING: [(u32, Arms); 22] = [
    (0x2500, (0, 0, 1, 1)),
    (0x2502, (1, 1, 0, 0)),
    (0x250C, (0, 1, 0, 1)),
    (0x2510, (0, 1, 1, 0)),
    (0x2514, (1, 0, 0, 1)),
    (0x2518, (1, 0, 1, 0)),
    (0x251C, (1, 1, 0, 1)),
    (0x2524, (1, 1, 1, 0)),
    (0x252C, (0, 1, 1, 1)),
    (0x2534, (1, 0, 1, 1)),
    (0x253C, (1, 1, 1, 1)),
    (0x2550, (0, 0, 2, 2)),
    (0x2551, (2, 2, 0, 0)),
    (0x2554, (0, 2, 0, 2)),
    (0x2557, (0, 2, 2, 0)),
    (0x255A, (2, 0, 0, 2)),
    (0x255D, (2, 0, 2, 0)),
    (0x2560, (2, 2, 0, 2)),
    (0x2563, (2, 2, 2, 0)),
    (0x2566, (0, 2, 2, 2)),
    (0x2569, (2, 0, 2, 2)),
    (0x256C, (2, 2, 2, 2)),
];

/// Quadrant masks for U+2596..U+259F: UL=1, UR=2, LL=4, LR=8
const QUADRANTS: [u8; 10] = [4, 8, 1, 13, 9, 7, 11, 2, 6, 14];

pub struct DynamicTileset {
    tile: Size,
    spacing: Size,
}

impl DynamicTileset {
    pub fn new(tile: Size, spacing: Size) -> Self {
        Self { tile, spacing }
    }

    fn canvas(&self) -> Bitmap {
        Bitmap::new(self.tile, Color::TRANSPARENT)
    }

    fn replacement(&self) -> Bitmap {
        let mut bmp = self.canvas();
        let (w, h) = (self.tile.width, self.tile.height);
        for x in 1..w - 1 {
            bmp.set(x, 1, Color::WHITE);
            bmp.set(x, h - 2, Color::WHITE);
        }
        for y in 1..h - 1 {
            bmp.set(1, y, Color::WHITE);
            bmp.set(w - 2, y, Color::WHITE);
        }
        bmp
    }

    fn block(&self, code: u32) -> Bitmap {
        let mut bmp = self.canvas();
        let (w, h) = (self.tile.width, self.tile.height);
        let eighth_h = |n: i32| (h * n + 4) / 8;
        let eighth_w = |n: i32| (w * n + 4) / 8;

        match code {
            0x2580 => bmp.fill(Rect::new(0, 0, w, h / 2), Color::WHITE),
            0x2581..=0x2588 => {
                let n = (code - 0x2580) as i32;
                let fill = eighth_h(n);
                bmp.fill(Rect::new(0, h - fill, w, fill), Color::WHITE);
            }
            0x2589..=0x258F => {
                let n = (0x2590 - code) as i32;
                bmp.fill(Rect::new(0, 0, eighth_w(n), h), Color::WHITE);
            }
            0x2590 => bmp.fill(Rect::new(w / 2, 0, w - w / 2, h), Color::WHITE),
            0x2591..=0x2593 => {
                let alpha = [64u8, 128, 192][(code - 0x2591) as usize];
                bmp.fill(Rect::from_size(self.tile), Color::WHITE.with_alpha(alpha));
            }
            0x2594 => bmp.fill(Rect::new(0, 0, w, eighth_h(1)), Color::WHITE),
            0x2595 => bmp.fill(Rect::new(w - eighth_w(1), 0, eighth_w(1), h), Color::WHITE),
            0x2596..=0x259F => {
                let mask = QUADRANTS[(code - 0x2596) as usize];
                let (hw, hh) = (w / 2, h / 2);
                let quads = [
                    Rect::new(0, 0, hw, hh),
                    Rect::new(hw, 0, w - hw, hh),
                    Rect::new(0, hh, hw, h - hh),
                    Rect::new(hw, hh, w - hw, h - hh),
                ];
                for (i, quad) in quads.iter().enumerate() {
                    if mask & (1 << i) != 0 {
                        bmp.fill(*quad, Color::WHITE);
                    }
                }
            }
            _ => {}
        }
        bmp
    }

    fn box_drawing(&self, arms: Arms) -> Bitmap {
        let mut bmp = self.canvas();
        let (w, h) = (self.tile.width, self.tile.height);
        let (cx, cy) = (w / 2, h / 2);
        let (up, down, left, right) = arms;

        let vertical = |bmp: &mut Bitmap, weight: u8, y0: i32, y1: i32| {
            let xs: &[i32] = if weight == 2 { &[cx - 1, cx + 1] } else { &[cx] };
            for &x in xs {
                bmp.fill(Rect::new(x, y0, 1, y1 - y0), Color::WHITE);
            }
        };
        let horizontal = |bmp: &mut Bitmap, weight: u8, x0: i32, x1: i32| {
            let ys: &[i32] = if weight == 2 { &[cy - 1, cy + 1] } else { &[cy] };
            for &y in ys {
                bmp.fill(Rect::new(x0, y, x1 - x0, 1), Color::WHITE);
            }
        };

        if up > 0 {
            vertical(&mut bmp, up, 0, cy + 2);
        }
        if down > 0 {
            vertical(&mut bmp, down, cy - 1, h);
        }
        if left > 0 {
            horizontal(&mut bmp, left, 0, cx + 2);
        }
        if right > 0 {
            horizontal(&mut bmp, right, cx - 1, w);
        }
        bmp
    }
}

impl Tileset for DynamicTileset {
    fn kind(&self) -> &'static str {
        "dynamic"
    }

    fn bounding_box(&self) -> Size {
        self.tile
    }

    fn spacing(&self) -> Size {
        self.spacing
    }

    fn provides(&self, code: u32) -> bool {
        code == 0x20
            || code == REPLACEMENT
            || (0x2580..=0x259F).contains(&code)
            || BOX_DRAWING.iter().any(|(c, _)| *c == code)
    }

    fn rasterize(&mut self, code: u32) -> Option<RasterGlyph> {
        let bitmap = match code {
            0x20 => self.canvas(),
            REPLACEMENT => self.replacement(),
            0x2580..=0x259F => self.block(code),
            _ => {
                let arms = BOX_DRAWING.iter().find(|(c, _)| *c == code)?.1;
                self.box_drawing(arms)
            }
        };
        Some(RasterGlyph {
            bitmap,
            offset: Point::default(),
        })
    }
}

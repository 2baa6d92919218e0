//! Layer compositor
//!
//! Layers are drawn bottom to top. Within a layer every background is
//! drawn before any glyph so that glyphs spilling into neighbouring
//! cells are not covered by them. Glyph texels are tinted by the leaf
//! color. A layer with composition off lets its glyphs replace whatever
//! glyph pixels lie below (over the cell background); with composition
//! on they are alpha-blended.

use log::trace;

use crate::core::{Color, Composition, Layer, Leaf, Point, Rect, Scene, Size};
use crate::font::{Bitmap, FontManager, Glyph};

use super::{Frame, FrameCell};

/// Frame being drawn
struct Canvas {
    size: Size,
    cell_size: Size,
    pixels: Bitmap,
    cells: Vec<FrameCell>,
}

impl Canvas {
    fn cell_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some((y * self.size.width + x) as usize)
    }

    fn cell_rect(&self, x: i32, y: i32) -> Rect {
        Rect::new(
            x * self.cell_size.width,
            y * self.cell_size.height,
            self.cell_size.width,
            self.cell_size.height,
        )
    }

    /// Put one glyph pixel, honoring the clip and composition
    fn plot(&mut self, x: i32, y: i32, c: Color, clip: &Rect, composition: Composition) {
        if c.a() == 0 || !clip.contains(x, y) {
            return;
        }
        let dst = match composition {
            Composition::On => self.pixels.get(x, y),
            Composition::Off => {
                let cell = self
                    .cell_index(x.div_euclid(self.cell_size.width), y.div_euclid(self.cell_size.height))
                    .and_then(|i| self.cells.get(i));
                match cell {
                    Some(cell) => cell.bg,
                    None => return,
                }
            }
        };
        self.pixels.set(x, y, c.over(dst));
    }
}

/// Turns scenes into frames
#[derive(Debug, Default)]
pub struct Renderer {
    frames: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames composed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Compose every visible layer of `scene`
    pub fn compose(&mut self, scene: &Scene, fonts: &mut FontManager, cell_size: Size) -> Frame {
        let size = scene.size();
        let cell_size = Size::new(cell_size.width.max(1), cell_size.height.max(1));
        let mut canvas = Canvas {
            size,
            cell_size,
            pixels: Bitmap::new(
                Size::new(size.width * cell_size.width, size.height * cell_size.height),
                Color::BLACK,
            ),
            cells: vec![FrameCell::default(); size.area()],
        };

        for layer in &scene.layers {
            draw_backgrounds(&mut canvas, layer);
            draw_leaves(&mut canvas, layer, fonts);
        }

        self.frames += 1;
        trace!("Composed frame {} ({} layers, {})", self.frames, scene.layers.len(), size);

        Frame {
            size,
            cell_size,
            pixels: canvas.pixels,
            cells: canvas.cells,
        }
    }
}

fn draw_backgrounds(canvas: &mut Canvas, layer: &Layer) {
    for (x, y, cell) in layer.grid.iter() {
        if cell.bg.is_transparent() || !layer.visible(x, y) {
            continue;
        }
        let Some(index) = canvas.cell_index(x, y) else {
            continue;
        };
        let bg = cell.bg.over(canvas.cells[index].bg);
        canvas.cells[index].bg = bg;
        let rect = canvas.cell_rect(x, y);
        for py in rect.y..rect.bottom() {
            for px in rect.x..rect.right() {
                let below = canvas.pixels.get(px, py);
                canvas.pixels.set(px, py, cell.bg.over(below));
            }
        }
    }
}

fn draw_leaves(canvas: &mut Canvas, layer: &Layer, fonts: &mut FontManager) {
    let frame_rect = Rect::new(0, 0, canvas.pixels.width(), canvas.pixels.height());
    let clip = match layer.crop {
        Some(crop) => Rect::new(
            crop.x.saturating_mul(canvas.cell_size.width),
            crop.y.saturating_mul(canvas.cell_size.height),
            crop.width.saturating_mul(canvas.cell_size.width),
            crop.height.saturating_mul(canvas.cell_size.height),
        )
        .intersection(&frame_rect),
        None => frame_rect,
    };

    for (x, y, cell) in layer.grid.iter() {
        if cell.is_empty() || !layer.visible(x, y) {
            continue;
        }
        let origin = canvas.cell_rect(x, y);
        for leaf in &cell.leaves {
            let Some(glyph) = fonts.glyph(leaf.code) else {
                continue;
            };
            let texture = fonts.atlas().texture();
            draw_leaf(canvas, texture, &glyph, leaf, Point::new(origin.x, origin.y), &clip, layer.composition);
        }
        if let (Some(top), Some(index)) = (cell.top(), canvas.cell_index(x, y)) {
            if top.code != 0 {
                canvas.cells[index].code = top.code;
                canvas.cells[index].fg = top.color;
            }
        }
    }
}

fn draw_leaf(
    canvas: &mut Canvas,
    texture: &Bitmap,
    glyph: &Glyph,
    leaf: &Leaf,
    origin: Point,
    clip: &Rect,
    composition: Composition,
) {
    let src = glyph.rect.rect;
    // Destination rectangle before corner displacement
    let dest = match leaf.span {
        Some((dx, dy)) if dx > 0 && dy > 0 => Rect::new(
            origin.x,
            origin.y,
            dx.saturating_mul(canvas.cell_size.width),
            dy.saturating_mul(canvas.cell_size.height),
        ),
        _ => Rect::new(
            origin.x.saturating_add(glyph.offset.x),
            origin.y.saturating_add(glyph.offset.y),
            src.width,
            src.height,
        ),
    };

    match leaf.corners {
        Some(corners) => draw_quad(canvas, texture, src, dest, &corners, leaf.color, clip, composition),
        None if dest.width == src.width && dest.height == src.height => {
            for ty in 0..src.height {
                for tx in 0..src.width {
                    let c = texture.get(src.x + tx, src.y + ty).modulate(leaf.color);
                    canvas.plot(dest.x + tx, dest.y + ty, c, clip, composition);
                }
            }
        }
        None => {
            // Only the clipped part of a stretched glyph is sampled
            let visible = dest.intersection(clip);
            let (sx, sy) = (
                src.width as f32 / dest.width as f32,
                src.height as f32 / dest.height as f32,
            );
            for py in visible.y..visible.bottom() {
                for px in visible.x..visible.right() {
                    let u = src.x as f32 + ((px - dest.x) as f32 + 0.5) * sx;
                    let v = src.y as f32 + ((py - dest.y) as f32 + 0.5) * sy;
                    let c = texture.sample(u, v).modulate(leaf.color);
                    canvas.plot(px, py, c, clip, composition);
                }
            }
        }
    }
}

/// Warp the glyph onto the quad formed by displacing the corners of
/// `dest` (top-left, top-right, bottom-right, bottom-left)
#[allow(clippy::too_many_arguments)]
fn draw_quad(
    canvas: &mut Canvas,
    texture: &Bitmap,
    src: Rect,
    dest: Rect,
    corners: &[(i32, i32); 4],
    tint: Color,
    clip: &Rect,
    composition: Composition,
) {
    let base = [
        (dest.x, dest.y),
        (dest.right(), dest.y),
        (dest.right(), dest.bottom()),
        (dest.x, dest.bottom()),
    ];
    let quad: Vec<(f32, f32)> = base
        .iter()
        .zip(corners)
        .map(|(&(bx, by), &(ox, oy))| (bx.saturating_add(ox) as f32, by.saturating_add(oy) as f32))
        .collect();

    let min_x = quad.iter().map(|p| p.0).fold(f32::MAX, f32::min).floor() as i32;
    let min_y = quad.iter().map(|p| p.1).fold(f32::MAX, f32::min).floor() as i32;
    let max_x = quad.iter().map(|p| p.0).fold(f32::MIN, f32::max).ceil() as i32;
    let max_y = quad.iter().map(|p| p.1).fold(f32::MIN, f32::max).ceil() as i32;
    let bounds = Rect::new(
        min_x,
        min_y,
        max_x.saturating_sub(min_x).max(1),
        max_y.saturating_sub(min_y).max(1),
    );
    let visible = bounds.intersection(clip);
    if visible.is_empty() {
        return;
    }

    // Forward-map a supersampled grid of the glyph into a scratch
    // bitmap covering the visible part, so every destination pixel is
    // written once. Sampling density is capped at the frame size.
    let mut scratch = Bitmap::new(Size::new(visible.width, visible.height), Color::TRANSPARENT);
    let steps_x = (bounds.width.min(canvas.pixels.width()).max(src.width) * 2).max(1);
    let steps_y = (bounds.height.min(canvas.pixels.height()).max(src.height) * 2).max(1);
    let lerp = |a: (f32, f32), b: (f32, f32), t: f32| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);

    for j in 0..steps_y {
        let t = (j as f32 + 0.5) / steps_y as f32;
        for i in 0..steps_x {
            let s = (i as f32 + 0.5) / steps_x as f32;
            let top = lerp(quad[0], quad[1], s);
            let bottom = lerp(quad[3], quad[2], s);
            let (px, py) = lerp(top, bottom, t);
            let c = texture.sample(src.x as f32 + s * src.width as f32, src.y as f32 + t * src.height as f32);
            scratch.set(
                (px.floor() as i32).saturating_sub(visible.x),
                (py.floor() as i32).saturating_sub(visible.y),
                c,
            );
        }
    }

    for y in 0..scratch.height() {
        for x in 0..scratch.width() {
            let c = scratch.get(x, y).modulate(tint);
            canvas.plot(visible.x + x, visible.y + y, c, clip, composition);
        }
    }
}

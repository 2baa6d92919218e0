//! Bitmap - An ARGB pixel rectangle
//!
//! Used for tile sheets, rasterized glyphs, the atlas texture and
//! composed frames.

use crate::core::{Color, Rect, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    size: Size,
    pixels: Vec<Color>,
}

impl Bitmap {
    pub fn new(size: Size, fill: Color) -> Self {
        Self {
            size,
            pixels: vec![fill; size.area()],
        }
    }

    /// Wrap existing pixels; `None` when the length does not match
    pub fn from_pixels(size: Size, pixels: Vec<Color>) -> Option<Self> {
        (pixels.len() == size.area()).then_some(Self { size, pixels })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> i32 {
        self.size.width
    }

    pub fn height(&self) -> i32 {
        self.size.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<Color> {
        self.pixels
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 && x < self.size.width && y < self.size.height {
            Some(y as usize * self.size.width as usize + x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Color {
        self.index(x, y).map(|i| self.pixels[i]).unwrap_or(Color::TRANSPARENT)
    }

    pub fn set(&mut self, x: i32, y: i32, c: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = c;
        }
    }

    /// Fill a rectangle, clipped to the bitmap
    pub fn fill(&mut self, area: Rect, c: Color) {
        let area = area.intersection(&Rect::from_size(self.size));
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                self.set(x, y, c);
            }
        }
    }

    /// Copy out a sub-rectangle
    pub fn extract(&self, area: Rect) -> Bitmap {
        let mut out = Bitmap::new(Size::new(area.width.max(0), area.height.max(0)), Color::TRANSPARENT);
        for y in 0..out.height() {
            for x in 0..out.width() {
                out.set(x, y, self.get(area.x + x, area.y + y));
            }
        }
        out
    }

    /// Copy `src` with its top-left at (x, y), clipped
    pub fn blit(&mut self, src: &Bitmap, x: i32, y: i32) {
        for sy in 0..src.height() {
            for sx in 0..src.width() {
                self.set(x + sx, y + sy, src.get(sx, sy));
            }
        }
    }

    /// Make every pixel equal to `key` fully transparent
    pub fn key_out(&mut self, key: Color) {
        for p in &mut self.pixels {
            if *p == key {
                *p = Color::TRANSPARENT;
            }
        }
    }

    /// Bilinear sample at fractional texel coordinates
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let x = u - 0.5;
        let y = v - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);

        let c00 = self.get(x0, y0);
        let c10 = self.get(x0 + 1, y0);
        let c01 = self.get(x0, y0 + 1);
        let c11 = self.get(x0 + 1, y0 + 1);

        let lerp = |a: u8, b: u8, c: u8, d: u8| {
            let top = a as f32 + (b as f32 - a as f32) * fx;
            let bottom = c as f32 + (d as f32 - c as f32) * fx;
            (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8
        };

        Color::from_argb(
            lerp(c00.a(), c10.a(), c01.a(), c11.a()),
            lerp(c00.r(), c10.r(), c01.r(), c11.r()),
            lerp(c00.g(), c10.g(), c01.g(), c11.g()),
            lerp(c00.b(), c10.b(), c01.b(), c11.b()),
        )
    }
}

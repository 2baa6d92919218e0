//! Packed ARGB colors and the named palette
//!
//! Colors travel through the engine as 0xAARRGGBB integers. Names are
//! resolved against a fixed palette of 22 hues in seven shades each,
//! plus black, white and transparent.

use serde::{Deserialize, Serialize};

/// A packed 0xAARRGGBB color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_argb(0xFF, r, g, b)
    }

    pub const fn a(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(&self) -> u8 {
        self.0 as u8
    }

    pub const fn is_transparent(&self) -> bool {
        self.a() == 0
    }

    /// Same color with a different alpha
    pub const fn with_alpha(&self, a: u8) -> Self {
        Color((self.0 & 0x00FF_FFFF) | (a as u32) << 24)
    }

    /// Multiply channels, used to tint glyph texels with a leaf color
    pub fn modulate(&self, tint: Color) -> Color {
        let m = |x: u8, y: u8| ((x as u32 * y as u32 + 127) / 255) as u8;
        Color::from_argb(
            m(self.a(), tint.a()),
            m(self.r(), tint.r()),
            m(self.g(), tint.g()),
            m(self.b(), tint.b()),
        )
    }

    /// Source-over blend of `self` onto `dst`
    pub fn over(&self, dst: Color) -> Color {
        let sa = self.a() as u32;
        if sa == 255 {
            return *self;
        }
        if sa == 0 {
            return dst;
        }
        let da = dst.a() as u32;
        let out_a = sa + da * (255 - sa) / 255;
        if out_a == 0 {
            return Color::TRANSPARENT;
        }
        let mix = |s: u8, d: u8| {
            let v = (s as u32 * sa + d as u32 * da * (255 - sa) / 255) / out_a;
            v.min(255) as u8
        };
        Color::from_argb(
            out_a as u8,
            mix(self.r(), dst.r()),
            mix(self.g(), dst.g()),
            mix(self.b(), dst.b()),
        )
    }

    /// Strict parse: palette name, `#RRGGBB`, `#AARRGGBB`, `0x…` or a
    /// decimal integer. Numeric values without alpha become opaque.
    pub fn parse(s: &str) -> Option<Color> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let numeric = if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 && hex.len() != 8 {
                return None;
            }
            Some(u32::from_str_radix(hex, 16).ok()?)
        } else if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(u32::from_str_radix(hex, 16).ok()?)
        } else if s.starts_with('-') || s.as_bytes()[0].is_ascii_digit() {
            Some(s.parse::<i64>().ok()? as u32)
        } else {
            None
        };

        match numeric {
            Some(v) if v & 0xFF00_0000 == 0 => Some(Color(v | 0xFF00_0000)),
            Some(v) => Some(Color(v)),
            None => lookup_name(s),
        }
    }
}

impl From<u32> for Color {
    fn from(v: u32) -> Self {
        Color(v)
    }
}

impl From<Color> for u32 {
    fn from(c: Color) -> Self {
        c.0
    }
}

/// Lenient lookup: unknown or malformed names give opaque white.
pub fn color_from_name(name: &str) -> Color {
    Color::parse(name).unwrap_or(Color::WHITE)
}

const SHADES: [&str; 7] = ["lightest", "lighter", "light", "", "dark", "darker", "darkest"];

type Shades = [(u8, u8, u8); 7];

const HUES: [(&str, Shades); 23] = [
    ("grey", [(223, 223, 223), (191, 191, 191), (159, 159, 159), (127, 127, 127), (95, 95, 95), (63, 63, 63), (31, 31, 31)]),
    ("gray", [(223, 223, 223), (191, 191, 191), (159, 159, 159), (127, 127, 127), (95, 95, 95), (63, 63, 63), (31, 31, 31)]),
    ("red", [(255, 191, 191), (255, 127, 127), (255, 63, 63), (255, 0, 0), (191, 0, 0), (127, 0, 0), (63, 0, 0)]),
    ("flame", [(255, 207, 191), (255, 159, 127), (255, 111, 63), (255, 63, 0), (191, 47, 0), (127, 31, 0), (63, 15, 0)]),
    ("orange", [(255, 223, 191), (255, 191, 127), (255, 159, 63), (255, 127, 0), (191, 95, 0), (127, 63, 0), (63, 31, 0)]),
    ("amber", [(255, 239, 191), (255, 223, 127), (255, 207, 63), (255, 191, 0), (191, 143, 0), (127, 95, 0), (63, 47, 0)]),
    ("yellow", [(255, 255, 191), (255, 255, 127), (255, 255, 63), (255, 255, 0), (191, 191, 0), (127, 127, 0), (63, 63, 0)]),
    ("lime", [(239, 255, 191), (223, 255, 127), (207, 255, 63), (191, 255, 0), (143, 191, 0), (95, 127, 0), (47, 63, 0)]),
    ("chartreuse", [(223, 255, 191), (191, 255, 127), (159, 255, 63), (127, 255, 0), (95, 191, 0), (63, 127, 0), (31, 63, 0)]),
    ("green", [(191, 255, 191), (127, 255, 127), (63, 255, 63), (0, 255, 0), (0, 191, 0), (0, 127, 0), (0, 63, 0)]),
    ("sea", [(191, 255, 223), (127, 255, 191), (63, 255, 159), (0, 255, 127), (0, 191, 95), (0, 127, 63), (0, 63, 31)]),
    ("turquoise", [(191, 255, 239), (127, 255, 223), (63, 255, 207), (0, 255, 191), (0, 191, 143), (0, 127, 95), (0, 63, 47)]),
    ("cyan", [(191, 255, 255), (127, 255, 255), (63, 255, 255), (0, 255, 255), (0, 191, 191), (0, 127, 127), (0, 63, 63)]),
    ("sky", [(191, 239, 255), (127, 223, 255), (63, 207, 255), (0, 191, 255), (0, 143, 191), (0, 95, 127), (0, 47, 63)]),
    ("azure", [(191, 223, 255), (127, 191, 255), (63, 159, 255), (0, 127, 255), (0, 95, 191), (0, 63, 127), (0, 31, 63)]),
    ("blue", [(191, 191, 255), (127, 127, 255), (63, 63, 255), (0, 0, 255), (0, 0, 191), (0, 0, 127), (0, 0, 63)]),
    ("han", [(207, 191, 255), (159, 127, 255), (111, 63, 255), (63, 0, 255), (47, 0, 191), (31, 0, 127), (15, 0, 63)]),
    ("violet", [(223, 191, 255), (191, 127, 255), (159, 63, 255), (127, 0, 255), (95, 0, 191), (63, 0, 127), (31, 0, 63)]),
    ("purple", [(239, 191, 255), (223, 127, 255), (207, 63, 255), (191, 0, 255), (143, 0, 191), (95, 0, 127), (47, 0, 63)]),
    ("fuchsia", [(255, 191, 255), (255, 127, 255), (255, 63, 255), (255, 0, 255), (191, 0, 191), (127, 0, 127), (63, 0, 63)]),
    ("magenta", [(255, 191, 239), (255, 127, 223), (255, 63, 207), (255, 0, 191), (191, 0, 143), (127, 0, 95), (63, 0, 47)]),
    ("pink", [(255, 191, 223), (255, 127, 191), (255, 63, 159), (255, 0, 127), (191, 0, 95), (127, 0, 63), (63, 0, 31)]),
    ("crimson", [(255, 191, 207), (255, 127, 159), (255, 63, 111), (255, 0, 63), (191, 0, 47), (127, 0, 31), (63, 0, 15)]),
];

fn lookup_name(name: &str) -> Option<Color> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "transparent" | "none" => return Some(Color::TRANSPARENT),
        "black" => return Some(Color::BLACK),
        "white" => return Some(Color::WHITE),
        _ => {}
    }

    // "dark red", "darkred" and "dark-red" all resolve
    let (shade, hue) = SHADES
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .find_map(|(i, s)| {
            lower
                .strip_prefix(s)
                .map(|rest| (i, rest.trim_start_matches([' ', '-', '_'])))
                .filter(|(_, rest)| HUES.iter().any(|(h, _)| h == rest))
        })
        .unwrap_or((3, lower.as_str()));

    HUES.iter()
        .find(|(h, _)| *h == hue)
        .map(|(_, shades)| {
            let (r, g, b) = shades[shade];
            Color::rgb(r, g, b)
        })
}

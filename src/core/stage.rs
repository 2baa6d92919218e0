//! Stage - Layered, double-buffered cell storage
//!
//! The application draws into the back scene; `commit` publishes it as
//! the front scene that the renderer composes. Layer 0 always exists,
//! higher layers are allocated on first use.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, Leaf};
use super::color::Color;
use super::geometry::{Rect, Size};
use super::grid::Grid;

/// Highest addressable layer index
pub const MAX_LAYER: usize = 255;

/// How a layer's glyph pixels combine with what is below
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    /// Glyph pixels replace the destination
    #[default]
    Off,
    /// Glyph pixels are alpha-blended
    On,
}

impl Composition {
    pub fn from_code(code: i32) -> Self {
        if code != 0 {
            Composition::On
        } else {
            Composition::Off
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Composition::Off => 0,
            Composition::On => 1,
        }
    }
}

/// One z-ordered plane of cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub grid: Grid,
    /// Cells outside this rectangle are not drawn
    pub crop: Option<Rect>,
    pub composition: Composition,
}

impl Layer {
    fn new(size: Size, bg: Color) -> Self {
        Self {
            grid: Grid::new(size, bg),
            crop: None,
            composition: Composition::Off,
        }
    }

    /// Whether the cell at (x, y) survives this layer's crop
    pub fn visible(&self, x: i32, y: i32) -> bool {
        self.crop.map(|r| r.contains(x, y)).unwrap_or(true)
    }
}

/// A full set of layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub layers: Vec<Layer>,
}

impl Scene {
    fn new(size: Size, base_bg: Color) -> Self {
        Self {
            layers: vec![Layer::new(size, base_bg)],
        }
    }

    pub fn size(&self) -> Size {
        self.layers.first().map(|l| l.grid.size()).unwrap_or_default()
    }

    /// Layer `index`, allocating transparent layers up to it
    pub fn layer_mut(&mut self, index: usize) -> &mut Layer {
        let index = index.min(MAX_LAYER);
        let size = self.size();
        while self.layers.len() <= index {
            self.layers.push(Layer::new(size, Color::TRANSPARENT));
        }
        &mut self.layers[index]
    }

    /// The z-th non-empty cell at (x, y) counting from the top layer
    fn nth_occupied(&self, x: i32, y: i32, z: usize) -> Option<&Cell> {
        self.layers
            .iter()
            .rev()
            .filter_map(|l| l.grid.get(x, y))
            .filter(|c| !c.is_empty())
            .nth(z)
    }

    /// Topmost leaf of the z-th occupied layer at (x, y)
    pub fn pick(&self, x: i32, y: i32, z: usize) -> Option<&Leaf> {
        self.nth_occupied(x, y, z).and_then(|c| c.top())
    }

    /// Background of the z-th layer from the top with a visible
    /// background at (x, y); falls back to layer 0.
    pub fn pick_bkcolor(&self, x: i32, y: i32, z: usize) -> Color {
        self.layers
            .iter()
            .rev()
            .filter_map(|l| l.grid.get(x, y))
            .filter(|c| !c.bg.is_transparent())
            .nth(z)
            .or_else(|| self.layers.first().and_then(|l| l.grid.get(x, y)))
            .map(|c| c.bg)
            .unwrap_or(Color::TRANSPARENT)
    }
}

/// Front and back scenes sharing one size
#[derive(Debug, Clone)]
pub struct Stage {
    pub size: Size,
    pub front: Scene,
    pub back: Scene,
}

impl Stage {
    pub fn new(size: Size, base_bg: Color) -> Self {
        let scene = Scene::new(size, base_bg);
        Self {
            size,
            front: scene.clone(),
            back: scene,
        }
    }

    /// Reallocate every layer at the new size; content is cleared but
    /// the number of layers and their settings are kept.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        for scene in [&mut self.front, &mut self.back] {
            for layer in &mut scene.layers {
                layer.grid.resize(size);
                layer.crop = None;
            }
        }
    }

    /// Empty every back layer; layer 0 gets `base_bg`
    pub fn clear(&mut self, base_bg: Color) {
        for (i, layer) in self.back.layers.iter_mut().enumerate() {
            let bg = if i == 0 { base_bg } else { Color::TRANSPARENT };
            layer.grid.clear_with(bg);
            layer.crop = None;
        }
    }

    /// Publish the back scene
    pub fn commit(&mut self) {
        if self.front.layers.len() != self.back.layers.len() {
            self.front = self.back.clone();
            return;
        }
        for (front, back) in self.front.layers.iter_mut().zip(&self.back.layers) {
            front.grid.copy_from(&back.grid);
            front.crop = back.crop;
            front.composition = back.composition;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(c: char) -> Leaf {
        Leaf::new(c as u32, Color::WHITE)
    }

    #[test]
    fn test_layer_zero_always_present() {
        let stage = Stage::new(Size::new(4, 4), Color::BLACK);
        assert_eq!(stage.back.layers.len(), 1);
        assert_eq!(stage.back.size(), Size::new(4, 4));
    }

    #[test]
    fn test_layer_allocation() {
        let mut stage = Stage::new(Size::new(4, 4), Color::BLACK);
        stage.back.layer_mut(3);
        assert_eq!(stage.back.layers.len(), 4);
        assert_eq!(stage.back.layers[3].grid.get(0, 0).map(|c| c.bg), Some(Color::TRANSPARENT));
        stage.back.layer_mut(10_000);
        assert_eq!(stage.back.layers.len(), MAX_LAYER + 1);
    }

    #[test]
    fn test_pick_counts_occupied_layers_from_top() {
        let mut stage = Stage::new(Size::new(4, 4), Color::BLACK);
        stage.back.layer_mut(0).grid.put(1, 1, leaf('a'), false);
        stage.back.layer_mut(2).grid.put(1, 1, leaf('c'), false);
        assert_eq!(stage.back.pick(1, 1, 0).map(|l| l.code), Some('c' as u32));
        assert_eq!(stage.back.pick(1, 1, 1).map(|l| l.code), Some('a' as u32));
        assert!(stage.back.pick(1, 1, 2).is_none());
        assert!(stage.back.pick(2, 2, 0).is_none());
    }

    #[test]
    fn test_pick_bkcolor_falls_back_to_base() {
        let mut stage = Stage::new(Size::new(4, 4), Color::BLACK);
        let red = Color::rgb(255, 0, 0);
        stage.back.layer_mut(1).grid.set_bg(0, 0, red);
        assert_eq!(stage.back.pick_bkcolor(0, 0, 0), red);
        assert_eq!(stage.back.pick_bkcolor(0, 0, 1), Color::BLACK);
        assert_eq!(stage.back.pick_bkcolor(0, 0, 5), Color::BLACK);
    }

    #[test]
    fn test_commit_and_resize() {
        let mut stage = Stage::new(Size::new(4, 4), Color::BLACK);
        stage.back.layer_mut(1).grid.put(0, 0, leaf('x'), false);
        assert!(stage.front.pick(0, 0, 0).is_none());
        stage.commit();
        assert_eq!(stage.front.pick(0, 0, 0).map(|l| l.code), Some('x' as u32));

        stage.resize(Size::new(8, 2));
        assert_eq!(stage.back.layers.len(), 2);
        assert_eq!(stage.front.size(), Size::new(8, 2));
        assert!(stage.back.pick(0, 0, 0).is_none());
    }

    #[test]
    fn test_clear_resets_base_background() {
        let mut stage = Stage::new(Size::new(2, 2), Color::BLACK);
        let blue = Color::rgb(0, 0, 255);
        stage.back.layer_mut(1).crop = Some(Rect::new(0, 0, 1, 1));
        stage.clear(blue);
        assert_eq!(stage.back.pick_bkcolor(1, 1, 0), blue);
        assert!(stage.back.layers[1].crop.is_none());
    }
}

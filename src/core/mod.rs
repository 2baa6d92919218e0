//! Core Module
//!
//! Core data structures for the engine:
//! - Color: packed ARGB values and the named palette
//! - Cell: a background plus a stack of glyph leaves
//! - Grid: one layer's 2D cell buffer
//! - Stage: layered, double-buffered scenes

pub mod cell;
pub mod color;
pub mod geometry;
pub mod grid;
pub mod stage;

pub use cell::{Cell, Corners, Leaf};
pub use color::{color_from_name, Color};
pub use geometry::{Point, Rect, Size};
pub use grid::Grid;
pub use stage::{Composition, Layer, Scene, Stage, MAX_LAYER};

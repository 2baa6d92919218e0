//! Text Module
//!
//! Everything between a caller's string and placed cells:
//! - codec: single-byte encodings for narrow entry points
//! - markup: inline color and code tags
//! - layout: wrapping, alignment and measuring

pub mod codec;
pub mod layout;
pub mod markup;

pub use codec::Encoding;
pub use layout::{Placement, TextLayout};
pub use markup::{tokenize, Token};

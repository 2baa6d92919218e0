//! cellterm - Tile-based pseudo-terminal engine
//!
//! A grid of character cells drawn with bitmap, TrueType or procedural
//! tilesets, for roguelikes and other pseudographic applications.
//!
//! # Overview
//!
//! cellterm provides:
//! - Layered, double-buffered cell storage with per-layer crop and composition
//! - A tileset manager with a lazily filled glyph atlas
//! - Text printing with inline color markup, wrapping and alignment
//! - A blocking input queue with key/mouse state and a line editor
//! - A transactional option-string configuration
//! - A JSON protocol and a TCP server with telnet viewers
//!
//! # Example
//!
//! ```no_run
//! use cellterm::Session;
//!
//! let mut session = Session::headless();
//! session.open()?;
//! session.set("window.size=40x12; window.title='demo'")?;
//! session.print(1, 1, "[color=orange]Hello[/color], cellterm!", 0, 0, 0)?;
//! session.refresh()?;
//! let key = session.read();
//! session.close();
//! # let _ = key;
//! # Ok::<(), cellterm::EngineError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod font;
pub mod input;
pub mod protocol;
pub mod renderer;
pub mod server;
pub mod session;
pub mod text;

// Re-export commonly used types
pub use crate::core::{Color, Composition, Rect, Size};
pub use error::{EngineError, Result};
pub use input::{Event, LineOutcome};
pub use protocol::{Command, Response};
pub use renderer::{Frame, Surface};
pub use server::Server;
pub use session::Session;

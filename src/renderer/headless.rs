//! Headless surface
//!
//! Keeps the last presented frame in memory. Used when no display is
//! available and by tests that inspect what would have been shown.

use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::core::Size;
use crate::error::Result;

use super::{Frame, Surface};

#[derive(Default)]
struct Shown {
    frame: Option<Arc<Frame>>,
    title: String,
    presented: u64,
}

/// Read access to what a headless surface last showed
#[derive(Clone, Default)]
pub struct FrameHandle {
    shown: Arc<Mutex<Shown>>,
}

impl FrameHandle {
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner).frame.clone()
    }

    pub fn title(&self) -> String {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner).title.clone()
    }

    /// Frames presented so far
    pub fn presented(&self) -> u64 {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner).presented
    }
}

#[derive(Default)]
pub struct HeadlessSurface {
    handle: FrameHandle,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> FrameHandle {
        self.handle.clone()
    }
}

impl Surface for HeadlessSurface {
    fn name(&self) -> &str {
        "headless"
    }

    fn init(&mut self, title: &str, size: Size, cell_size: Size) -> Result<()> {
        debug!("Headless surface: {} cells of {}", size, cell_size);
        self.set_title(title);
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        let mut shown = self.handle.shown.lock().unwrap_or_else(PoisonError::into_inner);
        shown.frame = Some(Arc::new(frame.clone()));
        shown.presented += 1;
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        self.handle.shown.lock().unwrap_or_else(PoisonError::into_inner).title = title.to_string();
    }

    fn shutdown(&mut self) {
        debug!("Headless surface shut down");
    }
}

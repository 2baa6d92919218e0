//! Input Queue - Events between the platform and the application
//!
//! The platform side holds an `InputSender` and pushes events from any
//! thread; the session owns the `InputQueue` and blocks in `read`.
//! Events the filter rejects never enter the queue but still update the
//! state table at push time. Queued events update it when dequeued, so
//! `state()` always describes the last event the application has seen.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::Size;
use crate::error::{EngineError, Result};

use super::keys::*;

/// Events held before the oldest is dropped
pub const QUEUE_CAPACITY: usize = 4096;

/// A platform input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Keyboard key press or release
    Key {
        code: i32,
        released: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        character: Option<char>,
    },
    /// Mouse button press or release
    MouseButton { code: i32, released: bool, clicks: i32 },
    /// Pointer moved, in pixels
    MouseMove { x: i32, y: i32 },
    /// Wheel turned; positive is down
    MouseScroll { delta: i32 },
    /// Window resized, in cells
    Resize { width: i32, height: i32 },
    /// Window close requested
    Close,
}

impl Event {
    /// Code reported by `read`, including the release flag
    pub fn code(&self) -> i32 {
        match *self {
            Event::Key { code, released, .. } | Event::MouseButton { code, released, .. } => {
                if released {
                    code | TK_KEY_RELEASED
                } else {
                    code
                }
            }
            Event::MouseMove { .. } => TK_MOUSE_MOVE,
            Event::MouseScroll { .. } => TK_MOUSE_SCROLL,
            Event::Resize { .. } => TK_RESIZED,
            Event::Close => TK_CLOSE,
        }
    }

    fn is_release(&self) -> bool {
        matches!(
            self,
            Event::Key { released: true, .. } | Event::MouseButton { released: true, .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterTarget {
    Keyboard,
    Mouse,
    System,
    Code(i32),
}

/// Which events reach the queue (`input.filter`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFilter {
    /// Target and whether its releases pass too
    entries: Vec<(FilterTarget, bool)>,
}

impl InputFilter {
    /// Parse a comma separated list like `keyboard+, mouse, escape`
    pub fn parse(s: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let (name, releases) = match item.strip_suffix('+') {
                Some(name) => (name.trim(), true),
                None => (item, false),
            };
            let target = match name.to_ascii_lowercase().as_str() {
                "keyboard" => FilterTarget::Keyboard,
                "mouse" => FilterTarget::Mouse,
                "system" => FilterTarget::System,
                other => code_from_name(other)
                    .map(FilterTarget::Code)
                    .ok_or_else(|| EngineError::config(format!("unknown input filter entry '{}'", item)))?,
            };
            entries.push((target, releases));
        }
        Ok(Self { entries })
    }

    /// Whether `event` passes. Close and resize always do.
    pub fn accepts(&self, event: &Event) -> bool {
        if matches!(event, Event::Close | Event::Resize { .. }) {
            return true;
        }
        let code = event.code() & !TK_KEY_RELEASED;
        let release = event.is_release();
        self.entries.iter().any(|&(target, releases)| {
            let hit = match target {
                FilterTarget::Keyboard => is_keyboard(code),
                FilterTarget::Mouse => is_mouse(code),
                FilterTarget::System => false,
                FilterTarget::Code(c) => c == code,
            };
            hit && (!release || releases)
        })
    }
}

impl Default for InputFilter {
    fn default() -> Self {
        Self {
            entries: vec![(FilterTarget::Keyboard, true), (FilterTarget::Mouse, true)],
        }
    }
}

impl fmt::Display for InputFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (target, releases)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match target {
                FilterTarget::Keyboard => write!(f, "keyboard")?,
                FilterTarget::Mouse => write!(f, "mouse")?,
                FilterTarget::System => write!(f, "system")?,
                FilterTarget::Code(c) => write!(f, "{:#04X}", c)?,
            }
            if *releases {
                write!(f, "+")?;
            }
        }
        Ok(())
    }
}

struct QueueState {
    events: VecDeque<Event>,
    state: Vec<i32>,
    filter: InputFilter,
    precise_mouse: bool,
    sticky_close: bool,
    /// A close event has been read
    close_seen: bool,
    /// The session is shutting down
    closing: bool,
    cell_size: Size,
    last_mouse_cell: (i32, i32),
    dropped: u64,
    overflowing: bool,
}

impl QueueState {
    fn apply(&mut self, event: &Event) {
        let set = |state: &mut Vec<i32>, slot: i32, value: i32| {
            if let Some(s) = usize::try_from(slot).ok().and_then(|i| state.get_mut(i)) {
                *s = value;
            }
        };
        match *event {
            Event::Key { code, released, character } => {
                set(&mut self.state, code, (!released) as i32);
                let wchar = match (released, character) {
                    (false, Some(c)) => c as i32,
                    _ => 0,
                };
                set(&mut self.state, TK_WCHAR, wchar);
                set(&mut self.state, TK_CHAR, if wchar < 0x100 { wchar } else { 0 });
            }
            Event::MouseButton { code, released, clicks } => {
                set(&mut self.state, code, (!released) as i32);
                set(&mut self.state, TK_MOUSE_CLICKS, clicks);
            }
            Event::MouseMove { x, y } => {
                set(&mut self.state, TK_MOUSE_PIXEL_X, x);
                set(&mut self.state, TK_MOUSE_PIXEL_Y, y);
                let (cx, cy) = self.cell_of(x, y);
                set(&mut self.state, TK_MOUSE_X, cx);
                set(&mut self.state, TK_MOUSE_Y, cy);
            }
            Event::MouseScroll { delta } => set(&mut self.state, TK_MOUSE_WHEEL, delta),
            Event::Resize { width, height } => {
                set(&mut self.state, TK_WIDTH, width);
                set(&mut self.state, TK_HEIGHT, height);
            }
            Event::Close => set(&mut self.state, TK_CLOSE, 1),
        }
    }

    fn cell_of(&self, x: i32, y: i32) -> (i32, i32) {
        (
            x.div_euclid(self.cell_size.width.max(1)),
            y.div_euclid(self.cell_size.height.max(1)),
        )
    }

    fn close_latched(&self) -> bool {
        self.closing || (self.sticky_close && self.close_seen)
    }

    fn push(&mut self, event: Event) {
        if let Event::MouseMove { x, y } = event {
            let cell = self.cell_of(x, y);
            let same_cell = cell == self.last_mouse_cell;
            self.last_mouse_cell = cell;
            if same_cell && !self.precise_mouse {
                self.apply(&event);
                return;
            }
        }

        if !self.filter.accepts(&event) {
            self.apply(&event);
            return;
        }

        if self.events.len() >= QUEUE_CAPACITY {
            self.events.pop_front();
            self.dropped += 1;
            if !self.overflowing {
                warn!("Input queue full, dropping oldest events ({} dropped so far)", self.dropped);
                self.overflowing = true;
            }
        } else {
            self.overflowing = false;
        }
        self.events.push_back(event);
    }

    fn pop(&mut self) -> Option<Event> {
        let event = self.events.pop_front()?;
        self.apply(&event);
        let code = event.code();
        if let Some(slot) = self.state.get_mut(TK_EVENT as usize) {
            *slot = code;
        }
        if event == Event::Close {
            self.close_seen = true;
        }
        Some(event)
    }
}

type Shared = Arc<(Mutex<QueueState>, Condvar)>;

fn lock(shared: &Shared) -> MutexGuard<'_, QueueState> {
    shared.0.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Platform-side handle for pushing events
#[derive(Clone)]
pub struct InputSender {
    shared: Shared,
}

impl InputSender {
    pub fn push(&self, event: Event) {
        let mut state = lock(&self.shared);
        state.push(event);
        self.shared.1.notify_all();
    }

    /// Pixel size of a cell, for converting between pixels and cells
    pub fn cell_size(&self) -> Size {
        lock(&self.shared).cell_size
    }
}

/// Application-side event queue and state table
pub struct InputQueue {
    shared: Shared,
}

impl InputQueue {
    pub fn new() -> Self {
        let state = QueueState {
            events: VecDeque::new(),
            state: vec![0; STATE_SLOTS],
            filter: InputFilter::default(),
            precise_mouse: false,
            sticky_close: true,
            close_seen: false,
            closing: false,
            cell_size: Size::new(1, 1),
            last_mouse_cell: (-1, -1),
            dropped: 0,
            overflowing: false,
        };
        Self {
            shared: Arc::new((Mutex::new(state), Condvar::new())),
        }
    }

    pub fn sender(&self) -> InputSender {
        InputSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Whether `read` would return without blocking
    pub fn has_input(&self) -> bool {
        let state = lock(&self.shared);
        state.close_latched() || !state.events.is_empty()
    }

    /// Next event, blocking until one arrives. Once closing (or after a
    /// close has been read with sticky close on) this returns `Close`.
    pub fn read(&self) -> Event {
        let (mutex, condvar) = &*self.shared;
        let mut state = mutex.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if state.close_latched() {
                return Event::Close;
            }
            if let Some(event) = state.pop() {
                return event;
            }
            state = condvar.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Code of the next event without removing it, 0 when none
    pub fn peek(&self) -> i32 {
        let state = lock(&self.shared);
        if state.close_latched() {
            return TK_CLOSE;
        }
        state.events.front().map(|e| e.code()).unwrap_or(0)
    }

    /// Value of a state slot; 0 for anything out of range
    pub fn state(&self, slot: i32) -> i32 {
        let state = lock(&self.shared);
        usize::try_from(slot)
            .ok()
            .and_then(|i| state.state.get(i).copied())
            .unwrap_or(0)
    }

    pub fn configure(&self, filter: InputFilter, precise_mouse: bool, sticky_close: bool) {
        let mut state = lock(&self.shared);
        state.filter = filter;
        state.precise_mouse = precise_mouse;
        state.sticky_close = sticky_close;
    }

    pub fn set_cell_size(&self, size: Size) {
        lock(&self.shared).cell_size = size;
    }

    /// Record the window size in cells
    pub fn set_size(&self, size: Size) {
        let mut state = lock(&self.shared);
        state.state[TK_WIDTH as usize] = size.width;
        state.state[TK_HEIGHT as usize] = size.height;
    }

    /// Wake every blocked reader; all later reads return `Close`
    pub fn shutdown(&self) {
        let mut state = lock(&self.shared);
        state.closing = true;
        self.shared.1.notify_all();
    }

    /// Events lost to overflow since creation
    pub fn dropped(&self) -> u64 {
        lock(&self.shared).dropped
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

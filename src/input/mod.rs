//! Input Module
//!
//! Key codes, the event queue with its state table, the terminal byte
//! parser that feeds it, and the `read_str` line editor.

pub mod keys;
pub mod line_edit;
pub mod parser;
pub mod queue;

pub use line_edit::{LineEditor, LineOutcome};
pub use parser::InputParser;
pub use queue::{Event, InputFilter, InputQueue, InputSender, QUEUE_CAPACITY};

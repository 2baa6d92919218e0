//! Configuration Module
//!
//! The option string format and the schema it is validated against.

pub mod options;
pub mod parser;

pub use options::{Options, Update};
pub use parser::{parse_options, OptionGroup};

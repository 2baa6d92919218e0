//! Engine error taxonomy
//!
//! Drawing calls never fail on coordinates; the errors below cover
//! configuration, font loading, lifecycle and platform failures.

/// Errors surfaced by the engine API.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed or unrecognized option string; nothing was applied.
    #[error("config error: {0}")]
    Config(String),

    /// Tileset source unreadable or in an unsupported format.
    #[error("font load error: {0}")]
    FontLoad(String),

    /// The session has been closed.
    #[error("engine is closed")]
    EngineClosed,

    /// The session has not been opened yet.
    #[error("engine is not open")]
    NotOpen,

    /// Display surface could not be initialized.
    #[error("platform init error: {0}")]
    PlatformInit(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }

    pub fn font(msg: impl Into<String>) -> Self {
        EngineError::FontLoad(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

//! Error types for the heartbeat process
//!
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations. The binary wraps these in `anyhow` at the
//! wiring layer.

use thiserror::Error;

/// The primary error type for heartbeat operations.
#[derive(Error, Debug)]
pub enum HeartbeatError {
    /// Configuration errors (bad preset name, malformed signal rule, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signal listener installation or parsing failures
    #[error("Signal error: {0}")]
    Signal(String),

    /// The one-shot entropy echo failed to produce its bytes
    #[error("Entropy echo failed: {0}")]
    Entropy(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON config file errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for heartbeat operations.
pub type Result<T> = std::result::Result<T, HeartbeatError>;

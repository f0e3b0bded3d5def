//! Error types for vcplay
//!
//! Defines service-specific error types using thiserror for clear error
//! propagation. All playback operations recover failures at the operation
//! boundary; nothing in here is ever allowed to take the process down.

use thiserror::Error;

/// Main error type for vcplay
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Voice transport errors (join/leave/stream-change could not complete)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation not valid in the chat's current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using vcplay Error
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the admission gate.

use thiserror::Error;

/// Main error type for gate operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// Malformed period, time or limit input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Lookup of an actor that is not registered
    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;

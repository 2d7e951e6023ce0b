//! Error types for FrameZone.
//!
//! Only setup paths are fallible. Buffer navigation reports misses as
//! values, never as errors.

use thiserror::Error;

/// Main error type for FrameZone operations.
#[derive(Error, Debug)]
pub enum FrameZoneError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

/// Result type alias for FrameZone operations.
pub type Result<T> = std::result::Result<T, FrameZoneError>;

//! # Error Types
//!
//! Custom error types for Sonde Ingest using `thiserror`.

use thiserror::Error;

/// Main error type for Sonde Ingest
#[derive(Debug, Error)]
pub enum IngestError {
    /// Raw input is not a well-formed telemetry frame
    #[error("Frame format error: {0}")]
    Format(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Sonde Ingest
pub type Result<T> = std::result::Result<T, IngestError>;

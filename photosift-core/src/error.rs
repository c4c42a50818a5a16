//! Error types for photosift-core
//!
//! Defines engine-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the carousel engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (invalid combination of settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding errors
    #[error("Image decode error: {0}")]
    Decode(String),

    /// Item not present in the live sequence
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote source adapter errors (unreachable, malformed page, download)
    #[error("Remote source error: {0}")]
    Remote(String),

    /// Remote source has no further pages
    #[error("Remote source exhausted")]
    Exhausted,

    /// Soft-delete or restore failed
    #[error("Quarantine error: {0}")]
    Quarantine(String),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background worker is no longer running
    #[error("Background worker stopped")]
    WorkerStopped,

    /// Bootstrap configuration errors from photosift-common
    #[error(transparent)]
    Common(#[from] photosift_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Convenience Result type using photosift-core Error
pub type Result<T> = std::result::Result<T, Error>;

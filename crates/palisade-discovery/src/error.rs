//! Error types for palisade-discovery.

use thiserror::Error;

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur setting up discovery.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket setup or I/O failure.
    #[error("discovery I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The local advertisement could not be encoded.
    #[error("advertisement encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

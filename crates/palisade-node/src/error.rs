//! Error types for the node.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a node.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] palisade_discovery::Error),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] palisade_protocol::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Peer refused or mishandled a delivery
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

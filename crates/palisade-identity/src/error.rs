//! Error types for palisade-identity.

use thiserror::Error;

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur handling participant identities.
#[derive(Debug, Error)]
pub enum Error {
    /// Key bytes did not decode to a valid Ed25519 public key.
    #[error("invalid public key: {0}")]
    InvalidKey(#[from] ed25519_dalek::SignatureError),
}

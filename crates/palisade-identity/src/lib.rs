//! Participant identity for Palisade.
//!
//! Every node in the demo generates an Ed25519 key pair exactly once at
//! startup and addresses itself by a PID string derived from its HTTP
//! endpoint. Keys and signatures travel hex-encoded; log lines carry the
//! short fingerprints from [`fingerprint`] instead of full hex blobs.

mod advert;
mod error;
mod material;
mod pid;

pub use advert::Advertisement;
pub use error::{Error, Result};
pub use material::{decode_public_key, verify, KeyMaterial};
pub use pid::ParticipantId;

/// Short fingerprint of a hex string for log output.
///
/// Eight leading characters are plenty to eyeball-match keys and
/// signatures across node logs.
pub fn fingerprint(text: &str) -> String {
    let head: String = text.chars().take(8).collect();
    format!("{}...", head)
}

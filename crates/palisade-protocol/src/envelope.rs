//! Signed message envelope.
//!
//! The field names are the wire format: an envelope travels as the query
//! string of `GET /RECEIVE_SIGNED?senderPID=..&plainText=..&signature=..`
//! with the signature hex-encoded.

use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

use palisade_identity::{KeyMaterial, ParticipantId};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// PID the envelope claims to come from. Forgers lie here.
    #[serde(rename = "senderPID")]
    pub sender: ParticipantId,
    #[serde(rename = "plainText")]
    pub plain_text: String,
    /// Hex-encoded Ed25519 signature over the plain text bytes.
    pub signature: String,
}

/// Outcome of checking an envelope against the expected signer's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Signature matches: the sender is who it claims to be.
    Welcome,
    /// Signature does not match: someone is posing as the claimed sender.
    Intruder,
}

impl Envelope {
    /// Sign `plain_text` with `material` and claim `sender` as origin.
    pub fn signed(sender: ParticipantId, plain_text: &str, material: &KeyMaterial) -> Self {
        let signature = material.sign(plain_text.as_bytes());
        Self {
            sender,
            plain_text: plain_text.to_string(),
            signature: hex::encode(signature.to_bytes()),
        }
    }

    /// Sign with our own key but claim the victim's PID.
    ///
    /// The signature is honest, the sender field is not. A verifier
    /// holding the victim's real key sees the mismatch immediately.
    pub fn forged(victim: ParticipantId, plain_text: &str, material: &KeyMaterial) -> Self {
        Self::signed(victim, plain_text, material)
    }

    /// Check the signature against `key`.
    ///
    /// A signature that does not even decode is an error, not a verdict;
    /// a well-formed signature by the wrong key is [`Verdict::Intruder`].
    pub fn verify_against(&self, key: &VerifyingKey) -> Result<Verdict> {
        let bytes = hex::decode(&self.signature)
            .map_err(|e| Error::SignatureDecode(e.to_string()))?;
        let signature = Signature::from_slice(&bytes)
            .map_err(|e| Error::SignatureDecode(e.to_string()))?;
        if palisade_identity::verify(key, self.plain_text.as_bytes(), &signature) {
            Ok(Verdict::Welcome)
        } else {
            Ok(Verdict::Intruder)
        }
    }
}

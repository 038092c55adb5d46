//! Self-advertisement records.

use serde::{Deserialize, Serialize};

use crate::pid::ParticipantId;

/// What a node announces about itself during discovery.
///
/// Built once at startup and repeated verbatim until the process exits;
/// nothing in here ever mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    /// Host peers can reach the HTTP endpoint on.
    pub host: String,
    /// HTTP port; doubles as the roster ordering key.
    pub port: u16,
    /// Ed25519 public key bytes.
    pub public_key: [u8; 32],
}

impl Advertisement {
    /// The participant id this advertisement claims.
    pub fn pid(&self) -> ParticipantId {
        ParticipantId::from_host_port(&self.host, self.port)
    }
}

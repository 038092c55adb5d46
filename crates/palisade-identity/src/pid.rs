//! Participant identifiers.

use serde::{Deserialize, Serialize};

/// Unique participant identifier: the node's HTTP endpoint as a URI string.
///
/// The PID is the sole equality key in the demo. It is built once, when the
/// node knows its bound address, and doubles as the base URL peers use to
/// reach the node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Build a PID from the advertised host and HTTP port.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self(format!("http://{}:{}", host, port))
    }

    /// The PID as a string, usable as an HTTP base URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//! UDP peer discovery for Palisade.
//!
//! Every node announces a small JSON advertisement (host, HTTP port,
//! public key) on an interval and listens for the same from its peers.
//! Newly learned advertisements are forwarded to everyone already known,
//! and a newcomer is caught up with the full set, so a single seed address
//! is enough for a small group to converge.
//!
//! The service owns the socket and the known-peer map. Consumers receive
//! whole-roster snapshots over a channel and never share mutable discovery
//! state; the roster always includes the local node's own advertisement.

mod error;
mod service;

pub use error::{Error, Result};
pub use palisade_identity::Advertisement;
pub use service::{DiscoveryConfig, DiscoveryHandle, DiscoveryService};

//! Forgery-detection exchange protocol.
//!
//! Three pieces, all transport-free:
//!
//! - [`Registry`]: orders advertised participants and locks the roster,
//!   which fixes every node's [`Role`].
//! - [`Envelope`]: the signed message as it travels on the wire.
//! - [`Exchange`]: the per-node state machine that decides what to send,
//!   what to expect and when to clean up.
//!
//! The node crate supplies discovery snapshots and HTTP transport around
//! these.

mod envelope;
mod error;
mod exchange;
mod registry;

pub use envelope::{Envelope, Verdict};
pub use error::{Error, Result};
pub use exchange::{Action, Exchange, Phase, ReceivePolicy};
pub use registry::{Participant, Registry, Role, UpdateOutcome};

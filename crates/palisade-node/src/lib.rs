//! Palisade Node - Forgery Detection Demo
//!
//! A small swarm of nodes discovers itself over UDP, locks an ordered
//! participant roster and runs one signed exchange: the first member
//! signs a message to the second, every later member forges the first
//! member's identity, and the receiver's audit trail shows who was
//! welcome and who was posing.
//!
//! # Architecture
//!
//! - **Config**: environment-driven settings (`PALISADE_*`)
//! - **Node**: lifecycle from bind to cleanup, plus shared state
//! - **API**: HTTP endpoints, `/RECEIVE_SIGNED` being the wire protocol
//! - **Sender**: HTTP delivery of envelopes to peers
//!
//! # Example
//!
//! ```no_run
//! use palisade_node::{Node, NodeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env();
//!     let node = Node::bind(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod node;
pub mod sender;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::{Node, NodeState};
pub use sender::EnvelopeSender;

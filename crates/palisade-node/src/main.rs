//! Palisade node binary.
//!
//! Discovers its peers over UDP, locks the participant roster and plays
//! whatever role its roster index assigns in the signed exchange.

use palisade_node::{Node, NodeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palisade_node=info,audit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Palisade node");

    let config = NodeConfig::from_env();

    let node = Node::bind(config).await?;
    tracing::info!("PID: {}", node.pid());
    node.run().await?;

    Ok(())
}

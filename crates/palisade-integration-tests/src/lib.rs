//! Shared wiring for the end-to-end tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use palisade_node::NodeConfig;
use palisade_protocol::ReceivePolicy;

/// Node config tuned for loopback tests.
///
/// Ephemeral ports everywhere, a short discovery window, fast announces
/// and a receive quota so the verifier actually finishes.
pub fn test_config(audit_log: PathBuf, announce_to: Vec<SocketAddr>) -> NodeConfig {
    NodeConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        discovery_bind: "127.0.0.1:0".parse().unwrap(),
        announce_to,
        announce_interval: Duration::from_millis(50),
        discovery_window: Duration::from_millis(1500),
        cleanup_delay: Duration::from_millis(200),
        message: "Go Ducks!".to_string(),
        receive_policy: ReceivePolicy::CleanupAfter(2),
        send_timeout: Duration::from_secs(5),
        audit_log,
    }
}

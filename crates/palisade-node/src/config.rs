//! Node configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use palisade_protocol::ReceivePolicy;

/// Configuration for a Palisade node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Host the HTTP server binds to and advertises in the PID
    pub host: String,

    /// HTTP port; 0 lets the OS pick one
    pub port: u16,

    /// Discovery socket bind address
    pub discovery_bind: SocketAddr,

    /// Where discovery announcements go
    pub announce_to: Vec<SocketAddr>,

    /// Announcement interval
    pub announce_interval: Duration,

    /// How long to collect advertisements before locking the roster
    pub discovery_window: Duration,

    /// Pause between entering cleanup and exiting
    pub cleanup_delay: Duration,

    /// The message the signer signs
    pub message: String,

    /// How long a receiving node keeps classifying envelopes
    pub receive_policy: ReceivePolicy,

    /// Timeout for envelope deliveries
    pub send_timeout: Duration,

    /// Audit trail file
    pub audit_log: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let host = std::env::var("PALISADE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PALISADE_PORT")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .expect("Invalid PALISADE_PORT");

        let discovery_bind = std::env::var("PALISADE_DISCOVERY_BIND")
            .unwrap_or_else(|_| "0.0.0.0:7777".to_string())
            .parse()
            .expect("Invalid PALISADE_DISCOVERY_BIND");

        let announce_to = std::env::var("PALISADE_ANNOUNCE")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| p.parse().expect("Invalid PALISADE_ANNOUNCE"))
                    .collect()
            })
            .unwrap_or_else(|_| vec!["255.255.255.255:7777".parse().unwrap()]);

        let announce_interval = Duration::from_millis(
            std::env::var("PALISADE_ANNOUNCE_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("Invalid PALISADE_ANNOUNCE_INTERVAL_MS"),
        );

        let discovery_window = Duration::from_millis(
            std::env::var("PALISADE_DISCOVERY_WINDOW_MS")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("Invalid PALISADE_DISCOVERY_WINDOW_MS"),
        );

        let cleanup_delay = Duration::from_millis(
            std::env::var("PALISADE_CLEANUP_DELAY_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .expect("Invalid PALISADE_CLEANUP_DELAY_MS"),
        );

        let message =
            std::env::var("PALISADE_MESSAGE").unwrap_or_else(|_| "Go Ducks!".to_string());

        // Unset or empty keeps the node listening until it is stopped.
        let receive_policy = match std::env::var("PALISADE_VERIFY_LIMIT") {
            Ok(v) if !v.trim().is_empty() => ReceivePolicy::CleanupAfter(
                v.trim().parse().expect("Invalid PALISADE_VERIFY_LIMIT"),
            ),
            _ => ReceivePolicy::KeepListening,
        };

        let send_timeout = Duration::from_millis(
            std::env::var("PALISADE_SEND_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .expect("Invalid PALISADE_SEND_TIMEOUT_MS"),
        );

        let audit_log = std::env::var("PALISADE_AUDIT_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("audit.log"));

        Self {
            host,
            port,
            discovery_bind,
            announce_to,
            announce_interval,
            discovery_window,
            cleanup_delay,
            message,
            receive_policy,
            send_timeout,
            audit_log,
        }
    }
}

//! Node lifecycle: discover peers, lock the roster, play the assigned
//! role, clean up.
//!
//! Architecture:
//! - HTTP server comes up first so envelopes can land at any time
//! - UDP discovery collects advertisements until the window closes
//! - The locked roster fixes the role; the exchange state machine drives
//!   what happens next
//! - Every observable step lands in the audit trail

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Notify, RwLock};
use tracing::{error, info};

use palisade_audit::AuditLog;
use palisade_discovery::{DiscoveryConfig, DiscoveryService};
use palisade_identity::{fingerprint, Advertisement, KeyMaterial, ParticipantId};
use palisade_protocol::{Action, Envelope, Exchange, Phase, Registry, Verdict};

use crate::api;
use crate::config::NodeConfig;
use crate::error::Result;
use crate::sender::EnvelopeSender;

/// Shared state for a node, reachable from the HTTP handlers.
pub struct NodeState {
    pub config: NodeConfig,
    pub pid: ParticipantId,
    pub port: u16,
    registry: RwLock<Registry>,
    exchange: RwLock<Option<Exchange>>,
    audit: AuditLog,
    cleanup: Notify,
    early_classified: AtomicU32,
}

impl NodeState {
    pub fn registry(&self) -> &RwLock<Registry> {
        &self.registry
    }

    /// Current phase; `INIT` until the exchange exists.
    pub async fn phase(&self) -> Phase {
        match self.exchange.read().await.as_ref() {
            Some(exchange) => exchange.phase(),
            None => Phase::Init,
        }
    }

    /// Classify an incoming envelope and audit the verdict.
    ///
    /// Envelopes can beat the roster lock. Those are checked against
    /// whoever the roster currently names as expected signer and the
    /// verdict count is kept so the exchange absorbs it on install.
    /// Holding the exchange write lock across both paths is what makes
    /// that hand-off lossless.
    pub async fn handle_envelope(&self, envelope: Envelope) {
        let sig = fingerprint(&envelope.signature);
        let mut guard = self.exchange.write().await;
        match guard.as_mut() {
            Some(exchange) => {
                let tag = exchange.phase().tag();
                self.audit.record(
                    tag,
                    &[
                        "Envelope:",
                        "Sender:",
                        envelope.sender.as_str(),
                        "Plain:",
                        &envelope.plain_text,
                        "Signature:",
                        &sig,
                    ],
                );
                match exchange.classify(&envelope) {
                    Ok(Verdict::Welcome) => {
                        self.audit.record(
                            tag,
                            &["WELCOME!!", envelope.sender.as_str(), "Signature:", &sig],
                        );
                    }
                    Ok(Verdict::Intruder) => {
                        self.audit.record(
                            tag,
                            &[
                                "INTRUDER ALERT!!! Posing as:",
                                envelope.sender.as_str(),
                                "Signature:",
                                &sig,
                            ],
                        );
                    }
                    Err(e) => {
                        self.audit
                            .record(tag, &["Discarding envelope:", &e.to_string()]);
                    }
                }
                if exchange.phase() == Phase::Cleanup {
                    self.cleanup.notify_one();
                }
            }
            None => {
                self.audit.record(
                    "INIT",
                    &[
                        "Envelope:",
                        "Sender:",
                        envelope.sender.as_str(),
                        "Plain:",
                        &envelope.plain_text,
                        "Signature:",
                        &sig,
                    ],
                );
                let registry = self.registry.read().await;
                match registry.expected_signer() {
                    Some(signer) => match envelope.verify_against(&signer.public_key) {
                        Ok(Verdict::Welcome) => {
                            self.early_classified.fetch_add(1, Ordering::Relaxed);
                            self.audit.record(
                                "INIT",
                                &["WELCOME!!", envelope.sender.as_str(), "Signature:", &sig],
                            );
                        }
                        Ok(Verdict::Intruder) => {
                            self.early_classified.fetch_add(1, Ordering::Relaxed);
                            self.audit.record(
                                "INIT",
                                &[
                                    "INTRUDER ALERT!!! Posing as:",
                                    envelope.sender.as_str(),
                                    "Signature:",
                                    &sig,
                                ],
                            );
                        }
                        Err(e) => {
                            self.audit
                                .record("INIT", &["Discarding envelope:", &e.to_string()]);
                        }
                    },
                    None => {
                        self.audit
                            .record("INIT", &["Discarding envelope:", "roster is empty"]);
                    }
                }
            }
        }
    }
}

/// A Palisade node instance.
pub struct Node {
    state: Arc<NodeState>,
    listener: TcpListener,
    material: KeyMaterial,
    discovery: DiscoveryService,
}

impl Node {
    /// Bind the HTTP listener and the discovery socket.
    ///
    /// Binding happens before anything else because the PID is the HTTP
    /// endpoint: with port 0 the OS picks one and the advertisement must
    /// carry the real port.
    pub async fn bind(config: NodeConfig) -> Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let port = listener.local_addr()?.port();
        let pid = ParticipantId::from_host_port(&config.host, port);
        let material = KeyMaterial::generate();

        let discovery = DiscoveryService::bind(DiscoveryConfig {
            bind: config.discovery_bind,
            announce_to: config.announce_to.clone(),
            interval: config.announce_interval,
        })?;

        let audit = AuditLog::new(&config.audit_log, pid.clone());

        let state = Arc::new(NodeState {
            pid: pid.clone(),
            port,
            registry: RwLock::new(Registry::new(pid)),
            exchange: RwLock::new(None),
            audit,
            cleanup: Notify::new(),
            early_classified: AtomicU32::new(0),
            config,
        });

        Ok(Self {
            state,
            listener,
            material,
            discovery,
        })
    }

    pub fn pid(&self) -> &ParticipantId {
        &self.state.pid
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn discovery_addr(&self) -> SocketAddr {
        self.discovery.local_addr()
    }

    /// Get the shared state (for API handlers and tests).
    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    /// Run the node end to end.
    ///
    /// Returns once cleanup finishes. A verifier configured to keep
    /// listening never reaches cleanup and runs until the process is
    /// stopped.
    pub async fn run(self) -> Result<()> {
        let Node {
            state,
            listener,
            material,
            discovery,
        } = self;

        state
            .audit
            .record("INIT", &["Server started at:", state.pid.as_str()]);

        // HTTP first: envelopes may race discovery.
        let app = api::build_router(Arc::clone(&state));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("HTTP server error: {}", e);
            }
        });

        let advert = Advertisement {
            host: state.config.host.clone(),
            port: state.port,
            public_key: material.public_key_bytes(),
        };
        let (discovery_handle, mut snapshots) = discovery.spawn(advert)?;

        let window_ms = state.config.discovery_window.as_millis().to_string();
        state
            .audit
            .record("INIT", &["### Discovery Initiated for", &window_ms, "ms"]);

        let window = tokio::time::sleep(state.config.discovery_window);
        tokio::pin!(window);
        loop {
            tokio::select! {
                _ = &mut window => break,
                snapshot = snapshots.recv() => {
                    match snapshot {
                        Some(roster) => {
                            let mut registry = state.registry.write().await;
                            registry.update(&roster);
                        }
                        None => break,
                    }
                }
            }
        }
        discovery_handle.shutdown();

        {
            let mut registry = state.registry.write().await;
            let role = match registry.lock() {
                Ok(role) => role,
                Err(e) => {
                    state
                        .audit
                        .record("INIT", &["Aborting, roster cannot lock:", &e.to_string()]);
                    return Err(e.into());
                }
            };
            state.audit.record(
                "INIT",
                &["### Discovery Complete and Locked. Participant list is:"],
            );
            for (i, participant) in registry.members().iter().enumerate() {
                let index = format!("[{}]", i);
                let key = fingerprint(&participant.public_key_hex());
                state
                    .audit
                    .record("INIT", &[&index, participant.pid.as_str(), &key]);
            }
            let separator = "=".repeat(54);
            state.audit.record("INIT", &[&separator]);
            state.audit.record("INIT", &["Beginning exchange..."]);
            info!(
                "Roster locked with {} members, role: {}",
                registry.members().len(),
                role
            );
        }

        let (mut exchange, action) = {
            let registry = state.registry.read().await;
            Exchange::begin(
                &registry,
                &material,
                &state.config.message,
                state.config.receive_policy,
            )?
        };

        // Install under the exchange lock so no early verdict slips
        // between the counter swap and the install.
        let phase = {
            let mut guard = state.exchange.write().await;
            let early = state.early_classified.swap(0, Ordering::Relaxed);
            if early > 0 {
                info!("Absorbed {} early verdicts", early);
            }
            let phase = exchange.absorb_early_verdicts(early);
            *guard = Some(exchange);
            phase
        };

        match action {
            Action::Transmit { target, envelope } => {
                let tag = phase.tag();
                let url = format!("{}/RECEIVE_SIGNED", target.pid.as_str());
                state.audit.record(tag, &["RECEIVE_SIGNED to", &url]);
                let sig = fingerprint(&envelope.signature);
                state.audit.record(
                    tag,
                    &[
                        "Sender:",
                        envelope.sender.as_str(),
                        "Plain:",
                        &envelope.plain_text,
                        "Signature:",
                        &sig,
                    ],
                );

                let sender = EnvelopeSender::new(state.config.send_timeout)?;
                match sender.deliver(target.pid.as_str(), &envelope).await {
                    Ok(()) => state.audit.record(tag, &["Receiver acknowledged"]),
                    Err(e) => state
                        .audit
                        .record(tag, &["Delivery failed:", &e.to_string()]),
                }

                let mut guard = state.exchange.write().await;
                if let Some(exchange) = guard.as_mut() {
                    exchange.transport_complete();
                }
            }
            Action::Listen => {
                if phase == Phase::ReceiveSigned {
                    state
                        .audit
                        .record(phase.tag(), &["Listening for signed envelopes"]);
                }
            }
        }

        // Senders are already in cleanup; a verifier with a quota gets
        // nudged by the envelope handler. One that keeps listening parks
        // here for good.
        loop {
            if state.phase().await == Phase::Cleanup {
                break;
            }
            state.cleanup.notified().await;
        }

        let delay_ms = state.config.cleanup_delay.as_millis().to_string();
        state
            .audit
            .record("CLEANUP", &["Entering cleanup for", &delay_ms, "ms"]);
        tokio::time::sleep(state.config.cleanup_delay).await;
        state
            .audit
            .record("CLEANUP", &["Cleanup complete... Exiting process"]);
        Ok(())
    }
}

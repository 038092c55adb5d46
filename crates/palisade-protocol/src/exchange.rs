//! Exchange state machine.
//!
//! Pure state, no transport: [`Exchange::begin`] tells the caller what to
//! do (transmit an envelope or listen), the caller reports back with
//! [`Exchange::transport_complete`] or feeds received envelopes through
//! [`Exchange::classify`]. The node crate wires this to HTTP.

use ed25519_dalek::VerifyingKey;

use palisade_identity::KeyMaterial;

use crate::envelope::{Envelope, Verdict};
use crate::error::{Error, Result};
use crate::registry::{Participant, Registry, Role};

/// Where a node is in the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Discovery still running, no exchange yet.
    Init,
    /// Signer: delivery of the honestly signed envelope is in flight.
    SendSigned,
    /// Verifier: waiting for envelopes.
    ReceiveSigned,
    /// Forger: delivery of the forged envelope is in flight.
    SendForged,
    /// Done with the exchange, winding down.
    Cleanup,
}

impl Phase {
    pub fn tag(&self) -> &'static str {
        match self {
            Phase::Init => "INIT",
            Phase::SendSigned => "SEND_SIGNED",
            Phase::ReceiveSigned => "RECEIVE_SIGNED",
            Phase::SendForged => "SEND_FORGED",
            Phase::Cleanup => "CLEANUP",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// How long a receiving node keeps classifying envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivePolicy {
    /// Classify forever; the process is stopped from outside.
    KeepListening,
    /// Enter cleanup once this many envelopes have been classified.
    CleanupAfter(u32),
}

impl Default for ReceivePolicy {
    fn default() -> Self {
        ReceivePolicy::KeepListening
    }
}

/// What the caller must do after [`Exchange::begin`].
#[derive(Debug, Clone)]
pub enum Action {
    /// Deliver the envelope to the target, then call
    /// [`Exchange::transport_complete`].
    Transmit {
        target: Participant,
        envelope: Envelope,
    },
    /// Wait for envelopes and feed them through [`Exchange::classify`].
    Listen,
}

/// Per-node exchange state, fixed at roster lock.
#[derive(Debug)]
pub struct Exchange {
    phase: Phase,
    role: Role,
    expected_signer: VerifyingKey,
    policy: ReceivePolicy,
    classified: u32,
}

impl Exchange {
    /// Start the exchange for whatever role the locked roster assigns.
    ///
    /// The signer signs `message` with its own key and addresses the
    /// roster's second member. Forgers do the same but claim the roster
    /// head's PID. The verifier just listens.
    pub fn begin(
        registry: &Registry,
        material: &KeyMaterial,
        message: &str,
        policy: ReceivePolicy,
    ) -> Result<(Self, Action)> {
        let index = registry.self_index().ok_or(Error::NotLocked)?;
        let role = Role::from_index(index);
        let expected_signer = registry
            .expected_signer()
            .ok_or_else(|| Error::RosterTooSmall(registry.members().len()))?;
        let expected_key = expected_signer.public_key;
        let victim_pid = expected_signer.pid.clone();

        let (phase, action) = match role {
            Role::Signer => {
                let target = registry
                    .receiver()
                    .ok_or_else(|| Error::RosterTooSmall(registry.members().len()))?
                    .clone();
                let sender = registry.members()[index].pid.clone();
                let envelope = Envelope::signed(sender, message, material);
                (Phase::SendSigned, Action::Transmit { target, envelope })
            }
            Role::Verifier => (Phase::ReceiveSigned, Action::Listen),
            Role::Forger => {
                let target = registry
                    .receiver()
                    .ok_or_else(|| Error::RosterTooSmall(registry.members().len()))?
                    .clone();
                let envelope = Envelope::forged(victim_pid, message, material);
                (Phase::SendForged, Action::Transmit { target, envelope })
            }
        };

        let exchange = Self {
            phase,
            role,
            expected_signer: expected_key,
            policy,
            classified: 0,
        };
        Ok((exchange, action))
    }

    /// Report that the transmit finished, successfully or not.
    ///
    /// Either way the sending node is done and moves to cleanup. Listening
    /// and cleanup phases are unaffected.
    pub fn transport_complete(&mut self) -> Phase {
        if matches!(self.phase, Phase::SendSigned | Phase::SendForged) {
            self.phase = Phase::Cleanup;
        }
        self.phase
    }

    /// Classify a received envelope against the expected signer's key.
    ///
    /// Counts toward the receive policy quota only while the node is in
    /// its listening phase; a node that is already cleaning up refuses.
    pub fn classify(&mut self, envelope: &Envelope) -> Result<Verdict> {
        if self.phase == Phase::Cleanup {
            return Err(Error::NotReceiving(self.phase.tag()));
        }
        let verdict = envelope.verify_against(&self.expected_signer)?;
        self.classified += 1;
        self.apply_quota();
        Ok(verdict)
    }

    /// Fold in verdicts classified before the exchange existed.
    ///
    /// Envelopes can race the discovery window; the node classifies them
    /// statelessly and hands the count over here so the quota still holds.
    pub fn absorb_early_verdicts(&mut self, count: u32) -> Phase {
        self.classified += count;
        self.apply_quota();
        self.phase
    }

    fn apply_quota(&mut self) {
        if self.phase != Phase::ReceiveSigned {
            return;
        }
        if let ReceivePolicy::CleanupAfter(limit) = self.policy {
            if self.classified >= limit {
                self.phase = Phase::Cleanup;
            }
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn classified(&self) -> u32 {
        self.classified
    }
}

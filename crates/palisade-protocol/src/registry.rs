//! Participant registry.
//!
//! Collects advertisements into an ordered roster and freezes it once the
//! discovery window closes. Every node sorts the same advertisements the
//! same way, so the index a node finds itself at is a shared fact and the
//! role assignment needs no negotiation.

use ed25519_dalek::VerifyingKey;
use tracing::{debug, warn};

use palisade_identity::{decode_public_key, Advertisement, ParticipantId};

use crate::error::{Error, Result};

/// A roster member: PID plus the key it advertised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub pid: ParticipantId,
    pub port: u16,
    pub public_key: VerifyingKey,
}

impl Participant {
    fn from_advert(advert: &Advertisement) -> palisade_identity::Result<Self> {
        Ok(Self {
            pid: advert.pid(),
            port: advert.port,
            public_key: decode_public_key(&advert.public_key)?,
        })
    }

    /// Advertised public key as lowercase hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.as_bytes())
    }
}

/// What an [`Registry::update`] call did with the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Snapshot applied, roster now has this many members.
    Applied(usize),
    /// Roster is locked, snapshot dropped.
    IgnoredLocked,
}

/// Role a participant plays in the exchange, fixed by roster index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Index 0: signs the message with its own key.
    Signer,
    /// Index 1: verifies everything against the signer's key.
    Verifier,
    /// Index 2 and up: signs with its own key but claims the signer's PID.
    Forger,
}

impl Role {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Role::Signer,
            1 => Role::Verifier,
            _ => Role::Forger,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Signer => "signer",
            Role::Verifier => "verifier",
            Role::Forger => "forger",
        };
        write!(f, "{}", name)
    }
}

/// Ordered, lockable participant roster.
#[derive(Debug, Clone)]
pub struct Registry {
    self_pid: ParticipantId,
    members: Vec<Participant>,
    self_index: Option<usize>,
    locked: bool,
}

impl Registry {
    pub fn new(self_pid: ParticipantId) -> Self {
        Self {
            self_pid,
            members: Vec::new(),
            self_index: None,
            locked: false,
        }
    }

    /// Replace the roster with a discovery snapshot.
    ///
    /// Members sort by port, then by PID string for distinct hosts sharing
    /// a port. Advertisements with undecodable keys are dropped. Snapshots
    /// arriving after [`lock`] are ignored.
    ///
    /// [`lock`]: Registry::lock
    pub fn update(&mut self, adverts: &[Advertisement]) -> UpdateOutcome {
        if self.locked {
            debug!("Roster is locked, dropping a {}-member snapshot", adverts.len());
            return UpdateOutcome::IgnoredLocked;
        }

        let mut members = Vec::with_capacity(adverts.len());
        for advert in adverts {
            match Participant::from_advert(advert) {
                Ok(participant) => members.push(participant),
                Err(e) => warn!("Dropping {} from roster: {}", advert.pid(), e),
            }
        }
        members.sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.pid.cmp(&b.pid)));
        self.members = members;
        UpdateOutcome::Applied(self.members.len())
    }

    /// Freeze the roster and take the role the sort order assigns us.
    ///
    /// Fails if the roster does not contain our own PID or has fewer than
    /// two members; the roster stays unlocked in both cases.
    pub fn lock(&mut self) -> Result<Role> {
        if self.locked {
            return Err(Error::AlreadyLocked);
        }
        let index = self
            .members
            .iter()
            .position(|p| p.pid == self.self_pid)
            .ok_or_else(|| Error::SelfMissing(self.self_pid.to_string()))?;
        if self.members.len() < 2 {
            return Err(Error::RosterTooSmall(self.members.len()));
        }
        self.self_index = Some(index);
        self.locked = true;
        Ok(Role::from_index(index))
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn members(&self) -> &[Participant] {
        &self.members
    }

    pub fn self_index(&self) -> Option<usize> {
        self.self_index
    }

    /// Role the lock assigned, `None` until locked.
    pub fn role(&self) -> Option<Role> {
        self.self_index.map(Role::from_index)
    }

    /// Member everyone verifies against: the roster head.
    ///
    /// Usable before the lock; envelopes that race the discovery window
    /// are checked against whatever the roster currently says.
    pub fn expected_signer(&self) -> Option<&Participant> {
        self.members.first()
    }

    /// Member the signer and the forgers deliver to.
    pub fn receiver(&self) -> Option<&Participant> {
        self.members.get(1)
    }
}

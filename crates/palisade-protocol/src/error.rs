use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Own PID {0} is missing from the roster")]
    SelfMissing(String),

    #[error("Roster is not locked yet")]
    NotLocked,

    #[error("Roster is already locked")]
    AlreadyLocked,

    #[error("Roster has {0} members, need at least 2")]
    RosterTooSmall(usize),

    #[error("Signature does not decode: {0}")]
    SignatureDecode(String),

    #[error("Not receiving envelopes in phase {0}")]
    NotReceiving(&'static str),
}

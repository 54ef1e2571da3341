use sentinel_types::{ChainConflict, ErrorCode};
use thiserror::Error;

/// Errors surfaced by [`crate::ReplicatedFsm::apply`] and its read paths.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("attestation signature did not verify")]
    Unauthenticated,
    #[error(transparent)]
    Conflict(#[from] ChainConflict),
    #[error("unknown key: {0}")]
    UnknownKey(String),
}

impl ErrorCode for FsmError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "FSM_MALFORMED",
            Self::Unauthenticated => "FSM_UNAUTHENTICATED",
            Self::Conflict(c) => c.code(),
            Self::UnknownKey(_) => "FSM_UNKNOWN_KEY",
        }
    }
}

//! Error taxonomy. Every enum here carries a stable, machine readable
//! [`ErrorCode`]; HTTP status mapping lives in `sentinel-gateway` so this
//! crate stays free of a web-framework dependency.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

/// Errors raised while validating a candidate chain record, whether at the
/// commit-pipeline layer (defense in depth, cheaper rejection) or at FSM
/// apply time. Both layers must use these same variants; divergence
/// between them is a safety bug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainConflict {
    #[error("record type 'create' is only valid for the first record of a chain")]
    CreateOnNonEmptyChain,
    #[error("index {got} does not exceed current head index {head}")]
    SignIndexNotGreaterThanHead { head: u64, got: u64 },
    #[error("sync index {got} regresses below current head index {head}")]
    SyncIndexRegression { head: u64, got: u64 },
    #[error("chain broken: previous_hash does not match stored head hash")]
    PreviousHashMismatch,
    #[error("first record of a chain must have index 0")]
    GenesisIndexNotZero,
    #[error("first record of a chain must use previous_hash = genesis digest")]
    GenesisPreviousHashNotGenesis,
    #[error("first record of a chain must have record_type = create")]
    GenesisNotCreate,
    #[error("chain for this pkh is terminal (a delete record was already applied)")]
    ChainTerminal,
}

impl ErrorCode for ChainConflict {
    fn code(&self) -> &'static str {
        match self {
            Self::CreateOnNonEmptyChain => "CHAIN_CREATE_ON_NON_EMPTY",
            Self::SignIndexNotGreaterThanHead { .. } => "CHAIN_SIGN_INDEX_NOT_GREATER",
            Self::SyncIndexRegression { .. } => "CHAIN_SYNC_INDEX_REGRESSION",
            Self::PreviousHashMismatch => "CHAIN_PREVIOUS_HASH_MISMATCH",
            Self::GenesisIndexNotZero => "CHAIN_GENESIS_INDEX_NOT_ZERO",
            Self::GenesisPreviousHashNotGenesis => "CHAIN_GENESIS_PREVIOUS_HASH",
            Self::GenesisNotCreate => "CHAIN_GENESIS_NOT_CREATE",
            Self::ChainTerminal => "CHAIN_TERMINAL",
        }
    }
}

/// Errors raised by the commit pipeline and, in the FSM's `apply`, by the
/// subset of variants reachable after validation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("attestation signature did not verify under the configured trusted key")]
    Unauthenticated,
    #[error("chain conflict: {0}")]
    Conflict(#[from] ChainConflict),
    #[error("no leader known for this cluster")]
    NoLeader,
    #[error("request timed out or the log proposal's outcome is indeterminate")]
    Indeterminate,
    #[error("unknown key: {0}")]
    UnknownKey(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorCode for PipelineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "PIPELINE_MALFORMED",
            Self::Unauthenticated => "PIPELINE_UNAUTHENTICATED",
            Self::Conflict(_) => "PIPELINE_CHAIN_CONFLICT",
            Self::NoLeader => "PIPELINE_NO_LEADER",
            Self::Indeterminate => "PIPELINE_INDETERMINATE",
            Self::UnknownKey(_) => "PIPELINE_UNKNOWN_KEY",
            Self::Internal(_) => "PIPELINE_INTERNAL",
        }
    }
}

/// Errors from the external ledger mirror: non-fatal when the log
/// succeeded, fatal when the log also failed.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("ledger RPC call failed: {0}")]
    Rpc(String),
    #[error("ledger reported a normalized id the client could not parse: {0}")]
    BadNormalizedId(String),
    #[error("ledger mirror is not configured for this key")]
    NotConfigured,
}

impl ErrorCode for MirrorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rpc(_) => "MIRROR_RPC_ERROR",
            Self::BadNormalizedId(_) => "MIRROR_BAD_NORMALIZED_ID",
            Self::NotConfigured => "MIRROR_NOT_CONFIGURED",
        }
    }
}

/// Errors from the signer-side protocol driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("sync with cluster failed: {0}")]
    SyncFailed(String),
    #[error("commit pipeline rejected the record: {0}")]
    Rejected(#[from] PipelineError),
    #[error("both the replicated log and the ledger mirror failed: {0}")]
    DualFailure(String),
    #[error("reconciliation failed, refusing to sign: {0}")]
    ReconciliationFailed(String),
    #[error("key store error: {0}")]
    KeyStore(String),
}

impl ErrorCode for DriverError {
    fn code(&self) -> &'static str {
        match self {
            Self::SyncFailed(_) => "DRIVER_SYNC_FAILED",
            Self::Rejected(_) => "DRIVER_REJECTED",
            Self::DualFailure(_) => "DRIVER_DUAL_FAILURE",
            Self::ReconciliationFailed(_) => "DRIVER_RECONCILIATION_FAILED",
            Self::KeyStore(_) => "DRIVER_KEY_STORE_ERROR",
        }
    }
}

/// Fatal startup errors: the process exits on these.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("attestation key file missing or unreadable: {0}")]
    MissingAttestationKey(String),
    #[error("attestation key pair is inconsistent: the private key's derived public key does not match the loaded public key")]
    InconsistentAttestationKeyPair,
    #[error("data directory is not usable: {0}")]
    DataDirectory(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ErrorCode for StartupError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingAttestationKey(_) => "STARTUP_MISSING_ATTESTATION_KEY",
            Self::InconsistentAttestationKeyPair => "STARTUP_INCONSISTENT_ATTESTATION_KEYPAIR",
            Self::DataDirectory(_) => "STARTUP_DATA_DIRECTORY",
            Self::Config(_) => "STARTUP_CONFIG",
        }
    }
}

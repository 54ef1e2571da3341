//! The signer-side protocol driver: everything a signer daemon needs
//! besides the key material itself, namely the cluster HTTP client and the
//! sync/pick-next-index/construct-record/submit/discard-rule state machine
//! that drives one commit-and-sign call at a time per key.

pub mod client;
pub mod driver;
pub mod error;
pub mod state;

pub use client::{ClientError, ClusterClient, CommitOutcome, HeadInfo};
pub use driver::{SignOutcome, SignerDriver, DEFAULT_COMMIT_TIMEOUT};
pub use error::DriverError;
pub use state::KeyState;

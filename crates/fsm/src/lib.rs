pub mod error;
pub mod state;

pub use error::FsmError;
pub use state::{verify_chain_integrity, ChainIntegrity, ChainState, ReplicatedFsm, ALL_ENTRIES_MAX};

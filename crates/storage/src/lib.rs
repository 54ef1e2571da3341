//! redb-backed persistence: the replicated log store and the signer
//! key-material database.

pub mod error;
pub mod key_db;
pub mod raft_log;
pub mod wal;

pub use error::StorageError;
pub use key_db::{KeyDb, KeyRecord};
pub use raft_log::RaftLogStore;

//! Core data structures, canonical encoding, configuration, and the error
//! taxonomy shared by every crate in the index-ordering service.
//!
//! Kept deliberately small and dependency-light: a stable, low-churn
//! `types` crate that every other crate depends on.

pub mod codec;
pub mod config;
pub mod error;
pub mod ids;
pub mod record;

pub use config::{ClusterConfig, ClusterMember, LedgerConfig, NodeConfig, SignerConfig};
pub use error::{ChainConflict, DriverError, ErrorCode, MirrorError, PipelineError, StartupError};
pub use ids::{Kid, Pkh};
pub use record::{ChainRecord, Digest, RecordType, GENESIS_DIGEST};

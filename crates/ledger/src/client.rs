//! The external ledger's RPC surface, as seen by this service: an
//! authenticated identity store keyed by a normalized form of `pkh`, whose
//! value is a one-element list of `{tag: index}` (history lives in the
//! ledger's own revision log, not in the current value).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sentinel_types::{MirrorError, Pkh};

/// One `{attestor_tag: index_string}` entry as stored on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityEntry {
    pub tag: String,
    pub index: u64,
}

/// The ledger's RPC dialect, reduced to the four operations this service
/// uses: normalize a `pkh` into the ledger's own identity-id form, read the
/// current entry, read its history, and replace the current entry.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn compute_normalized_id(&self, pkh: &Pkh) -> Result<String, MirrorError>;

    async fn get_identity(&self, normalized_id: &str) -> Result<Option<IdentityEntry>, MirrorError>;

    async fn get_identity_history(&self, normalized_id: &str) -> Result<Vec<IdentityEntry>, MirrorError>;

    async fn update_identity(&self, normalized_id: &str, entry: IdentityEntry) -> Result<(), MirrorError>;

    /// Convenience wrapper used by the commit pipeline's dual-commit step:
    /// normalizes `pkh` and replaces its current entry with `index` under
    /// the client's configured attestor tag.
    async fn mirror_commit(&self, pkh: &Pkh, index: u64) -> Result<(), MirrorError>;

    /// Reads the ledger's currently recorded index for `pkh`, if any.
    /// Used by reconciliation to compare against the replicated log's head.
    async fn current_index(&self, pkh: &Pkh) -> Result<Option<u64>, MirrorError>;
}

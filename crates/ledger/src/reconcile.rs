//! Reconciliation: brings the replicated log and the external ledger back
//! into agreement when their heads for a `pkh` diverge. Run by the signer
//! driver at the start of every `sign`, before picking the next index.

use sentinel_types::Digest;

/// What reconciliation found before acting, so the driver's log line and
/// the `sync` record it emits can both reflect the same decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub log_index: Option<u64>,
    pub ledger_index: Option<u64>,
    pub target: Option<u64>,
}

impl ReconciliationPlan {
    /// No `sync` record is needed when both sides already agree (including
    /// the case where neither side has a chain yet).
    pub fn needs_sync(&self) -> bool {
        match (self.log_index, self.ledger_index) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }

    pub fn target_index(&self) -> Option<u64> {
        self.target
    }
}

/// Compares the replicated log's head index against the ledger's. The log
/// never regresses, so the target is the larger of the two when they
/// disagree.
pub fn plan(log_index: Option<u64>, ledger_index: Option<u64>) -> ReconciliationPlan {
    let target = match (log_index, ledger_index) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };
    ReconciliationPlan { log_index, ledger_index, target }
}

/// The `previous_hash` a reconciling `sync` record must carry: the log's
/// current head hash, or the genesis digest if the log has no head yet.
pub fn sync_previous_hash(log_head_hash: Option<Digest>) -> Digest {
    log_head_hash.unwrap_or(sentinel_types::GENESIS_DIGEST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agreement_needs_no_sync() {
        let p = plan(Some(7), Some(7));
        assert!(!p.needs_sync());
        assert_eq!(p.target_index(), Some(7));
    }

    #[test]
    fn disagreement_picks_the_larger_index() {
        let p = plan(Some(7), Some(9));
        assert!(p.needs_sync());
        assert_eq!(p.target_index(), Some(9));

        let p = plan(Some(9), Some(7));
        assert!(p.needs_sync());
        assert_eq!(p.target_index(), Some(9));
    }

    #[test]
    fn missing_ledger_side_uses_log_index() {
        let p = plan(Some(3), None);
        assert!(!p.needs_sync());
        assert_eq!(p.target_index(), Some(3));
    }

    #[test]
    fn both_empty_has_no_target() {
        let p = plan(None, None);
        assert!(!p.needs_sync());
        assert_eq!(p.target_index(), None);
    }
}

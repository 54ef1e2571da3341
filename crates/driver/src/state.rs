use std::collections::BTreeSet;

use sentinel_types::Digest;

/// Per-key driver state: what the driver last observed the cluster head to
/// be, and which candidate indices are known-unusable because a prior
/// commit attempt for them had an indeterminate outcome.
#[derive(Debug, Default, Clone)]
pub struct KeyState {
    pub last_known: Option<(u64, Digest)>,
    pub unusable: BTreeSet<u64>,
}

impl KeyState {
    /// The next index to try, starting from `head_index + 1` (or `0` for
    /// an empty chain) and skipping any index already marked unusable.
    pub fn next_index(&self) -> u64 {
        let mut candidate = match self.last_known {
            Some((head_index, _)) => head_index + 1,
            None => 0,
        };
        while self.unusable.contains(&candidate) {
            candidate += 1;
        }
        candidate
    }

    pub fn previous_hash(&self) -> Digest {
        self.last_known.map(|(_, hash)| hash).unwrap_or(sentinel_types::GENESIS_DIGEST)
    }

    pub fn mark_committed(&mut self, index: u64, hash: Digest) {
        self.last_known = Some((index, hash));
        self.unusable.retain(|&i| i > index);
    }

    pub fn mark_unusable(&mut self, index: u64) {
        self.unusable.insert(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_starts_at_zero() {
        let state = KeyState::default();
        assert_eq!(state.next_index(), 0);
    }

    #[test]
    fn next_index_skips_unusable_indices() {
        let mut state = KeyState::default();
        state.mark_committed(4, Digest([1u8; 32]));
        state.mark_unusable(5);
        state.mark_unusable(6);
        assert_eq!(state.next_index(), 7);
    }
}

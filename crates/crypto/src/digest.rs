//! SHA-256 digesting of chain records.

use sha2::{Digest as _, Sha256};

use sentinel_types::{ChainRecord, Digest};

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Computes the canonical digest of a chain record: SHA-256 over the
/// record's canonical encoding with `hash` omitted.
pub fn record_digest(record: &ChainRecord) -> Digest {
    Digest(sha256(&record.canonical_bytes()))
}

/// Verifies that `record.hash` equals the digest recomputed from its other
/// fields.
pub fn verify_record_hash(record: &ChainRecord) -> bool {
    record_digest(record) == record.hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::{Kid, Pkh, RecordType, GENESIS_DIGEST};

    fn sample() -> ChainRecord {
        let mut r = ChainRecord {
            kid: Kid::new("user_1_key_0"),
            pkh: Pkh::from_bytes([1u8; 32]),
            index: 0,
            previous_hash: GENESIS_DIGEST,
            record_type: RecordType::Create,
            attestation_signature: vec![9, 9, 9],
            attestor_public_key: vec![8, 8, 8],
            hash: Digest([0u8; 32]),
        };
        r.hash = record_digest(&r);
        r
    }

    #[test]
    fn hash_is_deterministic() {
        let a = sample();
        let b = sample();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn tampering_with_index_invalidates_hash() {
        let mut r = sample();
        r.index = 1;
        assert!(!verify_record_hash(&r));
    }

    #[test]
    fn verify_record_hash_accepts_self_consistent_record() {
        let r = sample();
        assert!(verify_record_hash(&r));
    }
}

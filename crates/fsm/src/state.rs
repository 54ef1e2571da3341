//! The replicated state machine: a deterministic function from
//! `(current state, chain record)` to `next state` applied identically by
//! every cluster replica once the record is committed to the replicated
//! log.

use std::collections::BTreeMap;

use serde::Serialize;

use sentinel_crypto::{verify_record_hash, AttestationVerifier};
use sentinel_types::{ChainConflict, ChainRecord, Digest, Kid, Pkh, RecordType, GENESIS_DIGEST};

use crate::error::FsmError;

/// The append-only chain for one public-key-hash.
#[derive(Clone, Debug, Default)]
pub struct ChainState {
    pub records: Vec<ChainRecord>,
    pub terminal: bool,
}

impl ChainState {
    pub fn head(&self) -> Option<&ChainRecord> {
        self.records.last()
    }
}

/// Outcome of walking a chain end to end and recomputing every digest and
/// link, independent of whatever the FSM currently believes the head is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainIntegrity {
    Valid,
    Invalid { break_index: u64, reason: String },
}

/// Maximum number of records `all_entries` will ever return, regardless of
/// the caller's requested limit.
pub const ALL_ENTRIES_MAX: usize = 1000;

/// The full replicated state: every chain plus the kid -> pkh index used to
/// resolve human-facing key identifiers to chains.
pub struct ReplicatedFsm {
    chains: BTreeMap<Pkh, ChainState>,
    kid_to_pkh: BTreeMap<String, Pkh>,
    verifier: AttestationVerifier,
    /// Global application order, oldest first: one `(pkh, index)` pair per
    /// successful `apply`. Drives `all_entries`'s "newest first" ordering,
    /// which a chain-by-chain walk of `chains` (keyed by `Pkh`, not by
    /// application time) cannot provide on its own.
    application_order: Vec<(Pkh, u64)>,
}

impl ReplicatedFsm {
    pub fn new(verifier: AttestationVerifier) -> Self {
        Self {
            chains: BTreeMap::new(),
            kid_to_pkh: BTreeMap::new(),
            verifier,
            application_order: Vec::new(),
        }
    }

    /// Validates and applies one chain record. Returns the record's index
    /// on success. This must be byte-for-byte identical across every
    /// replica given the same input, so it performs no I/O and reads no
    /// wall-clock time.
    pub fn apply(&mut self, record: ChainRecord) -> Result<u64, FsmError> {
        if !verify_record_hash(&record) {
            return Err(FsmError::Malformed(
                "record hash does not match its canonical encoding".into(),
            ));
        }

        self.verifier
            .verify(
                &record.kid,
                record.index,
                &record.attestation_signature,
                &record.attestor_public_key,
            )
            .map_err(|_| FsmError::Unauthenticated)?;

        let chain = self.chains.entry(record.pkh).or_default();
        validate_transition(chain, &record)?;

        if chain.terminal {
            return Err(FsmError::Conflict(ChainConflict::ChainTerminal));
        }

        let index = record.index;
        if record.record_type == RecordType::Delete {
            chain.terminal = true;
        }
        self.kid_to_pkh.insert(record.kid.as_str().to_string(), record.pkh);
        let pkh = record.pkh;
        chain.records.push(record);
        self.application_order.push((pkh, index));
        Ok(index)
    }

    /// Runs every check `apply` would run, without mutating state. Used by
    /// the commit pipeline to reject obviously-bad records before paying
    /// for a replicated-log round trip; `apply` remains the sole authority
    /// since the chain can change between this check and the real commit.
    pub fn dry_run_validate(&self, record: &ChainRecord) -> Result<(), FsmError> {
        if !verify_record_hash(record) {
            return Err(FsmError::Malformed(
                "record hash does not match its canonical encoding".into(),
            ));
        }
        self.verifier
            .verify(
                &record.kid,
                record.index,
                &record.attestation_signature,
                &record.attestor_public_key,
            )
            .map_err(|_| FsmError::Unauthenticated)?;
        let empty = ChainState::default();
        let chain = self.chains.get(&record.pkh).unwrap_or(&empty);
        validate_transition(chain, record)?;
        if chain.terminal {
            return Err(FsmError::Conflict(ChainConflict::ChainTerminal));
        }
        Ok(())
    }

    pub fn pkh_for_kid(&self, kid: &Kid) -> Option<Pkh> {
        self.kid_to_pkh.get(kid.as_str()).copied()
    }

    pub fn latest(&self, pkh: &Pkh) -> Option<&ChainRecord> {
        self.chains.get(pkh).and_then(ChainState::head)
    }

    pub fn chain_of(&self, pkh: &Pkh) -> Option<&[ChainRecord]> {
        self.chains.get(pkh).map(|c| c.records.as_slice())
    }

    pub fn all_keys(&self) -> Vec<Pkh> {
        self.chains.keys().copied().collect()
    }

    /// Returns the most recently applied records, newest first, capped at
    /// [`ALL_ENTRIES_MAX`] regardless of the requested `limit`.
    pub fn all_entries(&self, limit: usize) -> Vec<ChainRecord> {
        let limit = limit.min(ALL_ENTRIES_MAX);
        self.application_order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|(pkh, index)| self.record_at(pkh, *index).cloned())
            .collect()
    }

    fn record_at(&self, pkh: &Pkh, index: u64) -> Option<&ChainRecord> {
        let chain = self.chains.get(pkh)?;
        let pos = chain.records.binary_search_by_key(&index, |r| r.index).ok()?;
        chain.records.get(pos)
    }

    pub fn chains(&self) -> &BTreeMap<Pkh, ChainState> {
        &self.chains
    }

    /// Rebuilds `kid_to_pkh`, `application_order`, and replaces all chain
    /// state, used when installing a snapshot.
    ///
    /// The snapshot wire format doesn't carry the true global apply order,
    /// so `application_order` is rebuilt deterministically (chains in `Pkh`
    /// order, then by index within each chain) rather than recovered
    /// exactly. This converges to the real order as new records are applied
    /// after the snapshot loads.
    pub fn restore(&mut self, chains: BTreeMap<Pkh, ChainState>) {
        self.kid_to_pkh.clear();
        self.application_order.clear();
        for (pkh, state) in &chains {
            if let Some(record) = state.records.first() {
                self.kid_to_pkh.insert(record.kid.as_str().to_string(), *pkh);
            }
            for record in &state.records {
                self.application_order.push((*pkh, record.index));
            }
        }
        self.chains = chains;
    }
}

fn validate_transition(chain: &ChainState, record: &ChainRecord) -> Result<(), ChainConflict> {
    match chain.head() {
        None => {
            if record.record_type != RecordType::Create {
                return Err(ChainConflict::GenesisNotCreate);
            }
            if record.index != 0 {
                return Err(ChainConflict::GenesisIndexNotZero);
            }
            if record.previous_hash != GENESIS_DIGEST {
                return Err(ChainConflict::GenesisPreviousHashNotGenesis);
            }
            Ok(())
        }
        Some(head) => {
            if record.record_type == RecordType::Create {
                return Err(ChainConflict::CreateOnNonEmptyChain);
            }
            match record.record_type {
                RecordType::Sign | RecordType::Delete => {
                    if record.index <= head.index {
                        return Err(ChainConflict::SignIndexNotGreaterThanHead {
                            head: head.index,
                            got: record.index,
                        });
                    }
                    if record.previous_hash != head.hash {
                        return Err(ChainConflict::PreviousHashMismatch);
                    }
                }
                RecordType::Sync => {
                    if record.index < head.index {
                        return Err(ChainConflict::SyncIndexRegression {
                            head: head.index,
                            got: record.index,
                        });
                    }
                    if record.previous_hash != head.hash {
                        return Err(ChainConflict::PreviousHashMismatch);
                    }
                }
                RecordType::Create => unreachable!("handled above"),
            }
            Ok(())
        }
    }
}

/// Walks a chain end to end, recomputing every record's digest and
/// checking the `previous_hash` linkage, independent of what the FSM
/// currently believes. Used by read paths that must detect tampering with
/// persisted state outside of `apply`.
pub fn verify_chain_integrity(records: &[ChainRecord]) -> ChainIntegrity {
    let mut expected_previous: Digest = GENESIS_DIGEST;
    for record in records {
        if !verify_record_hash(record) {
            return ChainIntegrity::Invalid {
                break_index: record.index,
                reason: "record hash does not match its canonical encoding".into(),
            };
        }
        if record.previous_hash != expected_previous {
            return ChainIntegrity::Invalid {
                break_index: record.index,
                reason: "previous_hash does not match predecessor's hash".into(),
            };
        }
        expected_previous = record.hash;
    }
    ChainIntegrity::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{SigningKey, VerifyingKey};
    use p256::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
    use rand_core::OsRng;
    use sentinel_crypto::{record_digest, AttestationSigner};
    use std::io::Write;

    fn make_verifier_and_signer() -> (AttestationVerifier, AttestationSigner) {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        let priv_pem = signing_key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let pub_pem = verifying_key.to_public_key_pem(LineEnding::LF).unwrap();

        let mut priv_file = tempfile::NamedTempFile::new().unwrap();
        priv_file.write_all(priv_pem.as_bytes()).unwrap();
        let mut pub_file = tempfile::NamedTempFile::new().unwrap();
        pub_file.write_all(pub_pem.as_bytes()).unwrap();

        let signer = AttestationSigner::load_from_pem_file(priv_file.path()).unwrap();
        let verifier = AttestationVerifier::load_from_pem_file(pub_file.path()).unwrap();
        let _ = VerifyingKey::from_public_key_pem(&pub_pem).unwrap();
        (verifier, signer)
    }

    fn build_record(
        signer: &AttestationSigner,
        kid: &Kid,
        pkh: Pkh,
        index: u64,
        previous_hash: Digest,
        record_type: RecordType,
    ) -> ChainRecord {
        let signature = signer.sign(kid, index);
        let public_key = signer.public_key_der().unwrap();
        let mut record = ChainRecord {
            kid: kid.clone(),
            pkh,
            index,
            previous_hash,
            record_type,
            attestation_signature: signature,
            attestor_public_key: public_key,
            hash: Digest([0u8; 32]),
        };
        record.hash = record_digest(&record);
        record
    }

    #[test]
    fn create_then_sign_advances_chain() {
        let (verifier, signer) = make_verifier_and_signer();
        let mut fsm = ReplicatedFsm::new(verifier);
        let kid = Kid::new("user_1_key_0");
        let pkh = Pkh::from_bytes([1u8; 32]);

        let create = build_record(&signer, &kid, pkh, 0, GENESIS_DIGEST, RecordType::Create);
        let create_hash = create.hash;
        fsm.apply(create).unwrap();

        let sign = build_record(&signer, &kid, pkh, 5, create_hash, RecordType::Sign);
        let idx = fsm.apply(sign).unwrap();
        assert_eq!(idx, 5);
        assert_eq!(fsm.latest(&pkh).unwrap().index, 5);
    }

    #[test]
    fn second_create_on_existing_chain_rejected() {
        let (verifier, signer) = make_verifier_and_signer();
        let mut fsm = ReplicatedFsm::new(verifier);
        let kid = Kid::new("user_1_key_0");
        let pkh = Pkh::from_bytes([1u8; 32]);

        let create = build_record(&signer, &kid, pkh, 0, GENESIS_DIGEST, RecordType::Create);
        fsm.apply(create).unwrap();

        let second = build_record(&signer, &kid, pkh, 0, GENESIS_DIGEST, RecordType::Create);
        let err = fsm.apply(second).unwrap_err();
        assert_eq!(err.code(), "CHAIN_CREATE_ON_NON_EMPTY");
    }

    #[test]
    fn non_increasing_index_rejected() {
        let (verifier, signer) = make_verifier_and_signer();
        let mut fsm = ReplicatedFsm::new(verifier);
        let kid = Kid::new("user_1_key_0");
        let pkh = Pkh::from_bytes([1u8; 32]);

        let create = build_record(&signer, &kid, pkh, 0, GENESIS_DIGEST, RecordType::Create);
        let create_hash = create.hash;
        fsm.apply(create).unwrap();

        let sign = build_record(&signer, &kid, pkh, 0, create_hash, RecordType::Sign);
        let err = fsm.apply(sign).unwrap_err();
        assert_eq!(err.code(), "CHAIN_SIGN_INDEX_NOT_GREATER");
    }

    #[test]
    fn delete_marks_chain_terminal() {
        let (verifier, signer) = make_verifier_and_signer();
        let mut fsm = ReplicatedFsm::new(verifier);
        let kid = Kid::new("user_1_key_0");
        let pkh = Pkh::from_bytes([1u8; 32]);

        let create = build_record(&signer, &kid, pkh, 0, GENESIS_DIGEST, RecordType::Create);
        let create_hash = create.hash;
        fsm.apply(create).unwrap();

        let delete = build_record(&signer, &kid, pkh, 1, create_hash, RecordType::Delete);
        let delete_hash = delete.hash;
        fsm.apply(delete).unwrap();

        let next = build_record(&signer, &kid, pkh, 2, delete_hash, RecordType::Sign);
        let err = fsm.apply(next).unwrap_err();
        assert_eq!(err.code(), "CHAIN_TERMINAL");
    }

    #[test]
    fn untrusted_attestor_rejected() {
        let (verifier, _signer) = make_verifier_and_signer();
        let (_, other_signer) = make_verifier_and_signer();
        let mut fsm = ReplicatedFsm::new(verifier);
        let kid = Kid::new("user_1_key_0");
        let pkh = Pkh::from_bytes([1u8; 32]);

        let create = build_record(&other_signer, &kid, pkh, 0, GENESIS_DIGEST, RecordType::Create);
        let err = fsm.apply(create).unwrap_err();
        assert_eq!(err.code(), "FSM_UNAUTHENTICATED");
    }

    #[test]
    fn chain_integrity_detects_tampering() {
        let (verifier, signer) = make_verifier_and_signer();
        let mut fsm = ReplicatedFsm::new(verifier);
        let kid = Kid::new("user_1_key_0");
        let pkh = Pkh::from_bytes([1u8; 32]);

        let create = build_record(&signer, &kid, pkh, 0, GENESIS_DIGEST, RecordType::Create);
        fsm.apply(create).unwrap();

        let mut tampered = fsm.chain_of(&pkh).unwrap().to_vec();
        tampered[0].index = 7;
        assert!(matches!(
            verify_chain_integrity(&tampered),
            ChainIntegrity::Invalid { .. }
        ));
    }
}

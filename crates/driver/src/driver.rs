//! The signer-side protocol driver: the only component allowed to call
//! [`sentinel_keystore::Keystore::sign`]. It owns the sync / pick-next-index
//! / construct-record / submit / discard-rule sequence for one committed
//! index at a time, per key.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use sentinel_crypto::{record_digest, AttestationSigner};
use sentinel_keystore::Keystore;
use sentinel_ledger::{reconcile, LedgerClient};
use sentinel_types::{ChainRecord, Digest, DriverError, Kid, Pkh, RecordType, GENESIS_DIGEST};

use crate::client::{ClientError, ClusterClient};
use crate::state::KeyState;

fn discard_error(e: ClientError) -> DriverError {
    match e {
        ClientError::Transport(msg) => DriverError::SyncFailed(format!("transport error, outcome indeterminate: {msg}")),
        ClientError::Decode(msg) => DriverError::SyncFailed(format!("malformed cluster response: {msg}")),
        ClientError::Rejected { code, message } => DriverError::SyncFailed(format!("{code}: {message}")),
    }
}

/// The outcome of a successful `commit_and_sign` call: the index that was
/// committed and the signature produced over it.
pub struct SignOutcome {
    pub index: u64,
    pub signature: Vec<u8>,
    pub log_committed: bool,
    pub mirrored: bool,
}

pub struct SignerDriver {
    cluster: ClusterClient,
    keystore: Arc<Keystore>,
    attestation: Arc<AttestationSigner>,
    ledger: Option<Arc<dyn LedgerClient>>,
    locks: DashMap<Kid, Arc<Mutex<KeyState>>>,
}

impl SignerDriver {
    pub fn new(
        cluster: ClusterClient,
        keystore: Arc<Keystore>,
        attestation: Arc<AttestationSigner>,
        ledger: Option<Arc<dyn LedgerClient>>,
    ) -> Self {
        Self { cluster, keystore, attestation, ledger, locks: DashMap::new() }
    }

    fn lock_for(&self, kid: &Kid) -> Arc<Mutex<KeyState>> {
        self.locks.entry(kid.clone()).or_insert_with(|| Arc::new(Mutex::new(KeyState::default()))).clone()
    }

    /// Commits the next available index for `kid` and produces a signature
    /// over `message` at that index.
    ///
    /// Calls for the same `kid` are fully serialized; calls for distinct
    /// keys proceed concurrently.
    pub async fn commit_and_sign(&self, kid: &Kid, pkh: &Pkh, message: &[u8]) -> Result<SignOutcome, DriverError> {
        let lock = self.lock_for(kid);
        let mut state = lock.lock().await;

        let head = self.cluster.head(pkh).await.map_err(discard_error)?;
        state.last_known = if head.exists { Some((head.index, head.hash)) } else { None };

        if let Some(ledger) = &self.ledger {
            self.reconcile(kid, pkh, ledger.as_ref(), &mut state).await?;
        }

        let candidate_index = state.next_index();
        let previous_hash = state.previous_hash();
        let record_type = if state.last_known.is_none() { RecordType::Create } else { RecordType::Sign };
        let record = self.build_record(kid, pkh, candidate_index, previous_hash, record_type);

        let outcome = self.cluster.commit(&record, self.ledger.as_ref().map(|_| true)).await;
        let outcome = match outcome {
            Ok(outcome) if outcome.committed => outcome,
            Ok(_) => {
                state.mark_unusable(candidate_index);
                return Err(DriverError::SyncFailed(format!(
                    "cluster reported an uncommitted outcome for index {candidate_index}"
                )));
            }
            Err(e) => {
                state.mark_unusable(candidate_index);
                return Err(discard_error(e));
            }
        };

        state.mark_committed(candidate_index, record.hash);

        let signed = self
            .keystore
            .sign(kid, candidate_index, message)
            .map_err(|e| DriverError::KeyStore(e.to_string()))?;

        Ok(SignOutcome {
            index: candidate_index,
            signature: signed.signature,
            log_committed: outcome.log_committed,
            mirrored: outcome.mirrored,
        })
    }

    /// Brings the replicated log and the ledger mirror back into agreement
    /// before a new index is picked, submitting a `sync` record if they
    /// disagree.
    async fn reconcile(
        &self,
        kid: &Kid,
        pkh: &Pkh,
        ledger: &dyn LedgerClient,
        state: &mut KeyState,
    ) -> Result<(), DriverError> {
        let ledger_index = ledger
            .current_index(pkh)
            .await
            .map_err(|e| DriverError::ReconciliationFailed(e.to_string()))?;
        let log_index = state.last_known.map(|(index, _)| index);
        let plan = reconcile::plan(log_index, ledger_index);

        if !plan.needs_sync() {
            return Ok(());
        }
        let target = plan.target_index().expect("needs_sync implies a target exists");

        let previous_hash = reconcile::sync_previous_hash(state.last_known.map(|(_, hash)| hash));
        let record = self.build_record(kid, pkh, target, previous_hash, RecordType::Sync);

        let outcome = self.cluster.commit(&record, Some(true)).await.map_err(discard_error)?;
        if !outcome.committed {
            return Err(DriverError::ReconciliationFailed(format!(
                "sync record for index {target} was not committed"
            )));
        }
        state.mark_committed(target, record.hash);
        Ok(())
    }

    fn build_record(&self, kid: &Kid, pkh: &Pkh, index: u64, previous_hash: Digest, record_type: RecordType) -> ChainRecord {
        let attestation_signature = self.attestation.sign(kid, index);
        let attestor_public_key = self.attestation.public_key_der().unwrap_or_default();
        let mut record = ChainRecord {
            kid: kid.clone(),
            pkh: *pkh,
            index,
            previous_hash,
            record_type,
            attestation_signature,
            attestor_public_key,
            hash: GENESIS_DIGEST,
        };
        record.hash = record_digest(&record);
        record
    }
}

pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(5);

//! Adapts [`sentinel_fsm::ReplicatedFsm`] to `openraft`'s state machine
//! trait: applies committed entries and builds/installs snapshots.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use openraft::storage::{RaftStateMachine, Snapshot};
use openraft::{
    EntryPayload, LogId, OptionalSend, RaftSnapshotBuilder, SnapshotMeta, StorageError,
    StorageIOError, StoredMembership,
};

use sentinel_fsm::ReplicatedFsm;
use sentinel_types::{ChainRecord, ErrorCode, Pkh};

use crate::type_config::{CommitResponse, NodeId, TypeConfig};

type Entry = openraft::Entry<TypeConfig>;

/// Snapshot wire format: every chain record across every key, flattened and
/// re-applied in order on the receiving end. Order is preserved per key by
/// `ReplicatedFsm::apply`'s own invariants, so a straight concatenation
/// round-trips correctly.
#[derive(serde::Serialize, serde::Deserialize)]
struct SnapshotPayload {
    records: Vec<ChainRecord>,
}

pub struct StateMachine {
    fsm: Arc<Mutex<ReplicatedFsm>>,
    last_applied: Option<LogId<NodeId>>,
    last_membership: StoredMembership<NodeId, openraft::BasicNode>,
    current_snapshot: Option<(SnapshotMeta<NodeId, openraft::BasicNode>, Vec<u8>)>,
}

impl StateMachine {
    pub fn new(fsm: Arc<Mutex<ReplicatedFsm>>) -> Self {
        Self {
            fsm,
            last_applied: None,
            last_membership: StoredMembership::default(),
            current_snapshot: None,
        }
    }

    pub fn fsm(&self) -> Arc<Mutex<ReplicatedFsm>> {
        self.fsm.clone()
    }
}

impl RaftSnapshotBuilder<TypeConfig> for StateMachine {
    async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<NodeId>> {
        let records: Vec<ChainRecord> = {
            let fsm = self.fsm.lock().expect("fsm mutex poisoned");
            fsm.chains()
                .values()
                .flat_map(|chain| chain.records.iter().cloned())
                .collect()
        };
        let payload = SnapshotPayload { records };
        let data = serde_json::to_vec(&payload).map_err(|e| StorageIOError::write_snapshot(None, &e))?;

        let meta = SnapshotMeta {
            last_log_id: self.last_applied,
            last_membership: self.last_membership.clone(),
            snapshot_id: format!("snapshot-{}", self.last_applied.map(|l| l.index).unwrap_or(0)),
        };
        self.current_snapshot = Some((meta.clone(), data.clone()));

        Ok(Snapshot {
            meta,
            snapshot: Box::new(Cursor::new(data)),
        })
    }
}

impl RaftStateMachine<TypeConfig> for StateMachine {
    type SnapshotBuilder = Self;

    async fn applied_state(
        &mut self,
    ) -> Result<(Option<LogId<NodeId>>, StoredMembership<NodeId, openraft::BasicNode>), StorageError<NodeId>>
    {
        Ok((self.last_applied, self.last_membership.clone()))
    }

    async fn apply<I>(&mut self, entries: I) -> Result<Vec<CommitResponse>, StorageError<NodeId>>
    where
        I: IntoIterator<Item = Entry> + OptionalSend,
        I::IntoIter: OptionalSend,
    {
        let mut responses = Vec::new();
        let mut fsm = self.fsm.lock().expect("fsm mutex poisoned");
        for entry in entries {
            self.last_applied = Some(entry.log_id);
            match entry.payload {
                EntryPayload::Blank => {
                    responses.push(CommitResponse::ok(entry.log_id.index));
                }
                EntryPayload::Normal(req) => {
                    let response = match fsm.apply(req.record) {
                        Ok(index) => CommitResponse::ok(index),
                        Err(e) => CommitResponse::rejected(e.code(), e.to_string()),
                    };
                    responses.push(response);
                }
                EntryPayload::Membership(membership) => {
                    self.last_membership =
                        StoredMembership::new(Some(entry.log_id), membership);
                    responses.push(CommitResponse::ok(entry.log_id.index));
                }
            }
        }
        Ok(responses)
    }

    async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
        StateMachine {
            fsm: self.fsm.clone(),
            last_applied: self.last_applied,
            last_membership: self.last_membership.clone(),
            current_snapshot: None,
        }
    }

    async fn begin_receiving_snapshot(
        &mut self,
    ) -> Result<Box<Cursor<Vec<u8>>>, StorageError<NodeId>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    async fn install_snapshot(
        &mut self,
        meta: &SnapshotMeta<NodeId, openraft::BasicNode>,
        snapshot: Box<Cursor<Vec<u8>>>,
    ) -> Result<(), StorageError<NodeId>> {
        let data = snapshot.into_inner();
        let payload: SnapshotPayload =
            serde_json::from_slice(&data).map_err(|e| StorageIOError::read_snapshot(None, &e))?;

        let mut chains: std::collections::BTreeMap<Pkh, sentinel_fsm::ChainState> =
            std::collections::BTreeMap::new();
        for record in payload.records {
            let entry = chains.entry(record.pkh).or_default();
            entry.records.push(record);
        }
        {
            let mut fsm = self.fsm.lock().expect("fsm mutex poisoned");
            fsm.restore(chains);
        }

        self.last_applied = meta.last_log_id;
        self.last_membership = meta.last_membership.clone();
        self.current_snapshot = Some((meta.clone(), data));
        Ok(())
    }

    async fn get_current_snapshot(
        &mut self,
    ) -> Result<Option<Snapshot<TypeConfig>>, StorageError<NodeId>> {
        Ok(self.current_snapshot.clone().map(|(meta, data)| Snapshot {
            meta,
            snapshot: Box::new(Cursor::new(data)),
        }))
    }
}

//! Adapts [`sentinel_storage::RaftLogStore`]'s opaque byte storage to
//! `openraft`'s log storage traits, encoding/decoding entries and votes as
//! canonical JSON.

use std::fmt::Debug;
use std::ops::RangeBounds;

use openraft::storage::{LogFlushed, LogState, RaftLogReader, RaftLogStorage};
use openraft::{LogId, OptionalSend, StorageError, StorageIOError, Vote};

use sentinel_storage::RaftLogStore as RawLogStore;

use crate::type_config::{NodeId, TypeConfig};

type Entry = openraft::Entry<TypeConfig>;

#[derive(Clone)]
pub struct LogStore {
    raw: RawLogStore,
}

impl LogStore {
    pub fn new(raw: RawLogStore) -> Self {
        Self { raw }
    }

    fn io_err(e: sentinel_storage::StorageError) -> StorageError<NodeId> {
        StorageIOError::write(&e).into()
    }
}

impl RaftLogReader<TypeConfig> for LogStore {
    async fn try_get_log_entries<RB: RangeBounds<u64> + Clone + Debug + OptionalSend>(
        &mut self,
        range: RB,
    ) -> Result<Vec<Entry>, StorageError<NodeId>> {
        let start = match range.start_bound() {
            std::ops::Bound::Included(v) => *v,
            std::ops::Bound::Excluded(v) => v + 1,
            std::ops::Bound::Unbounded => self.raw.first_log_index().map_err(Self::io_err)?.unwrap_or(0),
        };
        let end = match range.end_bound() {
            std::ops::Bound::Included(v) => v + 1,
            std::ops::Bound::Excluded(v) => *v,
            std::ops::Bound::Unbounded => self.raw.last_log_index().map_err(Self::io_err)?.map(|v| v + 1).unwrap_or(start),
        };
        let raw_entries = self.raw.get_entries_range(start, end).map_err(Self::io_err)?;
        raw_entries
            .into_iter()
            .map(|(_, bytes)| {
                serde_json::from_slice(&bytes)
                    .map_err(|e| StorageIOError::read_logs(&e).into())
            })
            .collect()
    }
}

impl RaftLogStorage<TypeConfig> for LogStore {
    type LogReader = Self;

    async fn get_log_state(&mut self) -> Result<LogState<TypeConfig>, StorageError<NodeId>> {
        let last_purged = self
            .raw
            .last_purged_index()
            .map_err(Self::io_err)?;
        let last_index = self.raw.last_log_index().map_err(Self::io_err)?;

        let last_log_id = match last_index {
            Some(index) => {
                let bytes = self
                    .raw
                    .get_entry(index)
                    .map_err(Self::io_err)?
                    .expect("last_log_index must point at a present entry");
                let entry: Entry =
                    serde_json::from_slice(&bytes).map_err(|e| StorageIOError::read(&e))?;
                Some(entry.log_id)
            }
            None => None,
        };

        Ok(LogState {
            last_purged_log_id: last_purged.map(|index| LogId::new(Default::default(), index)),
            last_log_id,
        })
    }

    async fn save_vote(&mut self, vote: &Vote<NodeId>) -> Result<(), StorageError<NodeId>> {
        let bytes = serde_json::to_vec(vote).map_err(|e| StorageIOError::write_vote(&e))?;
        self.raw.save_vote(&bytes).map_err(Self::io_err)
    }

    async fn read_vote(&mut self) -> Result<Option<Vote<NodeId>>, StorageError<NodeId>> {
        let bytes = self.raw.read_vote().map_err(Self::io_err)?;
        match bytes {
            Some(b) => {
                let vote = serde_json::from_slice(&b).map_err(|e| StorageIOError::read_vote(&e))?;
                Ok(Some(vote))
            }
            None => Ok(None),
        }
    }

    async fn append<I>(
        &mut self,
        entries: I,
        callback: LogFlushed<TypeConfig>,
    ) -> Result<(), StorageError<NodeId>>
    where
        I: IntoIterator<Item = Entry> + Send,
    {
        let encoded: Vec<(u64, Vec<u8>)> = entries
            .into_iter()
            .map(|e| {
                let index = e.log_id.index;
                let bytes = serde_json::to_vec(&e).expect("raft entries are always serializable");
                (index, bytes)
            })
            .collect();
        self.raw.append_entries(&encoded).map_err(Self::io_err)?;
        callback.log_io_completed(Ok(()));
        Ok(())
    }

    async fn truncate(&mut self, log_id: LogId<NodeId>) -> Result<(), StorageError<NodeId>> {
        self.raw.truncate_from(log_id.index).map_err(Self::io_err)
    }

    async fn purge(&mut self, log_id: LogId<NodeId>) -> Result<(), StorageError<NodeId>> {
        self.raw.purge_upto(log_id.index).map_err(Self::io_err)
    }

    async fn get_log_reader(&mut self) -> Self::LogReader {
        self.clone()
    }
}

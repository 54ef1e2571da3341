//! redb-backed storage for the replicated log.
//!
//! This module is deliberately agnostic of the consensus crate's wire types:
//! it stores and retrieves opaque, already-encoded byte blobs keyed by log
//! index, the same separation of concerns the key-material database uses.
//! `sentinel-raft` owns encoding/decoding of `openraft` entries and votes
//! into these blobs.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StorageError;

const LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("RAFT_LOG");
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("RAFT_META");

const META_KEY_VOTE: &str = "vote";
const META_KEY_LAST_PURGED: &str = "last_purged";

#[derive(Clone)]
pub struct RaftLogStore {
    db: Arc<Database>,
}

impl RaftLogStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = Database::create(path)?;
        {
            let w = db.begin_write()?;
            w.open_table(LOG)?;
            w.open_table(META)?;
            w.commit()?;
        }
        Ok(Self { db: Arc::new(db) })
    }

    pub fn append_entry(&self, index: u64, encoded: &[u8]) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(LOG)?;
            t.insert(index, encoded)?;
        }
        w.commit()?;
        Ok(())
    }

    pub fn append_entries(&self, entries: &[(u64, Vec<u8>)]) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(LOG)?;
            for (index, encoded) in entries {
                t.insert(*index, encoded.as_slice())?;
            }
        }
        w.commit()?;
        Ok(())
    }

    pub fn get_entry(&self, index: u64) -> Result<Option<Vec<u8>>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(LOG)?;
        let result = t.get(index)?.map(|v| v.value().to_vec());
        Ok(result)
    }

    /// Inclusive-exclusive range `[start, end)`.
    pub fn get_entries_range(&self, start: u64, end: u64) -> Result<Vec<(u64, Vec<u8>)>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(LOG)?;
        let mut out = Vec::new();
        for entry in t.range(start..end)? {
            let (k, v) = entry?;
            out.push((k.value(), v.value().to_vec()));
        }
        Ok(out)
    }

    /// Deletes every entry with index >= `from`, used when the leader
    /// overwrites a follower's conflicting log tail.
    pub fn truncate_from(&self, from: u64) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(LOG)?;
            let keys: Vec<u64> = t.range(from..)?.map(|e| e.map(|(k, _)| k.value())).collect::<Result<_, _>>()?;
            for k in keys {
                t.remove(k)?;
            }
        }
        w.commit()?;
        Ok(())
    }

    /// Deletes every entry with index <= `upto` and records the new purge
    /// watermark, used after a snapshot makes older entries obsolete.
    pub fn purge_upto(&self, upto: u64) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(LOG)?;
            let keys: Vec<u64> = t
                .range(..=upto)?
                .map(|e| e.map(|(k, _)| k.value()))
                .collect::<Result<_, _>>()?;
            for k in keys {
                t.remove(k)?;
            }
            let mut m = w.open_table(META)?;
            m.insert(META_KEY_LAST_PURGED, upto.to_be_bytes().as_slice())?;
        }
        w.commit()?;
        Ok(())
    }

    pub fn last_log_index(&self) -> Result<Option<u64>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(LOG)?;
        let result = t.last()?.map(|(k, _)| k.value());
        Ok(result)
    }

    pub fn first_log_index(&self) -> Result<Option<u64>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(LOG)?;
        let result = t.first()?.map(|(k, _)| k.value());
        Ok(result)
    }

    pub fn last_purged_index(&self) -> Result<Option<u64>, StorageError> {
        let r = self.db.begin_read()?;
        let m = r.open_table(META)?;
        let result = m.get(META_KEY_LAST_PURGED)?.map(|v| {
            let mut a = [0u8; 8];
            a.copy_from_slice(v.value());
            u64::from_be_bytes(a)
        });
        Ok(result)
    }

    pub fn save_vote(&self, encoded: &[u8]) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut m = w.open_table(META)?;
            m.insert(META_KEY_VOTE, encoded)?;
        }
        w.commit()?;
        Ok(())
    }

    pub fn read_vote(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let r = self.db.begin_read()?;
        let m = r.open_table(META)?;
        let result = m.get(META_KEY_VOTE)?.map(|v| v.value().to_vec());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = RaftLogStore::open(&dir.path().join("log.redb")).unwrap();
        store.append_entry(1, b"a").unwrap();
        store.append_entry(2, b"b").unwrap();
        store.append_entry(3, b"c").unwrap();

        let entries = store.get_entries_range(1, 3).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(store.last_log_index().unwrap(), Some(3));
    }

    #[test]
    fn truncate_from_removes_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = RaftLogStore::open(&dir.path().join("log.redb")).unwrap();
        store.append_entries(&[(1, b"a".to_vec()), (2, b"b".to_vec()), (3, b"c".to_vec())]).unwrap();
        store.truncate_from(2).unwrap();
        assert_eq!(store.last_log_index().unwrap(), Some(1));
    }

    #[test]
    fn purge_upto_sets_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let store = RaftLogStore::open(&dir.path().join("log.redb")).unwrap();
        store.append_entries(&[(1, b"a".to_vec()), (2, b"b".to_vec())]).unwrap();
        store.purge_upto(1).unwrap();
        assert_eq!(store.last_purged_index().unwrap(), Some(1));
        assert_eq!(store.first_log_index().unwrap(), Some(2));
    }

    #[test]
    fn vote_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RaftLogStore::open(&dir.path().join("log.redb")).unwrap();
        assert_eq!(store.read_vote().unwrap(), None);
        store.save_vote(b"vote-bytes").unwrap();
        assert_eq!(store.read_vote().unwrap(), Some(b"vote-bytes".to_vec()));
    }
}

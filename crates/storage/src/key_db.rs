//! Durable storage for a signer's key material.
//!
//! Every write goes through the write-ahead log first and is `fsync`'d
//! there before the redb commit happens, so a crash between the two leaves
//! the WAL as the source of truth; [`KeyDb::open`] replays it forward.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::wal::{WalReader, WalWriter};

const KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("KEY_MATERIAL");

/// One row in the key-material database, keyed by `kid`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRecord {
    pub kid: String,
    pub pkh_hex: String,
    /// Output of `sentinel_crypto::key_store::seal` over the LMS/HSS
    /// private material; this crate never sees plaintext key bytes.
    pub sealed_private_material: Vec<u8>,
    pub public_material: Vec<u8>,
    /// LMS/HSS parameter set identifier, e.g. `LMS_SHA256_N32_H10/LMOTS_SHA256_N32_W8`.
    pub parameter_set: String,
    /// The next unused leaf index in the private material, tracked
    /// alongside the sealed bytes so reads don't require unsealing.
    pub current_index: u64,
    pub created_at_unix: u64,
    pub updated_at_unix: u64,
    pub owner: String,
}

pub struct KeyDb {
    db: Arc<Database>,
    wal: WalWriter,
}

impl KeyDb {
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let db = Database::create(dir.join("keys.redb"))?;
        {
            let w = db.begin_write()?;
            w.open_table(KEYS)?;
            w.commit()?;
        }
        let wal_path = dir.join("keys.wal");
        let wal = WalWriter::open(&wal_path)?;

        let db = Self {
            db: Arc::new(db),
            wal,
        };
        db.replay_wal(&wal_path)?;
        Ok(db)
    }

    fn replay_wal(&self, wal_path: &Path) -> Result<(), StorageError> {
        if !wal_path.exists() {
            return Ok(());
        }
        let mut reader = WalReader::open(wal_path)?;
        let records: Vec<KeyRecord> = reader.read_all()?;
        if records.is_empty() {
            return Ok(());
        }
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(KEYS)?;
            for record in &records {
                let bytes =
                    bincode::serialize(record).map_err(|e| StorageError::Encode(e.to_string()))?;
                t.insert(record.kid.as_str(), bytes.as_slice())?;
            }
        }
        w.commit()?;
        self.wal.truncate()?;
        Ok(())
    }

    /// Appends to the WAL (fsync'd), then commits to redb, then truncates
    /// the WAL. A crash between WAL write and redb commit is recovered by
    /// [`KeyDb::open`] replaying the WAL on next startup.
    pub fn put(&self, record: &KeyRecord) -> Result<(), StorageError> {
        self.wal.append(record)?;

        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(KEYS)?;
            let bytes =
                bincode::serialize(record).map_err(|e| StorageError::Encode(e.to_string()))?;
            t.insert(record.kid.as_str(), bytes.as_slice())?;
        }
        w.commit()?;
        self.wal.truncate()?;
        Ok(())
    }

    pub fn get(&self, kid: &str) -> Result<Option<KeyRecord>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(KEYS)?;
        let result = match t.get(kid)? {
            Some(v) => {
                let record = bincode::deserialize(v.value())
                    .map_err(|e| StorageError::Decode(e.to_string()))?;
                Some(record)
            }
            None => None,
        };
        Ok(result)
    }

    pub fn all(&self) -> Result<Vec<KeyRecord>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(KEYS)?;
        let mut out = Vec::new();
        for entry in t.iter()? {
            let (_, v) = entry?;
            let record = bincode::deserialize(v.value())
                .map_err(|e| StorageError::Decode(e.to_string()))?;
            out.push(record);
        }
        Ok(out)
    }

    pub fn delete(&self, kid: &str) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(KEYS)?;
            t.remove(kid)?;
        }
        w.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kid: &str) -> KeyRecord {
        KeyRecord {
            kid: kid.to_string(),
            pkh_hex: "ab".repeat(32),
            sealed_private_material: vec![1, 2, 3],
            public_material: vec![4, 5, 6],
            parameter_set: "LMS_SHA256_N32_H10/LMOTS_SHA256_N32_W8".into(),
            current_index: 0,
            created_at_unix: 1000,
            updated_at_unix: 1000,
            owner: "alice".into(),
        }
    }

    #[test]
    fn put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = KeyDb::open(dir.path()).unwrap();
        db.put(&sample("user_1_key_0")).unwrap();
        let got = db.get("user_1_key_0").unwrap().unwrap();
        assert_eq!(got.owner, "alice");
    }

    #[test]
    fn missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = KeyDb::open(dir.path()).unwrap();
        assert!(db.get("nope").unwrap().is_none());
    }

    #[test]
    fn all_lists_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let db = KeyDb::open(dir.path()).unwrap();
        db.put(&sample("a")).unwrap();
        db.put(&sample("b")).unwrap();
        assert_eq!(db.all().unwrap().len(), 2);
    }

    #[test]
    fn delete_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let db = KeyDb::open(dir.path()).unwrap();
        db.put(&sample("a")).unwrap();
        db.delete("a").unwrap();
        assert!(db.get("a").unwrap().is_none());
    }

    #[test]
    fn reopen_after_crash_replays_wal() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = KeyDb::open(dir.path()).unwrap();
            db.wal.append(&sample("orphaned")).unwrap();
            // Simulate a crash: the redb commit never happened, only the WAL write did.
        }
        let db = KeyDb::open(dir.path()).unwrap();
        assert!(db.get("orphaned").unwrap().is_some());
    }
}

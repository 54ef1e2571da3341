//! Write-ahead log for durable-before-return writes.
//!
//! Used by the key-material database: a signer must not report a key as
//! created until its private material is durably on disk, so every mutation
//! is appended here and `fsync`'d before the caller's future resolves.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StorageError;

#[derive(Serialize, serde::Deserialize, Debug)]
struct EntryHeader {
    data_len: u64,
}

pub struct WalWriter {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl WalWriter {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .write(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Appends `entry` and fsyncs before returning.
    pub fn append<T: Serialize>(&self, entry: &T) -> Result<(), StorageError> {
        let data =
            bincode::serialize(entry).map_err(|e| StorageError::Encode(e.to_string()))?;
        let header = EntryHeader {
            data_len: data.len() as u64,
        };
        let mut writer = self
            .file
            .lock()
            .map_err(|_| StorageError::Backend("wal lock poisoned".into()))?;
        bincode::serialize_into(&mut *writer, &header)
            .map_err(|e| StorageError::Encode(e.to_string()))?;
        writer.write_all(&data)?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Truncates the log to empty, used once its entries are durably
    /// reflected in the redb database.
    pub fn truncate(&self) -> Result<(), StorageError> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| StorageError::Backend("wal lock poisoned".into()))?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        *guard = BufWriter::new(file);
        Ok(())
    }
}

pub struct WalReader {
    reader: BufReader<File>,
}

impl WalReader {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
        })
    }

    pub fn read_all<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, StorageError> {
        let mut out = Vec::new();
        loop {
            if self.reader.fill_buf()?.is_empty() {
                break;
            }
            let header: EntryHeader = bincode::deserialize_from(&mut self.reader)
                .map_err(|e| StorageError::Decode(e.to_string()))?;
            let mut data = vec![0u8; header.data_len as usize];
            self.reader.read_exact(&mut data)?;
            let entry: T =
                bincode::deserialize(&data).map_err(|e| StorageError::Decode(e.to_string()))?;
            out.push(entry);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Entry {
        kid: String,
        index: u64,
    }

    #[test]
    fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.wal");
        let writer = WalWriter::open(&path).unwrap();
        writer
            .append(&Entry {
                kid: "a".into(),
                index: 0,
            })
            .unwrap();
        writer
            .append(&Entry {
                kid: "a".into(),
                index: 1,
            })
            .unwrap();

        let mut reader = WalReader::open(&path).unwrap();
        let entries: Vec<Entry> = reader.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].index, 1);
    }

    #[test]
    fn truncate_clears_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.wal");
        let writer = WalWriter::open(&path).unwrap();
        writer
            .append(&Entry {
                kid: "a".into(),
                index: 0,
            })
            .unwrap();
        writer.truncate().unwrap();
        let mut reader = WalReader::open(&path).unwrap();
        let entries: Vec<Entry> = reader.read_all().unwrap();
        assert!(entries.is_empty());
    }
}

//! The signer face: per-key LMS/HSS private material, sealed at rest and
//! advanced durably on every signature.
//!
//! Callers (the signer driver) are responsible for serializing calls per
//! `kid` — this type performs no locking of its own, matching the
//! single-writer-per-key discipline the driver already enforces.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sentinel_crypto::{key_store, sha256};
use sentinel_storage::{KeyDb, KeyRecord};
use sentinel_types::{Kid, Pkh};
use zeroize::Zeroizing;

use crate::error::KeystoreError;
use crate::lms_backend;

pub struct Keystore {
    db: KeyDb,
    passphrase: Zeroizing<Vec<u8>>,
}

pub struct NewKey {
    pub kid: Kid,
    pub pkh: Pkh,
    pub public_key: Vec<u8>,
    pub parameter_set: String,
}

pub struct SignResult {
    pub signature: Vec<u8>,
    pub advanced_index: u64,
}

impl Keystore {
    pub fn open(dir: &Path, passphrase: Zeroizing<Vec<u8>>) -> Result<Self, KeystoreError> {
        Ok(Self { db: KeyDb::open(dir)?, passphrase })
    }

    /// Generates a fresh LMS/HSS key pair, seals the private material, and
    /// persists it durably before returning. Fails if `kid` already has
    /// material on record.
    pub fn create_key(&self, kid: &Kid, owner: impl Into<String>) -> Result<NewKey, KeystoreError> {
        if self.db.get(kid.as_str())?.is_some() {
            return Err(KeystoreError::AlreadyExists(kid.as_str().to_string()));
        }

        let generated = lms_backend::generate();
        let pkh = Pkh::from_bytes(sha256(&generated.verifying_key_bytes));
        let sealed = key_store::seal(&self.passphrase, &generated.signing_key_bytes)?;
        let now = unix_now();

        let record = KeyRecord {
            kid: kid.as_str().to_string(),
            pkh_hex: pkh.to_hex(),
            sealed_private_material: sealed,
            public_material: generated.verifying_key_bytes.clone(),
            parameter_set: lms_backend::DEFAULT_PARAMETER_SET.to_string(),
            current_index: 0,
            created_at_unix: now,
            updated_at_unix: now,
            owner: owner.into(),
        };
        self.db.put(&record)?;

        Ok(NewKey {
            kid: kid.clone(),
            pkh,
            public_key: generated.verifying_key_bytes,
            parameter_set: record.parameter_set,
        })
    }

    /// Signs `message` at `expected_index`, the index just committed to
    /// the replicated log for this key. Advances the private material by
    /// one leaf and persists the advance before returning the signature.
    pub fn sign(&self, kid: &Kid, expected_index: u64, message: &[u8]) -> Result<SignResult, KeystoreError> {
        let mut record = self.load(kid)?;
        if record.current_index != expected_index {
            return Err(KeystoreError::IndexMismatch { expected: expected_index, actual: record.current_index });
        }

        let plaintext = key_store::open(&self.passphrase, &record.sealed_private_material)?;
        let (signature, advanced_material) = lms_backend::sign(&plaintext, message)?;

        record.sealed_private_material = key_store::seal(&self.passphrase, &advanced_material)?;
        record.current_index += 1;
        record.updated_at_unix = unix_now();
        self.db.put(&record)?;

        Ok(SignResult { signature, advanced_index: record.current_index })
    }

    pub fn current_index(&self, kid: &Kid) -> Result<Option<u64>, KeystoreError> {
        Ok(self.db.get(kid.as_str())?.map(|r| r.current_index))
    }

    pub fn public_key(&self, kid: &Kid) -> Result<Vec<u8>, KeystoreError> {
        Ok(self.load(kid)?.public_material)
    }

    pub fn parameter_set(&self, kid: &Kid) -> Result<String, KeystoreError> {
        Ok(self.load(kid)?.parameter_set)
    }

    pub fn all_kids(&self) -> Result<Vec<String>, KeystoreError> {
        Ok(self.db.all()?.into_iter().map(|r| r.kid).collect())
    }

    fn load(&self, kid: &Kid) -> Result<KeyRecord, KeystoreError> {
        self.db
            .get(kid.as_str())?
            .ok_or_else(|| KeystoreError::NotFound(kid.as_str().to_string()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock is before the unix epoch").as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_keystore() -> (tempfile::TempDir, Keystore) {
        let dir = tempfile::tempdir().unwrap();
        let keystore = Keystore::open(dir.path(), Zeroizing::new(b"correct horse battery staple".to_vec())).unwrap();
        (dir, keystore)
    }

    #[test]
    fn create_key_then_sign_advances_index() {
        let (_dir, keystore) = open_test_keystore();
        let kid = Kid::new("user_1_key_0");
        let created = keystore.create_key(&kid, "alice").unwrap();
        assert_eq!(keystore.current_index(&kid).unwrap(), Some(0));

        let result = keystore.sign(&kid, 0, b"message").unwrap();
        assert_eq!(result.advanced_index, 1);
        assert_eq!(keystore.current_index(&kid).unwrap(), Some(1));
        assert_eq!(keystore.public_key(&kid).unwrap(), created.public_key);
    }

    #[test]
    fn create_key_twice_rejected() {
        let (_dir, keystore) = open_test_keystore();
        let kid = Kid::new("user_1_key_0");
        keystore.create_key(&kid, "alice").unwrap();
        assert!(matches!(keystore.create_key(&kid, "alice"), Err(KeystoreError::AlreadyExists(_))));
    }

    #[test]
    fn sign_with_stale_expected_index_rejected() {
        let (_dir, keystore) = open_test_keystore();
        let kid = Kid::new("user_1_key_0");
        keystore.create_key(&kid, "alice").unwrap();
        keystore.sign(&kid, 0, b"message").unwrap();

        let err = keystore.sign(&kid, 0, b"message").unwrap_err();
        assert!(matches!(err, KeystoreError::IndexMismatch { expected: 0, actual: 1 }));
    }

    #[test]
    fn sign_unknown_kid_rejected() {
        let (_dir, keystore) = open_test_keystore();
        let kid = Kid::new("missing");
        assert!(matches!(keystore.sign(&kid, 0, b"message"), Err(KeystoreError::NotFound(_))));
    }
}

use sentinel_crypto::CryptoError;
use sentinel_storage::StorageError;
use sentinel_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("no key material for kid: {0}")]
    NotFound(String),
    #[error("kid already has key material: {0}")]
    AlreadyExists(String),
    #[error("key material is corrupt or could not be decoded: {0}")]
    CorruptMaterial(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("signing attempted at index {expected}, but the stored private material is at index {actual}")]
    IndexMismatch { expected: u64, actual: u64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ErrorCode for KeystoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "KEYSTORE_NOT_FOUND",
            Self::AlreadyExists(_) => "KEYSTORE_ALREADY_EXISTS",
            Self::CorruptMaterial(_) => "KEYSTORE_CORRUPT_MATERIAL",
            Self::Signing(_) => "KEYSTORE_SIGNING_FAILED",
            Self::IndexMismatch { .. } => "KEYSTORE_INDEX_MISMATCH",
            Self::Storage(_) => "KEYSTORE_STORAGE_ERROR",
            Self::Crypto(_) => "KEYSTORE_CRYPTO_ERROR",
        }
    }
}

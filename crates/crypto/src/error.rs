//! Cryptographic error taxonomy covering the primitives this workspace uses:
//! ECDSA P-256 attestation, SHA-256 digesting, and Argon2id +
//! ChaCha20-Poly1305 key-file encryption.

use sentinel_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("invalid cryptographic key: {0}")]
    InvalidKey(String),
    #[error("invalid signature format: {0}")]
    InvalidSignature(String),
    #[error("key file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("key encryption/decryption failed: {0}")]
    OperationFailed(String),
    #[error("unsupported key file format: {0}")]
    Unsupported(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::Io(_) => "CRYPTO_IO_ERROR",
            Self::OperationFailed(_) => "CRYPTO_OPERATION_FAILED",
            Self::Unsupported(_) => "CRYPTO_UNSUPPORTED",
        }
    }
}

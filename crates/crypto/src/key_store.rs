//! At-rest encryption for LMS/HSS private key material.
//!
//! Private key material is encrypted with ChaCha20-Poly1305, the key itself
//! derived per-file from an operator passphrase via Argon2id. The on-disk
//! format is a small versioned header (version byte, Argon2id salt, AEAD
//! nonce) followed by the ciphertext, so a future KDF or cipher change can
//! be introduced behind a new version byte without breaking old files.

use std::fs;
use std::path::Path;

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::CryptoError;

const FORMAT_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Encrypts `plaintext` under a key derived from `passphrase`, returning the
/// versioned on-disk byte layout: `version || salt || nonce || ciphertext`.
pub fn seal(passphrase: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt)?;
    let cipher = ChaCha20Poly1305::new((&*key).into());
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::OperationFailed("key-file encryption failed".into()))?;

    let mut out = Vec::with_capacity(1 + SALT_LEN + NONCE_LEN + ciphertext.len());
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a byte layout produced by [`seal`].
pub fn open(passphrase: &[u8], sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if sealed.len() < 1 + SALT_LEN + NONCE_LEN {
        return Err(CryptoError::Unsupported("key file too short".into()));
    }
    let version = sealed[0];
    if version != FORMAT_VERSION {
        return Err(CryptoError::Unsupported(format!(
            "unknown key file format version {version}"
        )));
    }
    let salt = &sealed[1..1 + SALT_LEN];
    let nonce_bytes = &sealed[1 + SALT_LEN..1 + SALT_LEN + NONCE_LEN];
    let ciphertext = &sealed[1 + SALT_LEN + NONCE_LEN..];

    let key = derive_key(passphrase, salt)?;
    let cipher = ChaCha20Poly1305::new((&*key).into());
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::OperationFailed("key-file decryption failed: wrong passphrase or corrupt file".into()))?;
    Ok(Zeroizing::new(plaintext))
}

fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    Argon2::default()
        .hash_password_into(passphrase, salt, &mut *key)
        .map_err(|e| CryptoError::OperationFailed(format!("key derivation failed: {e}")))?;
    Ok(key)
}

/// Reads and decrypts a sealed key file from disk.
pub fn load_sealed_file(path: &Path, passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let sealed = fs::read(path)?;
    open(passphrase, &sealed)
}

/// Encrypts `plaintext` and writes it to disk, overwriting any existing file.
pub fn save_sealed_file(path: &Path, passphrase: &[u8], plaintext: &[u8]) -> Result<(), CryptoError> {
    let sealed = seal(passphrase, plaintext)?;
    fs::write(path, sealed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let plaintext = b"super secret lms private key material";
        let sealed = seal(b"correct horse battery staple", plaintext).unwrap();
        let opened = open(b"correct horse battery staple", &sealed).unwrap();
        assert_eq!(&opened[..], plaintext);
    }

    #[test]
    fn open_rejects_wrong_passphrase() {
        let sealed = seal(b"right passphrase", b"data").unwrap();
        assert!(open(b"wrong passphrase", &sealed).is_err());
    }

    #[test]
    fn open_rejects_truncated_file() {
        let sealed = seal(b"pass", b"data").unwrap();
        assert!(open(b"pass", &sealed[..4]).is_err());
    }

    #[test]
    fn open_rejects_unknown_version() {
        let mut sealed = seal(b"pass", b"data").unwrap();
        sealed[0] = 99;
        assert!(open(b"pass", &sealed).is_err());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lms.key");
        save_sealed_file(&path, b"pass", b"lms seed bytes").unwrap();
        let opened = load_sealed_file(&path, b"pass").unwrap();
        assert_eq!(&opened[..], b"lms seed bytes");
    }
}

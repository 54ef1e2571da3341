//! Cryptographic primitives: chain-record digesting, the attestation key
//! pair, and at-rest encryption of signing key material.

pub mod attestation;
pub mod digest;
pub mod error;
pub mod key_store;

pub use attestation::{check_key_pair_consistency, AttestationSigner, AttestationVerifier};
pub use digest::{record_digest, sha256, verify_record_hash};
pub use error::CryptoError;

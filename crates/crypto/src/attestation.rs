//! Attestation key pair: an ECDSA P-256 signature binding a chain record to
//! the signer node that produced it.
//!
//! The signer owns a private key (`AttestationSigner`); every cluster
//! replica trusts a single corresponding public key (`AttestationVerifier`).
//! Both sign and verify over the byte string `kid ":" index`, never over the
//! full record, so the signature is stable across any future record field
//! additions.

use std::fs;
use std::path::Path;

use ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};

use sentinel_types::Kid;

use crate::error::CryptoError;

/// Holds the private half of the attestation key pair. Lives only on signer
/// nodes; cluster replicas never see it.
pub struct AttestationSigner {
    signing_key: SigningKey,
}

impl AttestationSigner {
    /// Loads a PKCS8 PEM-encoded P-256 private key.
    pub fn load_from_pem_file(path: &Path) -> Result<Self, CryptoError> {
        let pem = fs::read_to_string(path)?;
        let signing_key = SigningKey::from_pkcs8_pem(&pem)
            .map_err(|e| CryptoError::InvalidKey(format!("attestation private key: {e}")))?;
        Ok(Self { signing_key })
    }

    /// Signs `kid ":" index` and returns the ASN.1/DER-encoded signature.
    pub fn sign(&self, kid: &Kid, index: u64) -> Vec<u8> {
        let message = kid.attestation_message(index);
        let signature: Signature = self.signing_key.sign(&message);
        signature.to_der().as_bytes().to_vec()
    }

    /// The SEC1/DER-encoded public key matching this signer's private key,
    /// the value embedded in every record this signer produces.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        let verifying_key: VerifyingKey = VerifyingKey::from(&self.signing_key);
        verifying_key
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::OperationFailed(format!("public key export: {e}")))
    }
}

/// Holds the trusted public half of the attestation key pair. Every cluster
/// replica loads exactly one of these at startup and rejects any record
/// whose `attestor_public_key` does not match it.
#[derive(Clone)]
pub struct AttestationVerifier {
    verifying_key: VerifyingKey,
    public_key_der: Vec<u8>,
}

impl AttestationVerifier {
    /// Loads a SubjectPublicKeyInfo PEM-encoded P-256 public key.
    pub fn load_from_pem_file(path: &Path) -> Result<Self, CryptoError> {
        let pem = fs::read_to_string(path)?;
        let verifying_key = VerifyingKey::from_public_key_pem(&pem)
            .map_err(|e| CryptoError::InvalidKey(format!("attestation public key: {e}")))?;
        let public_key_der = verifying_key
            .to_public_key_der()
            .map_err(|e| CryptoError::OperationFailed(format!("public key export: {e}")))?
            .as_bytes()
            .to_vec();
        Ok(Self {
            verifying_key,
            public_key_der,
        })
    }

    /// The SEC1/DER-encoded trusted public key, compared byte-for-byte
    /// against a candidate record's `attestor_public_key`.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Verifies that `signature` (ASN.1/DER) over `kid ":" index` was
    /// produced by the trusted attestation private key, and that
    /// `claimed_public_key_der` matches the trusted public key exactly.
    pub fn verify(
        &self,
        kid: &Kid,
        index: u64,
        signature_der: &[u8],
        claimed_public_key_der: &[u8],
    ) -> Result<(), CryptoError> {
        if claimed_public_key_der != self.public_key_der.as_slice() {
            return Err(CryptoError::VerificationFailed);
        }
        let signature = Signature::from_der(signature_der)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        let message = kid.attestation_message(index);
        self.verifying_key
            .verify(&message, &signature)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

/// Startup consistency check: a signer's private key must derive the exact
/// public key the cluster is configured to trust, or its records will be
/// rejected by every replica at runtime. Checked once at process start so
/// the failure surfaces immediately instead of during the first commit.
pub fn check_key_pair_consistency(
    signer: &AttestationSigner,
    verifier: &AttestationVerifier,
) -> Result<(), CryptoError> {
    let derived = signer.public_key_der()?;
    if derived != verifier.public_key_der() {
        return Err(CryptoError::InvalidKey(
            "signer's derived public key does not match the trusted public key".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::{EncodePrivateKey, LineEnding};
    use rand_core::OsRng;

    fn generate_pair() -> (SigningKey, String, String) {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        let private_pem = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap()
            .to_string();
        let public_pem = verifying_key.to_public_key_pem(LineEnding::LF).unwrap();
        (signing_key, private_pem, public_pem)
    }

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let (_, priv_pem, pub_pem) = generate_pair();
        let priv_file = write_tmp(&priv_pem);
        let pub_file = write_tmp(&pub_pem);

        let signer = AttestationSigner::load_from_pem_file(priv_file.path()).unwrap();
        let verifier = AttestationVerifier::load_from_pem_file(pub_file.path()).unwrap();

        let kid = Kid::new("user_1_key_0");
        let sig = signer.sign(&kid, 3);
        let pubkey = signer.public_key_der().unwrap();

        verifier.verify(&kid, 3, &sig, &pubkey).unwrap();
    }

    #[test]
    fn verify_rejects_wrong_index() {
        let (_, priv_pem, pub_pem) = generate_pair();
        let priv_file = write_tmp(&priv_pem);
        let pub_file = write_tmp(&pub_pem);

        let signer = AttestationSigner::load_from_pem_file(priv_file.path()).unwrap();
        let verifier = AttestationVerifier::load_from_pem_file(pub_file.path()).unwrap();

        let kid = Kid::new("user_1_key_0");
        let sig = signer.sign(&kid, 3);
        let pubkey = signer.public_key_der().unwrap();

        assert!(verifier.verify(&kid, 4, &sig, &pubkey).is_err());
    }

    #[test]
    fn verify_rejects_untrusted_public_key() {
        let (_, priv_pem, _) = generate_pair();
        let (_, _, other_pub_pem) = generate_pair();
        let priv_file = write_tmp(&priv_pem);
        let other_pub_file = write_tmp(&other_pub_pem);

        let signer = AttestationSigner::load_from_pem_file(priv_file.path()).unwrap();
        let verifier = AttestationVerifier::load_from_pem_file(other_pub_file.path()).unwrap();

        let kid = Kid::new("user_1_key_0");
        let sig = signer.sign(&kid, 0);
        let pubkey = signer.public_key_der().unwrap();

        assert!(verifier.verify(&kid, 0, &sig, &pubkey).is_err());
    }

    #[test]
    fn consistency_check_rejects_mismatched_pair() {
        let (_, priv_pem, _) = generate_pair();
        let (_, _, mismatched_pub_pem) = generate_pair();
        let priv_file = write_tmp(&priv_pem);
        let pub_file = write_tmp(&mismatched_pub_pem);

        let signer = AttestationSigner::load_from_pem_file(priv_file.path()).unwrap();
        let verifier = AttestationVerifier::load_from_pem_file(pub_file.path()).unwrap();

        assert!(check_key_pair_consistency(&signer, &verifier).is_err());
    }
}

//! Thin wrapper around the `hbs-lms` crate's free functions, isolating the
//! one-time-signature primitive's exact API from the rest of this crate.

use hbs_lms::signature::{SignerMut, Signature as _, Verifier};
use hbs_lms::{HssParameter, LmotsAlgorithm, LmsAlgorithm, Sha256_256, Seed, Signature, SigningKey, VerifyingKey};
use rand_core::{OsRng, RngCore};

use crate::error::KeystoreError;

pub const DEFAULT_PARAMETER_SET: &str = "LMS_SHA256_M32_H10/LMOTS_SHA256_N32_W4";

fn parameters() -> [HssParameter<Sha256_256>; 1] {
    [HssParameter::new(LmotsAlgorithm::LmotsW4, LmsAlgorithm::LmsH10)]
}

pub struct GeneratedKeyPair {
    pub signing_key_bytes: Vec<u8>,
    pub verifying_key_bytes: Vec<u8>,
}

pub fn generate() -> GeneratedKeyPair {
    let mut seed = Seed::default();
    OsRng.fill_bytes(seed.as_mut_slice());
    let (signing_key, verifying_key) = hbs_lms::keygen::<Sha256_256>(&parameters(), &seed, None)
        .expect("LMS/HSS key generation with valid parameters cannot fail");
    GeneratedKeyPair {
        signing_key_bytes: signing_key.as_slice().to_vec(),
        verifying_key_bytes: verifying_key.as_slice().to_vec(),
    }
}

/// Signs `message` with the private material in `signing_key_bytes`,
/// returning the signature and the re-serialized private material
/// advanced by one leaf. The caller is responsible for persisting the
/// advanced material durably before returning the signature to its own
/// caller.
pub fn sign(signing_key_bytes: &[u8], message: &[u8]) -> Result<(Vec<u8>, Vec<u8>), KeystoreError> {
    let mut signing_key = SigningKey::<Sha256_256>::from_bytes(signing_key_bytes)
        .map_err(|_| KeystoreError::CorruptMaterial("could not decode LMS/HSS private key".into()))?;

    let signature = signing_key
        .try_sign(message)
        .map_err(|_| KeystoreError::Signing("LMS/HSS private key is exhausted".into()))?;

    Ok((signature.as_bytes().to_vec(), signing_key.as_slice().to_vec()))
}

pub fn verify(message: &[u8], signature_bytes: &[u8], verifying_key_bytes: &[u8]) -> Result<bool, KeystoreError> {
    let signature = Signature::from_bytes(signature_bytes)
        .map_err(|_| KeystoreError::CorruptMaterial("could not decode LMS/HSS signature".into()))?;
    let verifying_key = VerifyingKey::<Sha256_256>::from_bytes(verifying_key_bytes)
        .map_err(|_| KeystoreError::CorruptMaterial("could not decode LMS/HSS public key".into()))?;
    Ok(verifying_key.verify(message, &signature).is_ok())
}

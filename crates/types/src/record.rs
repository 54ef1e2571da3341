//! The chain record: the immutable unit of state for one index-use fact.
//!
//! Canonical serialization orders fields deterministically (struct
//! declaration order, preserved by `serde_json` for non-map types) and
//! excludes the `hash` field from the digest input.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::ids::{Kid, Pkh};

/// A SHA-256 digest, used for both `previous_hash` and `hash`.
///
/// Implementers must treat `previous_hash` as opaque bytes copied verbatim
/// from the predecessor's `hash` field — never recomputed or reconstructed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = BASE64
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("digest must be 32 bytes"))?;
        Ok(Digest(arr))
    }
}

/// Fixed sentinel used as `previous_hash` of the first record in every
/// chain. Chosen as the all-zero digest: it can never collide with a real
/// SHA-256 output of a well-formed record (a record's canonical encoding
/// always contains non-zero length-prefixed field data), and it needs no
/// out-of-band agreement beyond "32 zero bytes", unlike a hash-of-a-label
/// scheme which would require every replica to agree on the label.
pub const GENESIS_DIGEST: Digest = Digest([0u8; 32]);

/// The kind of state transition a chain record authorizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// First record of a chain; fixes `index = 0`.
    Create,
    /// A normal index-use authorization.
    Sign,
    /// Realigns the replicated log's head with an external ledger's head.
    Sync,
    /// Marks a chain terminal; no further records may follow.
    Delete,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordType::Create => "create",
            RecordType::Sign => "sign",
            RecordType::Sync => "sync",
            RecordType::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// One row in a per-key chain.
///
/// `hash` is excluded from its own digest input; see [`ChainRecord::canonical_bytes`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainRecord {
    pub kid: Kid,
    pub pkh: Pkh,
    pub index: u64,
    pub previous_hash: Digest,
    pub record_type: RecordType,
    /// ASN.1/DER-encoded ECDSA signature over `kid ":" index`.
    #[serde(with = "base64_bytes")]
    pub attestation_signature: Vec<u8>,
    /// SEC1/DER-encoded public key of the signer claimed to have produced
    /// `attestation_signature`.
    #[serde(with = "base64_bytes")]
    pub attestor_public_key: Vec<u8>,
    /// Digest over every other field, in canonical field order.
    pub hash: Digest,
}

/// The subset of fields hashed to produce [`ChainRecord::hash`]. Kept as a
/// separate, smaller struct (rather than skipping a field on `ChainRecord`
/// with a serde attribute) so that the field order used for hashing is
/// pinned independently of any future reordering of `ChainRecord` itself.
#[derive(Serialize)]
struct HashedFields<'a> {
    kid: &'a Kid,
    pkh: &'a Pkh,
    index: u64,
    previous_hash: &'a Digest,
    record_type: RecordType,
    attestation_signature: &'a [u8],
    attestor_public_key: &'a [u8],
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

impl ChainRecord {
    /// The canonical JSON byte encoding of this record with `hash` omitted
    /// entirely (not blanked), the exact input to the SHA-256 digest.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let fields = HashedFields {
            kid: &self.kid,
            pkh: &self.pkh,
            index: self.index,
            previous_hash: &self.previous_hash,
            record_type: self.record_type,
            attestation_signature: &self.attestation_signature,
            attestor_public_key: &self.attestor_public_key,
        };
        // `serde_json` preserves struct field declaration order for
        // non-map types, which is what makes this encoding canonical.
        serde_json::to_vec(&fields).expect("ChainRecord fields are always serializable")
    }

    /// The byte string the attestation key signs: `kid ":" index`.
    pub fn attestation_message(&self) -> Vec<u8> {
        self.kid.attestation_message(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChainRecord {
        ChainRecord {
            kid: Kid::new("user_1_key_0"),
            pkh: Pkh::from_bytes([7u8; 32]),
            index: 0,
            previous_hash: GENESIS_DIGEST,
            record_type: RecordType::Create,
            attestation_signature: vec![1, 2, 3],
            attestor_public_key: vec![4, 5, 6],
            hash: Digest([0u8; 32]),
        }
    }

    #[test]
    fn canonical_bytes_excludes_hash() {
        let mut a = sample();
        let b_bytes = a.canonical_bytes();
        a.hash = Digest([9u8; 32]);
        let a_bytes = a.canonical_bytes();
        assert_eq!(a_bytes, b_bytes, "hash field must not affect canonical bytes");
    }

    #[test]
    fn canonical_bytes_change_with_index() {
        let mut r = sample();
        let b0 = r.canonical_bytes();
        r.index = 1;
        let b1 = r.canonical_bytes();
        assert_ne!(b0, b1);
    }

    #[test]
    fn attestation_message_matches_spec_format() {
        let r = sample();
        assert_eq!(r.attestation_message(), b"user_1_key_0:0".to_vec());
    }
}

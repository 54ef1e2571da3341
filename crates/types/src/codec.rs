//! Canonical, deterministic wire codec used for all consensus-critical data.
//!
//! JSON with base64-encoded binary fields is the wire and digest-input
//! encoding; this module centralizes `serde_json` encode/decode so that
//! every component serializes the same bytes for the same value.

use serde::{de::DeserializeOwned, Serialize};

/// Encodes a value into its canonical byte representation.
///
/// Every piece of data that crosses the replicated log, is hashed, or is
/// signed must go through this function so that all replicas agree on the
/// exact bytes.
pub fn to_bytes_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, String> {
    serde_json::to_vec(v).map_err(|e| format!("canonical encode failed: {e}"))
}

/// Decodes a value from its canonical byte representation.
pub fn from_bytes_canonical<T: DeserializeOwned>(b: &[u8]) -> Result<T, String> {
    serde_json::from_slice(b).map_err(|e| format!("canonical decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
    struct Sample {
        id: u32,
        name: String,
        tags: Vec<u8>,
    }

    #[test]
    fn roundtrip() {
        let s = Sample {
            id: 7,
            name: "k".into(),
            tags: vec![1, 2, 3],
        };
        let bytes = to_bytes_canonical(&s).unwrap();
        let back: Sample = from_bytes_canonical(&bytes).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = from_bytes_canonical::<Sample>(b"not json").unwrap_err();
        assert!(err.contains("canonical decode failed"));
    }
}

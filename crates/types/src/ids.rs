//! Key identifiers: `Pkh` (the primary, wire-level identifier) and `Kid`
//! (the human-readable alias used by CLIs and key-material metadata).

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// SHA-256 digest of a managed signing key's serialized public key.
///
/// `Pkh` is deterministic and not secret. It is base64-encoded on the wire
/// and hex-encoded when used as a URL path segment (`/pubkey_hash/<hex>/...`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pkh(pub [u8; 32]);

impl Pkh {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, PkhParseError> {
        let bytes = hex::decode(s).map_err(|_| PkhParseError::InvalidHex)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PkhParseError::WrongLength)?;
        Ok(Self(arr))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, PkhParseError> {
        let bytes = BASE64.decode(s).map_err(|_| PkhParseError::InvalidBase64)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PkhParseError::WrongLength)?;
        Ok(Self(arr))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PkhParseError {
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("expected 32 bytes")]
    WrongLength,
}

impl FromStr for Pkh {
    type Err = PkhParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Pkh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Pkh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pkh({})", self.to_hex())
    }
}

impl Serialize for Pkh {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Pkh {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pkh::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// Human-readable alias for a managed key, e.g. `user_42_key_0`.
///
/// `Kid` is mapped 1:1 to a `Pkh` at key-creation time and is stored as
/// metadata only; it carries no authority of its own.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kid(pub String);

impl Kid {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The exact byte string signed by the attestation key: `kid ":" index`.
    pub fn attestation_message(&self, index: u64) -> Vec<u8> {
        format!("{}:{}", self.0, index).into_bytes()
    }
}

impl fmt::Display for Kid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Kid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Kid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

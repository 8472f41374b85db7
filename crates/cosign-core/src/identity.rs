//! # Identifier Newtypes
//!
//! [`FileHash`] keys every contract; [`PartyKey`] identifies every client
//! and arbitrator, both as a transport identity and as escrow key material.
//! You cannot pass one where the other is expected.
//!
//! Both validate at construction and normalize to lowercase hex, so two
//! spellings of the same key never create two store entries.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::hex;

/// Hex-encoded content hash of the governed document.
///
/// Any non-empty hex string is accepted; local documents hash to 64 hex
/// characters (SHA-256) but counterparties may use shorter test digests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHash(String);

impl FileHash {
    /// Parse and normalize a file hash.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        hex::validate(s, "file hash")?;
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Build from a raw 32-byte digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// The normalized hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for FileHash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for FileHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FileHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A party's 32-byte x-only public key, as 64 hex characters.
///
/// The same value is the party's transport identity and the key material
/// that goes into the escrow script once reconstructed as a compressed key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartyKey(String);

impl PartyKey {
    /// Hex length of a party key.
    pub const HEX_LEN: usize = 64;

    /// Parse and normalize a party key.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        hex::validate(s, "party key")?;
        if s.len() != Self::HEX_LEN {
            return Err(ValidationError::InvalidLength {
                kind: "party key",
                expected: Self::HEX_LEN,
                actual: s.len(),
            });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Build from raw x-only key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// The normalized hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw 32 bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        // Validated as 64 hex chars at construction.
        hex::decode_array::<32>(&self.0, "party key").unwrap_or([0u8; 32])
    }
}

impl std::fmt::Debug for PartyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PartyKey({}...)", &self.0[..8])
    }
}

impl std::fmt::Display for PartyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PartyKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for PartyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PartyKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn any_64_hex_chars_is_a_party_key(s in "[0-9a-fA-F]{64}") {
            let key = PartyKey::new(&s).unwrap();
            prop_assert_eq!(key.as_str(), s.to_ascii_lowercase());
        }

        #[test]
        fn wrong_length_is_never_a_party_key(s in "[0-9a-f]{1,63}") {
            prop_assert!(PartyKey::new(&s).is_err());
        }
    }
}

//! Content addresses for module sources.
//!
//! The hash is Keccak-256 over the raw UTF-8 source text: no domain
//! separator, no length prefix. It is the registry's lookup key and nothing
//! else; it is unrelated to the codec's wire bytes.

use rhomod_term::{HexError, hex_lower, parse_hex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Width of a content hash in bytes.
pub const CONTENT_HASH_LEN: usize = 32;

/// A content address identifying one module source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; CONTENT_HASH_LEN]);

impl ContentHash {
    /// Hash raw module source text.
    pub fn of_source(source: &str) -> Self {
        Self::of_bytes(source.as_bytes())
    }

    /// Hash raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        let digest = Keccak256::digest(data);
        let mut out = [0u8; CONTENT_HASH_LEN];
        out.copy_from_slice(&digest);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_HASH_LEN] {
        &self.0
    }

    /// Lowercase hex, the form used as the persisted registry key.
    pub fn to_hex(&self) -> String {
        hex_lower(&self.0)
    }

    /// Parse the hex form (either case).
    pub fn from_hex(text: &str) -> Result<Self, ContentHashParseError> {
        let text = text.trim();
        if text.len() != CONTENT_HASH_LEN * 2 {
            return Err(ContentHashParseError::Length(text.len()));
        }
        let bytes = parse_hex(text).map_err(|e| match e {
            HexError::OddLength(n) => ContentHashParseError::Length(n),
            HexError::Digit(at) => ContentHashParseError::Digit(at),
        })?;
        let mut out = [0u8; CONTENT_HASH_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

/// Errors from parsing a hex content hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentHashParseError {
    #[error("expected 64 hex digits, got {0}")]
    Length(usize),

    #[error("invalid hex digit at position {0}")]
    Digit(usize),
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = ContentHashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_reference_digests() {
        assert_eq!(
            ContentHash::of_source("").to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            ContentHash::of_source("abc").to_hex(),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn hashes_raw_text_without_normalization() {
        let a = ContentHash::of_source("new x in { Nil }");
        let b = ContentHash::of_source("new x in { Nil }\n");
        assert_ne!(a, b);
        assert_eq!(a, ContentHash::of_source("new x in { Nil }"));
    }

    #[test]
    fn hex_round_trips_and_rejects_garbage() {
        let hash = ContentHash::of_source("module");
        assert_eq!(ContentHash::from_hex(&hash.to_hex()), Ok(hash));
        assert_eq!(
            ContentHash::from_hex(&hash.to_hex().to_uppercase()),
            Ok(hash)
        );
        assert_eq!(
            ContentHash::from_hex("abcd"),
            Err(ContentHashParseError::Length(4))
        );
        let bad = format!("zz{}", &hash.to_hex()[2..]);
        assert_eq!(
            ContentHash::from_hex(&bad),
            Err(ContentHashParseError::Digit(0))
        );
    }

    #[test]
    fn serializes_as_hex_string() {
        let hash = ContentHash::of_source("abc");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}

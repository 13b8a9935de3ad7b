//! # Content Hash — Credential Identity on and off Chain
//!
//! A [`ContentHash`] is the SHA-256 digest of a credential's canonical bytes
//! (proof excluded). It is the key under which the credential is anchored,
//! looked up by verifiers, and recorded in audit entries.
//!
//! ## Security Invariant
//!
//! [`sha256_digest()`] accepts only `&CanonicalBytes`, so every hash in the
//! system was produced through the canonicalization pipeline.
//!
//! ## Text Form
//!
//! Always 64 lowercase hex characters, no `0x` prefix. Parsing is strict:
//! uppercase or prefixed input is rejected so that the same credential can
//! never be looked up under two spellings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::{canonicalize_document, CanonicalBytes};
use crate::error::EncodingError;

/// SHA-256 digest of canonical credential bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the canonical text form: exactly 64 lowercase hex characters.
    ///
    /// # Errors
    ///
    /// [`EncodingError::InvalidContentHash`] for any other input.
    pub fn from_hex(s: &str) -> Result<Self, EncodingError> {
        let invalid = |reason: &str| EncodingError::InvalidContentHash {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        if s.len() != 64 {
            return Err(invalid("expected 64 hex characters"));
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(invalid("expected lowercase hex digits only"));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl std::str::FromStr for ContentHash {
    type Err = EncodingError;

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
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Compute the SHA-256 content hash of canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentHash {
    let digest = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    ContentHash(bytes)
}

/// Lowercase hex SHA-256 of canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// Canonicalize a credential document (proof excluded) and hash it.
pub fn hash_document(doc: &impl Serialize) -> Result<ContentHash, EncodingError> {
    Ok(sha256_digest(&canonicalize_document(doc)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_sha256_vector() {
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        assert_eq!(
            sha256_hex(&cb),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn hash_ignores_key_order_and_proof() {
        let a = json!({"issuer": "did:authenticred:1", "credentialSubject": {"degree": "BSc", "id": "did:authenticred:2"}});
        let b = json!({
            "credentialSubject": {"id": "did:authenticred:2", "degree": "BSc"},
            "proof": {"proofValue": "ff"},
            "issuer": "did:authenticred:1"
        });
        assert_eq!(hash_document(&a).unwrap(), hash_document(&b).unwrap());
    }

    #[test]
    fn different_documents_different_hashes() {
        let a = hash_document(&json!({"a": 1})).unwrap();
        let b = hash_document(&json!({"a": 2})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hex_roundtrip() {
        let h = hash_document(&json!({"k": "v"})).unwrap();
        let parsed: ContentHash = h.to_hex().parse().unwrap();
        assert_eq!(h, parsed);
        assert_eq!(h.to_string().len(), 64);
    }

    #[test]
    fn from_hex_rejects_uppercase_and_prefix() {
        let upper = "A".repeat(64);
        assert!(ContentHash::from_hex(&upper).is_err());
        let prefixed = format!("0x{}", "a".repeat(62));
        assert!(ContentHash::from_hex(&prefixed).is_err());
        assert!(ContentHash::from_hex("abc").is_err());
    }

    #[test]
    fn serde_uses_hex_string() {
        let h = ContentHash::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}

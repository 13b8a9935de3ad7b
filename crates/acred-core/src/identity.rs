//! # Identity Newtypes
//!
//! [`Did`] names issuers and holders; [`CredentialId`] names a credential in
//! the revocation registry; [`TxHash`] names a chain transaction. All three
//! validate at construction and at deserialization, so an invalid
//! identifier never reaches a chain call or a stored record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// DID method used for identifiers minted by this system.
pub const DID_METHOD: &str = "authenticred";

/// Implement `Deserialize` for string newtypes by routing through `new()`.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A W3C decentralized identifier, `did:<method>:<identifier>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Did(String);

impl_validating_deserialize!(Did);

impl Did {
    /// Create a DID from a string, validating format.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidDid`] unless the method is non-empty
    /// lowercase alphanumeric and the identifier is non-empty.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let (method, identifier) = split_did(&s).ok_or_else(|| ValidationError::InvalidDid(s.clone()))?;
        let method_ok = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !method_ok || identifier.is_empty() || identifier.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidDid(s));
        }
        Ok(Self(s))
    }

    /// Mint a fresh `did:authenticred:<uuid>`.
    pub fn generate() -> Self {
        Self(format!("did:{DID_METHOD}:{}", Uuid::new_v4()))
    }

    /// Access the DID string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method (between the first and second colon).
    pub fn method(&self) -> &str {
        split_did(&self.0).map(|(m, _)| m).unwrap_or_default()
    }

    /// The method-specific identifier.
    pub fn method_specific_id(&self) -> &str {
        split_did(&self.0).map(|(_, id)| id).unwrap_or_default()
    }

    /// Default verification method for keys bound to this DID.
    pub fn key_reference(&self) -> String {
        format!("{}#keys-1", self.0)
    }
}

fn split_did(s: &str) -> Option<(&str, &str)> {
    s.strip_prefix("did:")?.split_once(':')
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a credential in the revocation registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl_validating_deserialize!(CredentialId);

impl CredentialId {
    /// Wrap an existing identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidCredentialId(s));
        }
        Ok(Self(s))
    }

    /// Random UUID-based identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `0x`-prefixed, lowercase 32-byte transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl_validating_deserialize!(TxHash);

impl TxHash {
    /// Accepts either case, with or without the `0x` prefix.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let lower = value.trim().to_ascii_lowercase();
        let body = lower.strip_prefix("0x").unwrap_or(&lower);
        if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidTxHash(value));
        }
        Ok(Self(format!("0x{body}")))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `s` is a verification-form content hash: 64 lowercase hex chars.
pub fn is_content_hash_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_dids() {
        let did = Did::new("did:authenticred:1234").unwrap();
        assert_eq!(did.method(), "authenticred");
        assert_eq!(did.method_specific_id(), "1234");
        assert!(Did::new("did:web:example.com:users:alice").is_ok());
    }

    #[test]
    fn invalid_dids() {
        for bad in ["", "did:", "did:authenticred", "did::x", "did:Auth:x", "urn:x:y", "did:web: x"] {
            assert!(Did::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn generated_did_uses_local_method() {
        let did = Did::generate();
        assert_eq!(did.method(), DID_METHOD);
        assert!(Did::new(did.as_str()).is_ok());
    }

    #[test]
    fn key_reference_suffix() {
        let did = Did::new("did:authenticred:abc").unwrap();
        assert_eq!(did.key_reference(), "did:authenticred:abc#keys-1");
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<Did, _> = serde_json::from_str("\"did:authenticred:x\"");
        assert!(ok.is_ok());
        let bad: Result<Did, _> = serde_json::from_str("\"not-a-did\"");
        assert!(bad.is_err());
    }

    #[test]
    fn credential_id_rules() {
        assert!(CredentialId::new("").is_err());
        assert!(CredentialId::new("has space").is_err());
        let generated = CredentialId::generate();
        assert_eq!(generated.as_str().len(), 36);
    }

    #[test]
    fn tx_hash_normalizes_case_and_prefix() {
        let upper = format!("0x{}", "AB".repeat(32));
        let h = TxHash::new(upper).unwrap();
        assert_eq!(h.as_str(), format!("0x{}", "ab".repeat(32)));
        assert_eq!(TxHash::new("ab".repeat(32)).unwrap(), h);
        assert!(matches!(TxHash::new("0x1234"), Err(ValidationError::InvalidTxHash(_))));
        assert_eq!(TxHash::from_bytes([0xab; 32]), h);
    }

    #[test]
    fn tx_hash_serde_validates() {
        let ok: TxHash = serde_json::from_value(serde_json::json!(format!("0x{}", "00".repeat(32)))).unwrap();
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!(ok.as_str()));
        assert!(serde_json::from_value::<TxHash>(serde_json::json!("0xzz")).is_err());
    }

    #[test]
    fn content_hash_form() {
        assert!(is_content_hash_hex(&"0f".repeat(32)));
        assert!(!is_content_hash_hex(&"0F".repeat(32)));
        assert!(!is_content_hash_hex("0f"));
    }
}

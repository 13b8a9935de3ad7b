//! What a verifier submits: a content hash or a whole credential.

use serde_json::Value;
use thiserror::Error;

use acred_core::{is_content_hash_hex, ContentHash};
use acred_vc::{CredentialDocument, VcError};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("input is neither a 64-character lowercase hex hash nor a JSON credential: {0}")]
    Unrecognized(String),

    #[error("credential document rejected: {0}")]
    Document(#[from] VcError),
}

#[derive(Debug, Clone)]
pub enum VerificationInput {
    Hash(ContentHash),
    Document {
        document: Box<CredentialDocument>,
        hash: ContentHash,
    },
}

impl VerificationInput {
    /// Accepts a content hash or a credential JSON document.
    pub fn parse(input: &str) -> Result<Self, InputError> {
        let trimmed = input.trim();
        if is_content_hash_hex(trimmed) {
            let hash = ContentHash::from_hex(trimmed).map_err(|e| InputError::Unrecognized(e.to_string()))?;
            return Ok(Self::Hash(hash));
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|e| InputError::Unrecognized(e.to_string()))?;
        Self::from_document(CredentialDocument::from_value(value)?)
    }

    pub fn from_document(document: CredentialDocument) -> Result<Self, InputError> {
        let hash = document.content_hash()?;
        Ok(Self::Document {
            document: Box::new(document),
            hash,
        })
    }

    pub fn content_hash(&self) -> ContentHash {
        match self {
            Self::Hash(hash) | Self::Document { hash, .. } => *hash,
        }
    }
}

impl From<ContentHash> for VerificationInput {
    fn from(hash: ContentHash) -> Self {
        Self::Hash(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acred_core::{Did, Timestamp};
    use serde_json::json;

    #[test]
    fn hash_input() {
        let hex = "0f".repeat(32);
        let input = VerificationInput::parse(&format!("  {hex}\n")).unwrap();
        assert_eq!(input.content_hash().to_hex(), hex);
    }

    #[test]
    fn uppercase_and_short_hashes_are_not_hashes() {
        assert!(VerificationInput::parse(&"AB".repeat(32)).is_err());
        assert!(VerificationInput::parse("abcd").is_err());
    }

    #[test]
    fn document_input_hashes_without_proof() {
        let doc = CredentialDocument::new(
            "urn:cred:1",
            "DegreeCredential",
            Did::new("did:authenticred:uni").unwrap(),
            &Did::new("did:authenticred:bob").unwrap(),
            json!({"degree": "BSc"}).as_object().cloned().unwrap(),
            Timestamp::parse("2024-01-01T00:00:00Z").unwrap(),
            None,
        )
        .unwrap();
        let expected = doc.content_hash().unwrap();
        let text = serde_json::to_string(&doc.to_value().unwrap()).unwrap();
        let input = VerificationInput::parse(&text).unwrap();
        assert_eq!(input.content_hash(), expected);
        assert!(matches!(input, VerificationInput::Document { .. }));
    }

    #[test]
    fn malformed_document_is_rejected() {
        let err = VerificationInput::parse(r#"{"issuer": "not-a-did"}"#).unwrap_err();
        assert!(matches!(err, InputError::Document(_)));
    }
}

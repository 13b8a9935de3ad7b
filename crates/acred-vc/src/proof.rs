//! # Proof Block
//!
//! The `proof` member attached to a signed credential. It is excluded from
//! both the signing input and the content hash.
//!
//! The signature is carried in `proofValue` as 128 lowercase hex chars.
//! Documents produced by older issuers carry it in `jws` as `"v=<hex>"`;
//! [`Proof::signature_hex()`] reads either.

use serde::{Deserialize, Serialize};

use acred_core::Timestamp;
use acred_crypto::PROOF_TYPE;

/// The purpose of a cryptographic proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// The issuer asserts the credential claims are true.
    AssertionMethod,
    /// Authentication of the credential holder.
    Authentication,
}

impl std::fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofPurpose::AssertionMethod => write!(f, "assertionMethod"),
            ProofPurpose::Authentication => write!(f, "authentication"),
        }
    }
}

/// A cryptographic proof on a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    /// Signature suite name.
    #[serde(rename = "type")]
    pub proof_type: String,

    /// When the proof was created.
    pub created: Timestamp,

    /// Purpose of the proof.
    #[serde(rename = "proofPurpose")]
    pub proof_purpose: ProofPurpose,

    /// DID URL of the signing key, `"{issuer}#keys-1"`.
    #[serde(rename = "verificationMethod")]
    pub verification_method: String,

    /// Hex signature.
    #[serde(rename = "proofValue", default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,

    /// Legacy signature carrier, `"v=<hex>"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
}

impl Proof {
    /// An `EcdsaSecp256k1Signature2019` assertion proof.
    pub fn ecdsa(verification_method: String, signature_hex: String, created: Option<Timestamp>) -> Self {
        Self {
            proof_type: PROOF_TYPE.to_string(),
            created: created.unwrap_or_else(Timestamp::now),
            proof_purpose: ProofPurpose::AssertionMethod,
            verification_method,
            proof_value: Some(signature_hex),
            jws: None,
        }
    }

    /// Whether this proof uses the supported signature suite.
    pub fn is_supported(&self) -> bool {
        self.proof_type == PROOF_TYPE
    }

    /// The signature hex, from `proofValue` or else from a `v=` prefixed `jws`.
    pub fn signature_hex(&self) -> Option<&str> {
        if let Some(value) = self.proof_value.as_deref() {
            return Some(value);
        }
        self.jws.as_deref().and_then(|jws| jws.strip_prefix("v="))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdsa_proof_shape() {
        let created = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let proof = Proof::ecdsa("did:authenticred:a#keys-1".into(), "ab".repeat(64), Some(created));
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json["type"], "EcdsaSecp256k1Signature2019");
        assert_eq!(json["proofPurpose"], "assertionMethod");
        assert_eq!(json["created"], "2026-01-01T00:00:00Z");
        assert!(json.get("jws").is_none());
        assert!(proof.is_supported());
    }

    #[test]
    fn signature_from_legacy_jws() {
        let json = serde_json::json!({
            "type": "EcdsaSecp256k1Signature2019",
            "created": "2025-05-01T10:00:00Z",
            "proofPurpose": "assertionMethod",
            "verificationMethod": "did:authenticred:a#keys-1",
            "jws": "v=deadbeef"
        });
        let proof: Proof = serde_json::from_value(json).unwrap();
        assert_eq!(proof.signature_hex(), Some("deadbeef"));
    }

    #[test]
    fn missing_signature_is_none() {
        let mut proof = Proof::ecdsa("vm".into(), "00".into(), None);
        proof.proof_value = None;
        proof.jws = Some("eyJhbGciOi".into());
        assert_eq!(proof.signature_hex(), None);
    }
}

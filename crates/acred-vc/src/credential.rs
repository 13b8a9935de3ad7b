//! # Credential Document, Signing, and Signature Verification
//!
//! ## Security Invariants
//!
//! - **Signing** canonicalizes the document with `proof` removed via
//!   [`canonicalize_document()`], signs those bytes with ECDSA secp256k1,
//!   and attaches a single [`Proof`]. Re-signing replaces the proof.
//! - **Verification** recomputes the same canonical bytes and checks the
//!   proof signature against the supplied issuer key. Every failure mode
//!   (no proof, unsupported suite, malformed hex, wrong key) yields `false`.
//! - Parsing and re-serializing a document never changes its hash.
//!   Members the typed envelope does not know are kept in `extensions`,
//!   dates keep the issuer's exact text ([`DocumentDate`]), and no
//!   member is filled in by default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use acred_core::{
    canonicalize_document, sha256_digest, CanonicalBytes, ContentHash, Did, DocumentDate, EncodingError, Timestamp,
};
use acred_crypto::{CryptoError, PrivateKey, PublicKey, Signature};

use crate::proof::Proof;

/// Base JSON-LD context for W3C credentials.
pub const VC_CONTEXT_V1: &str = "https://www.w3.org/2018/credentials/v1";

/// Type every credential carries.
pub const VC_TYPE: &str = "VerifiableCredential";

/// Errors from building, signing, or parsing credential documents.
#[derive(Error, Debug)]
pub enum VcError {
    /// The document could not be canonicalized.
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Crypto(#[from] CryptoError),

    /// The document is missing a required member or has the wrong shape.
    #[error("malformed credential document: {0}")]
    Malformed(String),
}

/// A verifiable credential document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDocument {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<Value>,

    /// Credential identifier (also the revocation-registry key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Credential types; includes `"VerifiableCredential"`.
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,

    /// Issuer DID.
    pub issuer: Did,

    /// When the credential was issued.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: DocumentDate,

    /// Optional expiration.
    #[serde(rename = "expirationDate", default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DocumentDate>,

    /// Holder `id` plus the claim payload.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: Map<String, Value>,

    /// Proof block; excluded from signing input and hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,

    /// Other top-level members, kept verbatim.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

fn default_context() -> Vec<Value> {
    vec![Value::String(VC_CONTEXT_V1.to_string())]
}

fn default_types() -> Vec<String> {
    vec![VC_TYPE.to_string()]
}

impl CredentialDocument {
    /// Build an unsigned document.
    ///
    /// `claims` must not contain `id`; the holder DID is placed there.
    pub fn new(
        id: impl Into<String>,
        credential_type: impl Into<String>,
        issuer: Did,
        holder: &Did,
        claims: Map<String, Value>,
        issuance_date: Timestamp,
        expiration_date: Option<Timestamp>,
    ) -> Result<Self, VcError> {
        if claims.contains_key("id") {
            return Err(VcError::Malformed("claims must not set credentialSubject.id".into()));
        }
        let mut subject = claims;
        subject.insert("id".into(), Value::String(holder.to_string()));

        let mut types = default_types();
        let extra_type = credential_type.into();
        if !extra_type.is_empty() && extra_type != VC_TYPE {
            types.push(extra_type);
        }

        Ok(Self {
            context: default_context(),
            id: Some(id.into()),
            credential_type: types,
            issuer,
            issuance_date: issuance_date.into(),
            expiration_date: expiration_date.map(DocumentDate::from),
            credential_subject: subject,
            proof: None,
            extensions: BTreeMap::new(),
        })
    }

    /// Parse and shape-check a JSON document.
    pub fn from_value(value: Value) -> Result<Self, VcError> {
        let doc: Self = serde_json::from_value(value).map_err(|e| VcError::Malformed(e.to_string()))?;
        doc.validate_shape()?;
        Ok(doc)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<Value, VcError> {
        serde_json::to_value(self).map_err(|e| VcError::Encoding(EncodingError::Serialization(e)))
    }

    /// Required-member checks beyond what serde enforces.
    pub fn validate_shape(&self) -> Result<(), VcError> {
        if !self.credential_type.iter().any(|t| t == VC_TYPE) {
            return Err(VcError::Malformed(format!("type must include {VC_TYPE}")));
        }
        match self.credential_subject.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Ok(()),
            _ => Err(VcError::Malformed("credentialSubject.id must be a non-empty string".into())),
        }
    }

    /// Holder identifier from `credentialSubject.id`.
    pub fn holder(&self) -> Option<&str> {
        self.credential_subject.get("id").and_then(Value::as_str)
    }

    /// Canonical bytes with `proof` excluded.
    pub fn signing_input(&self) -> Result<CanonicalBytes, VcError> {
        Ok(canonicalize_document(self)?)
    }

    /// SHA-256 of [`signing_input()`](Self::signing_input).
    pub fn content_hash(&self) -> Result<ContentHash, VcError> {
        Ok(sha256_digest(&self.signing_input()?))
    }

    /// Whether the expiration date lies before `now`. No date means never.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiration_date.as_ref().is_some_and(|exp| exp.timestamp() < now)
    }

    /// Sign with the issuer key, replacing any existing proof.
    ///
    /// Returns the content hash of the signed body.
    pub fn sign(&mut self, key: &PrivateKey, created: Option<Timestamp>) -> Result<ContentHash, VcError> {
        let input = self.signing_input()?;
        let signature = key.sign(&input)?;
        self.proof = Some(Proof::ecdsa(
            self.issuer.key_reference(),
            signature.to_hex(),
            created,
        ));
        Ok(sha256_digest(&input))
    }

    /// Check the proof signature against `public_key`.
    pub fn verify_signature(&self, public_key: &PublicKey) -> bool {
        let Some(proof) = self.proof.as_ref() else {
            return false;
        };
        if !proof.is_supported() {
            return false;
        }
        let Some(sig_hex) = proof.signature_hex() else {
            return false;
        };
        let Ok(signature) = Signature::from_hex(sig_hex) else {
            return false;
        };
        match self.signing_input() {
            Ok(input) => public_key.verify(&input, &signature),
            Err(_) => false,
        }
    }
}

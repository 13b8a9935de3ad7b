//! # Credential Lifecycle
//!
//! ```text
//!   DRAFT ──issue()──▶ ISSUED ──revoke(reason)──▶ REVOKED
//! ```
//!
//! `EXPIRED` is never stored by a transition. It is derived by
//! [`CredentialRecord::effective_status()`] from the expiration date, and
//! a stored `"EXPIRED"` is refused when a record is loaded.
//!
//! A record holds its document and content hash together. Any change to
//! the document body goes through [`CredentialRecord::update_document()`]
//! or [`CredentialRecord::sign()`], which recompute the hash in the same
//! call, and both are refused once the record has left DRAFT.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use acred_core::{ContentHash, CredentialId, Timestamp, TxHash};
use acred_crypto::PrivateKey;

use crate::credential::{CredentialDocument, VcError};

/// Stored lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum CredentialStatus {
    Draft,
    Issued,
    Revoked,
    /// Derived only.
    Expired,
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "DRAFT",
            Self::Issued => "ISSUED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

impl TryFrom<String> for CredentialStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ISSUED" => Ok(Self::Issued),
            "REVOKED" => Ok(Self::Revoked),
            "EXPIRED" => Err("EXPIRED is derived from the expiration date and cannot be stored".into()),
            other => Err(format!("unknown credential status {other:?}")),
        }
    }
}

/// An invalid lifecycle transition or a mutation outside DRAFT.
#[derive(Error, Debug)]
pub enum StatusTransitionError {
    #[error("cannot move credential {id} from {from} to {to}: {reason}")]
    Invalid {
        id: String,
        from: CredentialStatus,
        to: CredentialStatus,
        reason: String,
    },

    #[error(transparent)]
    Document(#[from] VcError),
}

/// A locally stored credential: document, hash, lifecycle and chain links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: CredentialId,
    document: CredentialDocument,
    content_hash: ContentHash,
    status: CredentialStatus,
    pub revocation_reason: Option<String>,
    pub issued_at: Option<Timestamp>,
    pub revoked_at: Option<Timestamp>,
    /// Hash of the anchoring transaction, once submitted.
    pub anchor_tx: Option<TxHash>,
    /// Hash of the revocation transaction, once submitted.
    pub revocation_tx: Option<TxHash>,
    pub created_at: Timestamp,
}

impl CredentialRecord {
    /// A new DRAFT record. The document `id` is set to the record id.
    pub fn draft(id: CredentialId, mut document: CredentialDocument) -> Result<Self, VcError> {
        document.id = Some(id.to_string());
        let content_hash = document.content_hash()?;
        Ok(Self {
            id,
            document,
            content_hash,
            status: CredentialStatus::Draft,
            revocation_reason: None,
            issued_at: None,
            revoked_at: None,
            anchor_tx: None,
            revocation_tx: None,
            created_at: Timestamp::now(),
        })
    }

    pub fn document(&self) -> &CredentialDocument {
        &self.document
    }

    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    /// The stored status, without expiry derivation.
    pub fn status(&self) -> CredentialStatus {
        self.status
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.document.is_expired_at(now)
    }

    /// ISSUED credentials past their expiration report EXPIRED.
    pub fn effective_status(&self, now: Timestamp) -> CredentialStatus {
        if self.status == CredentialStatus::Issued && self.is_expired(now) {
            CredentialStatus::Expired
        } else {
            self.status
        }
    }

    /// Replace the document body of a DRAFT and rehash it.
    pub fn update_document(&mut self, mut document: CredentialDocument) -> Result<ContentHash, StatusTransitionError> {
        self.require_draft("edit")?;
        document.id = Some(self.id.to_string());
        let hash = document.content_hash()?;
        self.document = document;
        self.content_hash = hash;
        Ok(hash)
    }

    /// Sign (or re-sign) a DRAFT with the issuer key and rehash it.
    pub fn sign(&mut self, key: &PrivateKey, created: Option<Timestamp>) -> Result<ContentHash, StatusTransitionError> {
        self.require_draft("sign")?;
        let mut document = self.document.clone();
        let hash = document.sign(key, created)?;
        self.document = document;
        self.content_hash = hash;
        Ok(hash)
    }

    /// DRAFT → ISSUED. The document must carry a proof.
    pub fn issue(&mut self) -> Result<(), StatusTransitionError> {
        if self.status != CredentialStatus::Draft {
            return Err(self.invalid(CredentialStatus::Issued, "only a draft can be issued"));
        }
        if self.document.proof.is_none() {
            return Err(self.invalid(CredentialStatus::Issued, "credential is not signed"));
        }
        self.status = CredentialStatus::Issued;
        self.issued_at = Some(Timestamp::now());
        Ok(())
    }

    /// ISSUED → REVOKED with a non-empty reason.
    pub fn revoke(&mut self, reason: &str) -> Result<(), StatusTransitionError> {
        if self.status != CredentialStatus::Issued {
            return Err(self.invalid(CredentialStatus::Revoked, "only an issued credential can be revoked"));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(self.invalid(CredentialStatus::Revoked, "a revocation reason is required"));
        }
        self.status = CredentialStatus::Revoked;
        self.revocation_reason = Some(reason.to_string());
        self.revoked_at = Some(Timestamp::now());
        Ok(())
    }

    fn require_draft(&self, action: &str) -> Result<(), StatusTransitionError> {
        if self.status == CredentialStatus::Draft {
            Ok(())
        } else {
            Err(self.invalid(self.status, &format!("cannot {action} a credential after issuance")))
        }
    }

    fn invalid(&self, to: CredentialStatus, reason: &str) -> StatusTransitionError {
        StatusTransitionError::Invalid {
            id: self.id.to_string(),
            from: self.status,
            to,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acred_core::Did;
    use serde_json::json;

    fn make_record(expires: Option<&str>) -> CredentialRecord {
        let doc = CredentialDocument::new(
            "ignored",
            "DegreeCredential",
            Did::new("did:authenticred:uni").unwrap(),
            &Did::new("did:authenticred:alice").unwrap(),
            json!({"degree": "BSc"}).as_object().cloned().unwrap(),
            Timestamp::parse("2026-01-10T00:00:00Z").unwrap(),
            expires.map(|e| Timestamp::parse(e).unwrap()),
        )
        .unwrap();
        CredentialRecord::draft(CredentialId::new("cred-42").unwrap(), doc).unwrap()
    }

    #[test]
    fn draft_takes_record_id() {
        let rec = make_record(None);
        assert_eq!(rec.document().id.as_deref(), Some("cred-42"));
        assert_eq!(rec.status(), CredentialStatus::Draft);
    }

    #[test]
    fn full_lifecycle() {
        let key = PrivateKey::generate();
        let mut rec = make_record(None);
        rec.sign(&key, None).unwrap();
        rec.issue().unwrap();
        assert_eq!(rec.status(), CredentialStatus::Issued);
        assert!(rec.issued_at.is_some());
        rec.revoke("degree rescinded").unwrap();
        assert_eq!(rec.status(), CredentialStatus::Revoked);
        assert_eq!(rec.revocation_reason.as_deref(), Some("degree rescinded"));
    }

    #[test]
    fn unsigned_draft_cannot_issue() {
        let mut rec = make_record(None);
        assert!(matches!(rec.issue(), Err(StatusTransitionError::Invalid { .. })));
    }

    #[test]
    fn revoke_requires_reason_and_issued() {
        let key = PrivateKey::generate();
        let mut rec = make_record(None);
        assert!(rec.revoke("x").is_err());
        rec.sign(&key, None).unwrap();
        rec.issue().unwrap();
        assert!(rec.revoke("   ").is_err());
        assert_eq!(rec.status(), CredentialStatus::Issued);
    }

    #[test]
    fn revoked_cannot_be_reissued_or_revoked_again() {
        let key = PrivateKey::generate();
        let mut rec = make_record(None);
        rec.sign(&key, None).unwrap();
        rec.issue().unwrap();
        rec.revoke("fraud").unwrap();
        assert!(rec.issue().is_err());
        assert!(rec.revoke("again").is_err());
    }

    #[test]
    fn resign_recomputes_hash() {
        let key = PrivateKey::generate();
        let mut rec = make_record(None);
        let first = rec.sign(&key, None).unwrap();
        let mut doc = rec.document().clone();
        doc.credential_subject.insert("degree".into(), json!("MSc"));
        let edited = rec.update_document(doc).unwrap();
        assert_ne!(first, edited);
        let second = rec.sign(&key, None).unwrap();
        assert_eq!(second, edited);
        assert_eq!(rec.content_hash(), rec.document().content_hash().unwrap());
    }

    #[test]
    fn issued_document_is_frozen() {
        let key = PrivateKey::generate();
        let mut rec = make_record(None);
        rec.sign(&key, None).unwrap();
        rec.issue().unwrap();
        let doc = rec.document().clone();
        assert!(rec.update_document(doc).is_err());
        assert!(rec.sign(&key, None).is_err());
    }

    #[test]
    fn expiry_is_derived() {
        let key = PrivateKey::generate();
        let mut rec = make_record(Some("2027-01-01T00:00:00Z"));
        rec.sign(&key, None).unwrap();
        rec.issue().unwrap();
        let before = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        let after = Timestamp::parse("2027-06-01T00:00:00Z").unwrap();
        assert_eq!(rec.effective_status(before), CredentialStatus::Issued);
        assert_eq!(rec.effective_status(after), CredentialStatus::Expired);
        assert_eq!(rec.status(), CredentialStatus::Issued);
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(serde_json::to_value(CredentialStatus::Issued).unwrap(), "ISSUED");
        assert_eq!(CredentialStatus::Revoked.to_string(), "REVOKED");
    }

    #[test]
    fn stored_status_cannot_be_expired() {
        let issued: CredentialStatus = serde_json::from_value(json!("ISSUED")).unwrap();
        assert_eq!(issued, CredentialStatus::Issued);
        assert!(serde_json::from_value::<CredentialStatus>(json!("EXPIRED")).is_err());
        assert!(serde_json::from_value::<CredentialStatus>(json!("issued")).is_err());

        let mut stored = serde_json::to_value(make_record(None)).unwrap();
        assert_eq!(stored["status"], "DRAFT");
        assert!(serde_json::from_value::<CredentialRecord>(stored.clone()).is_ok());
        stored["status"] = json!("EXPIRED");
        assert!(serde_json::from_value::<CredentialRecord>(stored).is_err());
    }
}

//! # Verification Engine
//!
//! A content hash that resolves to a locally stored credential takes the
//! internal path and gets every check. Any other hash takes the external
//! path, where anchoring alone decides the verdict. When the caller
//! submitted the whole document, the external path still reports its
//! signature, issuer trust, on-chain revocation and expiry, but
//! issuance stays indeterminate and chain errors leave trust and
//! revocation indeterminate.
//!
//! Stages never abort each other. A chain read that fails degrades to
//! `false` or [`CheckOutcome::Indeterminate`], with local fallbacks for
//! trust and revocation. If the internal path itself fails unexpectedly
//! the request is answered on the external path.

use serde::Serialize;
use uuid::Uuid;

use acred_core::{ContentHash, CredentialId, Did, Timestamp};
use acred_crypto::PublicKey;
use acred_ledger::{
    BlockchainService, CheckOutcome, LedgerStore, VerificationChecks, VerificationPath, VerificationRecord,
};
use acred_vc::{CredentialDocument, CredentialRecord, CredentialStatus, VcError};

use crate::input::VerificationInput;
use crate::policy::{overall_valid, REVOCATION_POLICY};

/// Itemized verdict returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub content_hash: ContentHash,
    pub credential_id: Option<CredentialId>,
    pub path: VerificationPath,
    pub checks: VerificationChecks,
    pub overall_valid: bool,
    /// Id of the persisted audit record, when a requester was given.
    pub record_id: Option<Uuid>,
    pub verified_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct Verifier {
    service: BlockchainService,
}

impl Verifier {
    pub fn new(service: BlockchainService) -> Self {
        Self { service }
    }

    fn ledger(&self) -> &dyn LedgerStore {
        self.service.ledger().as_ref()
    }

    pub async fn verify(&self, input: &VerificationInput, requester: Option<&str>) -> VerificationReport {
        self.verify_at(input, requester, Timestamp::now()).await
    }

    /// Verify as of `now`. Persists a [`VerificationRecord`] when
    /// `requester` is set.
    pub async fn verify_at(&self, input: &VerificationInput, requester: Option<&str>, now: Timestamp) -> VerificationReport {
        let hash = input.content_hash();
        let local = self.ledger().find_credential_by_hash(&hash);

        let (path, credential_id, checks) = match local {
            Some(record) => match self.internal_checks(&record, now).await {
                Ok(checks) => (VerificationPath::Internal, Some(record.id.clone()), checks),
                Err(e) => {
                    tracing::warn!(content_hash = %hash, error = %e, "internal verification failed, using external path");
                    (VerificationPath::External, None, self.external_checks(input, now).await)
                }
            },
            None => (VerificationPath::External, None, self.external_checks(input, now).await),
        };

        let overall = overall_valid(path, &checks, REVOCATION_POLICY);
        let record_id = requester.map(|who| {
            let record = VerificationRecord {
                id: Uuid::new_v4(),
                requester: who.to_string(),
                content_hash: hash,
                credential_id: credential_id.clone(),
                path,
                checks,
                overall_valid: overall,
                verified_at: now,
            };
            let id = record.id;
            self.ledger().append_verification(record);
            id
        });

        tracing::info!(
            content_hash = %hash,
            path = ?path,
            overall_valid = overall,
            requester = requester.unwrap_or("-"),
            "credential verified"
        );
        VerificationReport {
            content_hash: hash,
            credential_id,
            path,
            checks,
            overall_valid: overall,
            record_id,
            verified_at: now,
        }
    }

    async fn external_checks(&self, input: &VerificationInput, now: Timestamp) -> VerificationChecks {
        let anchored = self.anchored(&input.content_hash()).await;
        let VerificationInput::Document { document, .. } = input else {
            return VerificationChecks {
                signature_valid: false,
                anchored,
                issuer_trusted: CheckOutcome::Indeterminate,
                revoked: CheckOutcome::Indeterminate,
                expired: false,
                issued: CheckOutcome::Indeterminate,
            };
        };

        let issuer = &document.issuer;
        let issuer_trusted = match self.service.is_issuer_trusted(issuer).await {
            Ok(trusted) => trusted.into(),
            Err(e) => {
                tracing::warn!(issuer = %issuer, error = %e, "trust check failed for submitted credential");
                CheckOutcome::Indeterminate
            }
        };
        let revoked = match document.id.as_deref().map(CredentialId::new) {
            Some(Ok(id)) => match self.service.is_revoked(&id).await {
                Ok(revoked) => revoked.into(),
                Err(e) => {
                    tracing::warn!(credential_id = %id, error = %e, "revocation check failed for submitted credential");
                    CheckOutcome::Indeterminate
                }
            },
            _ => CheckOutcome::Indeterminate,
        };

        VerificationChecks {
            signature_valid: self.signature_valid(document).await,
            anchored,
            issuer_trusted,
            revoked,
            expired: document.is_expired_at(now),
            issued: CheckOutcome::Indeterminate,
        }
    }

    async fn internal_checks(&self, record: &CredentialRecord, now: Timestamp) -> Result<VerificationChecks, VcError> {
        let document = record.document();
        // The stored hash is what was anchored; a document that no longer
        // produces it cannot be checked locally.
        if document.content_hash()? != record.content_hash() {
            return Err(VcError::Malformed("stored document does not match its content hash".into()));
        }
        let issuer = &document.issuer;

        Ok(VerificationChecks {
            signature_valid: self.signature_valid(document).await,
            anchored: self.anchored(&record.content_hash()).await,
            issuer_trusted: self.issuer_trusted(issuer).await,
            revoked: self.revoked(record).await,
            expired: record.is_expired(now),
            issued: CheckOutcome::from(record.status() == CredentialStatus::Issued),
        })
    }

    async fn signature_valid(&self, document: &CredentialDocument) -> bool {
        match self.issuer_key(&document.issuer).await {
            Some(key) => document.verify_signature(&key),
            None => {
                tracing::debug!(issuer = %document.issuer, "no public key for issuer");
                false
            }
        }
    }

    /// Local registration first, then the on-chain DID registry.
    async fn issuer_key(&self, issuer: &Did) -> Option<PublicKey> {
        if let Some(key) = self
            .ledger()
            .get_registration(issuer)
            .and_then(|r| PublicKey::parse(&r.public_key).ok())
        {
            return Some(key);
        }
        match self.service.resolve_did(issuer).await {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(issuer = %issuer, error = %e, "issuer key lookup failed");
                None
            }
        }
    }

    async fn anchored(&self, hash: &ContentHash) -> bool {
        self.service.is_anchored(hash).await.unwrap_or_else(|e| {
            tracing::warn!(content_hash = %hash, error = %e, "anchoring check failed");
            false
        })
    }

    async fn issuer_trusted(&self, issuer: &Did) -> CheckOutcome {
        match self.service.is_issuer_trusted(issuer).await {
            Ok(trusted) => trusted.into(),
            Err(e) => {
                // Weak fallback: any issuer this ledger has registered.
                let known = self.ledger().get_registration(issuer).is_some();
                tracing::warn!(issuer = %issuer, error = %e, fallback = known, "trust check failed");
                known.into()
            }
        }
    }

    async fn revoked(&self, record: &CredentialRecord) -> CheckOutcome {
        match self.service.is_revoked(&record.id).await {
            Ok(revoked) => revoked.into(),
            Err(e) => {
                let local = record.status() == CredentialStatus::Revoked;
                tracing::warn!(credential_id = %record.id, error = %e, fallback = local, "revocation check failed");
                local.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use acred_chain::InMemoryChain;
    use acred_crypto::PrivateKey;
    use acred_ledger::{MemoryLedger, TrustRegistration};
    use serde_json::json;

    struct Fixture {
        verifier: Verifier,
        service: BlockchainService,
        chain: Arc<InMemoryChain>,
        ledger: Arc<MemoryLedger>,
        issuer: Did,
        issuer_key: PrivateKey,
    }

    fn fixture() -> Fixture {
        let chain = Arc::new(InMemoryChain::new());
        let ledger = Arc::new(MemoryLedger::new());
        let service = BlockchainService::new(chain.clone(), ledger.clone(), PrivateKey::generate());
        Fixture {
            verifier: Verifier::new(service.clone()),
            service,
            chain,
            ledger,
            issuer: Did::generate(),
            issuer_key: PrivateKey::generate(),
        }
    }

    /// Store an ISSUED, anchored credential from a trusted, registered issuer.
    async fn issued(f: &Fixture, expiration: Option<Timestamp>) -> CredentialRecord {
        let doc = CredentialDocument::new(
            "",
            "DegreeCredential",
            f.issuer.clone(),
            &Did::generate(),
            json!({"degree": "BSc"}).as_object().cloned().unwrap(),
            Timestamp::parse("2024-01-01T00:00:00Z").unwrap(),
            expiration,
        )
        .unwrap();
        let mut record = CredentialRecord::draft(CredentialId::generate(), doc).unwrap();
        record.sign(&f.issuer_key, None).unwrap();
        record.issue().unwrap();
        f.ledger.insert_credential(record.clone()).unwrap();
        f.ledger.upsert_registration(TrustRegistration::new(
            f.issuer.clone(),
            f.issuer_key.public_key().to_hex(),
            true,
        ));
        f.service.update_issuer_trust(&f.issuer, true).await.unwrap();
        f.service.anchor_credential(&record.content_hash()).await.unwrap();
        record
    }

    #[tokio::test]
    async fn internal_credential_passes_every_check() {
        let f = fixture();
        let record = issued(&f, None).await;
        let report = f.verifier.verify(&record.content_hash().into(), Some("alice")).await;

        assert_eq!(report.path, VerificationPath::Internal);
        assert_eq!(report.credential_id, Some(record.id.clone()));
        assert!(report.checks.signature_valid);
        assert!(report.checks.anchored);
        assert_eq!(report.checks.issuer_trusted, CheckOutcome::Yes);
        assert_eq!(report.checks.revoked, CheckOutcome::No);
        assert_eq!(report.checks.issued, CheckOutcome::Yes);
        assert!(report.overall_valid);

        let records = f.ledger.list_verifications();
        assert_eq!(records.len(), 1);
        assert_eq!(Some(records[0].id), report.record_id);
        assert_eq!(records[0].requester, "alice");
    }

    #[tokio::test]
    async fn anonymous_verification_is_not_recorded() {
        let f = fixture();
        let record = issued(&f, None).await;
        let report = f.verifier.verify(&record.content_hash().into(), None).await;
        assert!(report.record_id.is_none());
        assert!(f.ledger.list_verifications().is_empty());
    }

    #[tokio::test]
    async fn unknown_hash_degrades_to_anchoring() {
        let f = fixture();
        let anchored = ContentHash::from_bytes([7; 32]);
        f.service.anchor_credential(&anchored).await.unwrap();

        let report = f.verifier.verify(&anchored.into(), Some("bob")).await;
        assert_eq!(report.path, VerificationPath::External);
        assert_eq!(report.checks.issued, CheckOutcome::Indeterminate);
        assert_eq!(report.checks.revoked, CheckOutcome::Indeterminate);
        assert!(report.overall_valid);

        let report = f.verifier.verify(&ContentHash::from_bytes([8; 32]).into(), None).await;
        assert!(!report.overall_valid);
        assert_eq!(report.overall_valid, report.checks.anchored);
    }

    #[tokio::test]
    async fn expired_credential_is_invalid() {
        let f = fixture();
        let expiry = Timestamp::parse("2025-01-01T00:00:00Z").unwrap();
        let record = issued(&f, Some(expiry)).await;
        let before = f
            .verifier
            .verify_at(&record.content_hash().into(), None, Timestamp::parse("2024-06-01T00:00:00Z").unwrap())
            .await;
        assert!(before.overall_valid);
        let after = f
            .verifier
            .verify_at(&record.content_hash().into(), None, Timestamp::parse("2025-06-01T00:00:00Z").unwrap())
            .await;
        assert!(after.checks.expired);
        assert!(!after.overall_valid);
    }

    #[tokio::test]
    async fn chain_outage_uses_local_fallbacks() {
        let f = fixture();
        let record = issued(&f, None).await;
        f.chain.set_offline(true);

        let report = f.verifier.verify(&record.content_hash().into(), None).await;
        assert_eq!(report.path, VerificationPath::Internal);
        assert!(report.checks.signature_valid, "key comes from the local registration");
        assert!(!report.checks.anchored);
        assert_eq!(report.checks.issuer_trusted, CheckOutcome::Yes);
        assert_eq!(report.checks.revoked, CheckOutcome::No);
        assert!(!report.overall_valid);
    }

    #[tokio::test]
    async fn issuer_key_resolved_on_chain() {
        let f = fixture();
        let record = issued(&f, None).await;
        f.ledger.reset();
        f.service
            .register_did(&f.issuer, &f.issuer_key.public_key())
            .await
            .unwrap();
        let report = f.verifier.verify(&record.content_hash().into(), None).await;
        assert!(report.checks.signature_valid);
    }

    #[tokio::test]
    async fn missing_issuer_key_fails_signature() {
        let f = fixture();
        let record = issued(&f, None).await;
        f.ledger.reset();
        let report = f.verifier.verify(&record.content_hash().into(), None).await;
        assert_eq!(report.path, VerificationPath::Internal);
        assert!(!report.checks.signature_valid);
        assert!(!report.overall_valid);
    }

    fn submitted(f: &Fixture) -> VerificationInput {
        let mut doc = CredentialDocument::new(
            "cred-elsewhere",
            "DegreeCredential",
            f.issuer.clone(),
            &Did::generate(),
            json!({"degree": "MSc"}).as_object().cloned().unwrap(),
            Timestamp::parse("2024-01-01T00:00:00Z").unwrap(),
            Some(Timestamp::parse("2025-01-01T00:00:00Z").unwrap()),
        )
        .unwrap();
        doc.sign(&f.issuer_key, None).unwrap();
        VerificationInput::from_document(doc).unwrap()
    }

    #[tokio::test]
    async fn submitted_document_is_checked_on_external_path() {
        let f = fixture();
        f.service
            .register_did(&f.issuer, &f.issuer_key.public_key())
            .await
            .unwrap();
        f.service.update_issuer_trust(&f.issuer, true).await.unwrap();
        let input = submitted(&f);
        let mid_2024 = Timestamp::parse("2024-06-01T00:00:00Z").unwrap();

        let report = f.verifier.verify_at(&input, None, mid_2024).await;
        assert_eq!(report.path, VerificationPath::External);
        assert!(report.credential_id.is_none());
        assert!(report.checks.signature_valid, "key resolved from the DID registry");
        assert_eq!(report.checks.issuer_trusted, CheckOutcome::Yes);
        assert_eq!(report.checks.revoked, CheckOutcome::No);
        assert_eq!(report.checks.issued, CheckOutcome::Indeterminate);
        assert!(!report.checks.expired);
        assert!(!report.checks.anchored);
        assert!(!report.overall_valid);

        f.service.anchor_credential(&input.content_hash()).await.unwrap();
        let report = f.verifier.verify_at(&input, None, mid_2024).await;
        assert!(report.overall_valid);

        let mid_2025 = Timestamp::parse("2025-06-01T00:00:00Z").unwrap();
        let report = f.verifier.verify_at(&input, None, mid_2025).await;
        assert!(report.checks.expired);
        assert_eq!(report.overall_valid, report.checks.anchored);
    }

    #[tokio::test]
    async fn submitted_document_during_outage_has_no_trust_fallback() {
        let f = fixture();
        f.ledger.upsert_registration(TrustRegistration::new(
            f.issuer.clone(),
            f.issuer_key.public_key().to_hex(),
            true,
        ));
        let input = submitted(&f);
        f.chain.set_offline(true);

        let report = f.verifier.verify(&input, None).await;
        assert_eq!(report.path, VerificationPath::External);
        assert!(report.checks.signature_valid, "key comes from the local registration");
        assert_eq!(report.checks.issuer_trusted, CheckOutcome::Indeterminate);
        assert_eq!(report.checks.revoked, CheckOutcome::Indeterminate);
        assert!(!report.checks.anchored);
        assert!(!report.overall_valid);
    }

    #[tokio::test]
    async fn forged_submitted_document_fails_signature() {
        let f = fixture();
        f.service
            .register_did(&f.issuer, &PrivateKey::generate().public_key())
            .await
            .unwrap();
        let report = f.verifier.verify(&submitted(&f), None).await;
        assert!(!report.checks.signature_valid);
    }
}

//! # Issuer Workflows
//!
//! Local state changes first, chain writes second:
//!
//! - issuance: sign the DRAFT, move it to ISSUED, then dispatch anchoring;
//! - revocation: move ISSUED to REVOKED, then dispatch the registry write;
//! - issuer registration: store a [`TrustRegistration`], then dispatch the
//!   DID registration. The trust flag follows from the trust sweep once the
//!   registration transaction confirms.

use serde::Serialize;

use acred_chain::TxHash;
use acred_core::{ContentHash, CredentialId, Did};
use acred_crypto::{PrivateKey, PublicKey};
use acred_ledger::{BlockchainService, LedgerStore, StoreError, TrustRegistration};
use acred_vc::CredentialRecord;

use crate::error::TaskError;
use crate::runner::{FallbackRunner, Submission};
use crate::task::ChainTask;

#[derive(Debug, Clone, Serialize)]
pub struct Issuance {
    pub credential_id: CredentialId,
    pub content_hash: ContentHash,
    pub submission: Submission,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkRegistration {
    pub submitted: Vec<Did>,
    /// Already registered on-chain.
    pub skipped: Vec<Did>,
    pub failed: Vec<(Did, String)>,
}

#[derive(Debug, Clone)]
pub struct CredentialWorkflow {
    service: BlockchainService,
    runner: FallbackRunner,
}

impl CredentialWorkflow {
    pub fn new(service: BlockchainService, runner: FallbackRunner) -> Self {
        Self { service, runner }
    }

    fn ledger(&self) -> &dyn LedgerStore {
        self.service.ledger().as_ref()
    }

    /// Store a new DRAFT record.
    pub fn store_draft(&self, record: CredentialRecord) -> Result<CredentialId, TaskError> {
        let id = record.id.clone();
        self.ledger().insert_credential(record)?;
        Ok(id)
    }

    /// Sign and issue a stored DRAFT, then anchor its content hash.
    pub async fn issue(&self, id: &CredentialId, issuer_key: &PrivateKey) -> Result<Issuance, TaskError> {
        let record = self.ledger().update_credential(id, &mut |r| {
            r.sign(issuer_key, None)?;
            r.issue()
        })?;
        let content_hash = record.content_hash();
        tracing::info!(credential_id = %id, content_hash = %content_hash, "credential issued");

        let submission = self
            .runner
            .submit(ChainTask::AnchorCredential {
                credential_id: Some(id.clone()),
                hash: content_hash,
            })
            .await?;
        Ok(Issuance {
            credential_id: id.clone(),
            content_hash,
            submission,
        })
    }

    /// Revoke locally, then publish the revocation.
    pub async fn revoke(&self, id: &CredentialId, reason: &str) -> Result<Submission, TaskError> {
        self.ledger().update_credential(id, &mut |r| r.revoke(reason))?;
        tracing::info!(credential_id = %id, reason, "credential revoked");
        self.runner
            .submit(ChainTask::RevokeCredential {
                credential_id: id.clone(),
            })
            .await
    }

    /// Record the issuer and dispatch its DID registration.
    pub async fn register_issuer(&self, did: &Did, public_key: &PublicKey, trusted: bool) -> Result<Submission, TaskError> {
        self.ledger()
            .upsert_registration(TrustRegistration::new(did.clone(), public_key.to_hex(), trusted));
        self.runner
            .submit(ChainTask::RegisterDid {
                did: did.clone(),
                public_key: public_key.clone(),
            })
            .await
    }

    /// Register every issuer not yet known to the DID registry.
    ///
    /// A failure for one issuer does not stop the others.
    pub async fn register_issuers(&self, issuers: &[(Did, PublicKey, bool)]) -> BulkRegistration {
        let mut report = BulkRegistration::default();
        for (did, key, trusted) in issuers {
            match self.service.is_did_registered(did).await {
                Ok(true) => {
                    tracing::info!(did = %did, "DID already registered, skipping");
                    report.skipped.push(did.clone());
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    report.failed.push((did.clone(), e.to_string()));
                    continue;
                }
            }
            match self.register_issuer(did, key, *trusted).await {
                Ok(_) => report.submitted.push(did.clone()),
                Err(e) => report.failed.push((did.clone(), e.to_string())),
            }
        }
        report
    }

    /// Set an issuer's trust flag on-chain now and mirror it locally.
    pub async fn approve_issuer(&self, did: &Did, trusted: bool) -> Result<TxHash, TaskError> {
        let tx_hash = self.service.update_issuer_trust(did, trusted).await?;
        let updated = self.ledger().update_registration(did, &mut |r| {
            r.trusted = trusted;
            r.trust_updated = true;
            r.trust_tx = Some(tx_hash.clone());
        });
        match updated {
            Ok(_) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(did = %did, trusted, tx_hash = %tx_hash, "issuer trust set");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use acred_chain::InMemoryChain;
    use acred_core::Timestamp;
    use acred_ledger::{ExecutionMode, MemoryLedger, RegistrationStatus};
    use acred_vc::{CredentialDocument, CredentialStatus};
    use serde_json::json;

    use crate::executor::TaskExecutor;
    use crate::retry::RetryPolicy;

    struct Fixture {
        workflow: CredentialWorkflow,
        service: BlockchainService,
        ledger: Arc<MemoryLedger>,
        issuer: Did,
        issuer_key: PrivateKey,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MemoryLedger::new());
        let service = BlockchainService::new(Arc::new(InMemoryChain::new()), ledger.clone(), PrivateKey::generate());
        let executor = TaskExecutor::new(service.clone(), RetryPolicy::default());
        Fixture {
            workflow: CredentialWorkflow::new(service.clone(), FallbackRunner::direct(executor)),
            service,
            ledger,
            issuer: Did::generate(),
            issuer_key: PrivateKey::generate(),
        }
    }

    fn draft(f: &Fixture) -> CredentialRecord {
        let doc = CredentialDocument::new(
            "",
            "DegreeCredential",
            f.issuer.clone(),
            &Did::generate(),
            json!({"degree": "BSc"}).as_object().cloned().unwrap(),
            Timestamp::now(),
            None,
        )
        .unwrap();
        CredentialRecord::draft(CredentialId::generate(), doc).unwrap()
    }

    #[tokio::test]
    async fn issue_signs_stores_and_anchors() {
        let f = fixture();
        let id = f.workflow.store_draft(draft(&f)).unwrap();
        let issuance = f.workflow.issue(&id, &f.issuer_key).await.unwrap();

        assert_eq!(issuance.submission.mode, ExecutionMode::Direct);
        let record = f.ledger.get_credential(&id).unwrap();
        assert_eq!(record.status(), CredentialStatus::Issued);
        assert_eq!(record.content_hash(), issuance.content_hash);
        assert!(record.document().verify_signature(&f.issuer_key.public_key()));
        assert_eq!(record.anchor_tx, issuance.submission.tx_hash);
        assert!(f.service.is_anchored(&issuance.content_hash).await.unwrap());
    }

    #[tokio::test]
    async fn issuing_twice_is_rejected() {
        let f = fixture();
        let id = f.workflow.store_draft(draft(&f)).unwrap();
        f.workflow.issue(&id, &f.issuer_key).await.unwrap();
        assert!(f.workflow.issue(&id, &f.issuer_key).await.is_err());
    }

    #[tokio::test]
    async fn revoke_requires_reason_and_issued_status() {
        let f = fixture();
        let id = f.workflow.store_draft(draft(&f)).unwrap();
        assert!(f.workflow.revoke(&id, "fraud").await.is_err());

        f.workflow.issue(&id, &f.issuer_key).await.unwrap();
        assert!(f.workflow.revoke(&id, "  ").await.is_err());
        f.workflow.revoke(&id, "degree rescinded").await.unwrap();

        let record = f.ledger.get_credential(&id).unwrap();
        assert_eq!(record.status(), CredentialStatus::Revoked);
        assert!(record.revocation_tx.is_some());
        assert!(f.service.is_revoked(&id).await.unwrap());
    }

    #[tokio::test]
    async fn bulk_registration_skips_known_dids() {
        let f = fixture();
        let known = Did::generate();
        let key = PrivateKey::generate().public_key();
        f.service.register_did(&known, &key).await.unwrap();

        let fresh = Did::generate();
        let report = f
            .workflow
            .register_issuers(&[(known.clone(), key.clone(), true), (fresh.clone(), key, true)])
            .await;
        assert_eq!(report.skipped, vec![known]);
        assert_eq!(report.submitted, vec![fresh.clone()]);
        assert_eq!(
            f.ledger.get_registration(&fresh).unwrap().status,
            RegistrationStatus::Submitted
        );
    }

    #[tokio::test]
    async fn approve_sets_trust_on_chain_and_locally() {
        let f = fixture();
        let key = PrivateKey::generate().public_key();
        f.workflow.register_issuer(&f.issuer, &key, false).await.unwrap();
        f.workflow.approve_issuer(&f.issuer, true).await.unwrap();
        assert!(f.service.is_issuer_trusted(&f.issuer).await.unwrap());
        let registration = f.ledger.get_registration(&f.issuer).unwrap();
        assert!(registration.trusted);
        assert!(registration.trust_updated);
    }
}

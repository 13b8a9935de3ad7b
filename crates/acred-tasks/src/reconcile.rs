//! # Reconciliation Sweeps
//!
//! - [`Reconciler::sweep_pending_transactions()`] polls the receipt of each
//!   PENDING transaction. A successful receipt moves it to CONFIRMED with
//!   its block number, a failed receipt moves it to FAILED, and no receipt
//!   (or a read error) leaves it PENDING for the next sweep.
//! - [`Reconciler::sweep_trust_updates()`] pushes the trust flag of every
//!   registration whose registration transaction is CONFIRMED and whose
//!   flag has not been pushed yet.
//!
//! Both sweeps are idempotent. Row updates are conditional, so a sweep
//! overlapping a previous one cannot move a row twice.

use serde::Serialize;

use acred_chain::TxHash;
use acred_ledger::{BlockchainService, LedgerStore, RegistrationStatus, TxStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub confirmed: usize,
    pub failed: usize,
    pub still_pending: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrustSweepReport {
    pub updated: usize,
    pub waiting: usize,
    pub errors: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    service: BlockchainService,
}

impl Reconciler {
    pub fn new(service: BlockchainService) -> Self {
        Self { service }
    }

    fn ledger(&self) -> &dyn LedgerStore {
        self.service.ledger().as_ref()
    }

    pub async fn sweep_pending_transactions(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for tx in self.ledger().pending_transactions() {
            let receipt = match self.service.transaction_receipt(&tx.tx_hash).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(tx_hash = %tx.tx_hash, error = %e, "receipt lookup failed");
                    report.errors += 1;
                    continue;
                }
            };
            let next = match receipt {
                Some(r) if r.is_failure() => Some((TxStatus::Failed, r.block_number)),
                Some(r) if r.block_number.is_some() => Some((TxStatus::Confirmed, r.block_number)),
                _ => None,
            };
            let Some((status, block)) = next else {
                report.still_pending += 1;
                continue;
            };
            match self.ledger().resolve_transaction(&tx.tx_hash, status, block) {
                Ok(true) => {
                    tracing::info!(
                        tx_hash = %tx.tx_hash,
                        kind = tx.kind.as_str(),
                        status = %status,
                        block_number = ?block,
                        "transaction resolved"
                    );
                    match status {
                        TxStatus::Failed => report.failed += 1,
                        _ => report.confirmed += 1,
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(tx_hash = %tx.tx_hash, error = %e, "could not resolve transaction");
                    report.errors += 1;
                }
            }
        }
        tracing::debug!(?report, "pending transaction sweep finished");
        report
    }

    pub async fn sweep_trust_updates(&self) -> TrustSweepReport {
        let mut report = TrustSweepReport::default();
        let candidates = self
            .ledger()
            .list_registrations()
            .into_iter()
            .filter(|r| r.status == RegistrationStatus::Submitted && !r.trust_updated);

        for registration in candidates {
            if !self.is_confirmed(registration.registration_tx.as_ref()) {
                report.waiting += 1;
                continue;
            }
            let tx_hash = match self
                .service
                .update_issuer_trust(&registration.did, registration.trusted)
                .await
            {
                Ok(tx) => tx,
                Err(e) => {
                    tracing::warn!(did = %registration.did, error = %e, "trust update failed");
                    report.errors += 1;
                    continue;
                }
            };
            let marked = self.ledger().update_registration(&registration.did, &mut |r| {
                r.trust_updated = true;
                r.trust_tx = Some(tx_hash.clone());
            });
            match marked {
                Ok(_) => {
                    tracing::info!(
                        did = %registration.did,
                        trusted = registration.trusted,
                        tx_hash = %tx_hash,
                        "issuer trust pushed"
                    );
                    report.updated += 1;
                }
                Err(e) => {
                    tracing::warn!(did = %registration.did, error = %e, "could not mark trust update");
                    report.errors += 1;
                }
            }
        }
        report
    }

    fn is_confirmed(&self, tx_hash: Option<&TxHash>) -> bool {
        tx_hash
            .and_then(|h| self.ledger().get_transaction(h))
            .is_some_and(|tx| tx.status == TxStatus::Confirmed)
    }
}

//! Runs one [`ChainTask`] under the retry policy and records the outcome.

use uuid::Uuid;

use acred_chain::TxHash;
use acred_ledger::{
    BlockchainError, BlockchainService, ExecutionMode, LedgerStore, RegistrationStatus, StoreError, TaskRecord, TaskStatus,
};

use crate::error::{TaskError, TaskExhaustedError};
use crate::retry::RetryPolicy;
use crate::task::ChainTask;

/// Shared task body for every runner backend.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    service: BlockchainService,
    policy: RetryPolicy,
}

impl TaskExecutor {
    pub fn new(service: BlockchainService, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    pub fn service(&self) -> &BlockchainService {
        &self.service
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn ledger(&self) -> &dyn LedgerStore {
        self.service.ledger().as_ref()
    }

    /// Execute `task`, updating the task record identified by `task_id`.
    ///
    /// A write the node accepted is never resubmitted, even if recording
    /// it locally failed.
    ///
    /// On exhaustion the task record (and, for DID registration, the trust
    /// registration) is marked FAILED and the error is returned.
    pub async fn execute(&self, task_id: Uuid, task: &ChainTask, mode: ExecutionMode) -> Result<TxHash, TaskError> {
        let kind = task.kind();
        self.mark(task_id, |t| {
            t.status = TaskStatus::Running;
            t.mode = Some(mode);
        });

        let operation = kind.to_string();
        let this = self;
        let outcome = self
            .policy
            .run_while(&operation, BlockchainError::is_retryable, move |attempt| {
                this.mark(task_id, |t| t.attempts = attempt);
                task.run(&this.service)
            })
            .await;

        match outcome {
            Ok(tx_hash) => {
                self.link(task, &tx_hash);
                self.mark(task_id, |t| {
                    t.status = TaskStatus::Succeeded;
                    t.tx_hash = Some(tx_hash.clone());
                    t.last_error = None;
                });
                tracing::info!(task_id = %task_id, kind = %kind, mode = %mode, tx_hash = %tx_hash, "task succeeded");
                Ok(tx_hash)
            }
            Err(exhausted) => {
                let message = exhausted.last_error.to_string();
                tracing::error!(
                    task_id = %task_id,
                    kind = %kind,
                    attempts = exhausted.attempts,
                    error = %message,
                    "task failed"
                );
                let submitted = exhausted.last_error.submitted_tx().cloned();
                self.mark(task_id, |t| {
                    t.status = TaskStatus::Failed;
                    t.last_error = Some(message.clone());
                    if submitted.is_some() {
                        t.tx_hash = submitted.clone();
                    }
                });
                if let ChainTask::RegisterDid { did, .. } = task {
                    let result = self.ledger().update_registration(did, &mut |r| {
                        r.status = RegistrationStatus::Failed;
                        r.last_error = Some(message.clone());
                    });
                    ignore_missing(result, "registration");
                }
                Err(TaskExhaustedError {
                    kind,
                    subject: task.subject(),
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error,
                }
                .into())
            }
        }
    }

    /// Attach the transaction to the local record the task was about.
    fn link(&self, task: &ChainTask, tx_hash: &TxHash) {
        match task {
            ChainTask::RegisterDid { did, .. } => {
                let result = self.ledger().update_registration(did, &mut |r| {
                    r.status = RegistrationStatus::Submitted;
                    r.registration_tx = Some(tx_hash.clone());
                    r.last_error = None;
                });
                ignore_missing(result, "registration");
            }
            ChainTask::AnchorCredential {
                credential_id: Some(id),
                ..
            } => {
                let result = self.ledger().update_credential(id, &mut |r| {
                    r.anchor_tx = Some(tx_hash.clone());
                    Ok(())
                });
                ignore_missing(result, "credential");
            }
            ChainTask::AnchorCredential { credential_id: None, .. } => {}
            ChainTask::RevokeCredential { credential_id } => {
                let result = self.ledger().update_credential(credential_id, &mut |r| {
                    r.revocation_tx = Some(tx_hash.clone());
                    Ok(())
                });
                ignore_missing(result, "credential");
            }
        }
    }

    fn mark(&self, task_id: Uuid, mut f: impl FnMut(&mut TaskRecord)) {
        ignore_missing(self.ledger().update_task(&task_id, &mut f), "task");
    }
}

fn ignore_missing<T>(result: Result<T, StoreError>, entity: &'static str) {
    match result {
        Ok(_) | Err(StoreError::NotFound { .. }) => {}
        Err(e) => tracing::warn!(entity, error = %e, "could not update local record"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use acred_chain::InMemoryChain;
    use acred_core::{ContentHash, Did};
    use acred_crypto::PrivateKey;
    use acred_ledger::{MemoryLedger, TrustRegistration, TxStatus};

    fn executor(chain: Arc<InMemoryChain>) -> (TaskExecutor, Arc<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let service = BlockchainService::new(chain, ledger.clone(), PrivateKey::generate());
        (TaskExecutor::new(service, RetryPolicy::default()), ledger)
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_then_success() {
        let chain = Arc::new(InMemoryChain::new());
        let (exec, ledger) = executor(chain.clone());
        let task = ChainTask::AnchorCredential {
            credential_id: None,
            hash: ContentHash::from_bytes([4; 32]),
        };
        let record = TaskRecord::queued(task.kind(), task.arguments());
        let id = record.id;
        ledger.insert_task(record);

        chain.fail_next(2);
        let tx = exec.execute(id, &task, ExecutionMode::Direct).await.unwrap();

        let record = ledger.get_task(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Succeeded);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.tx_hash, Some(tx.clone()));
        assert_eq!(ledger.get_transaction(&tx).unwrap().status, TxStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_marks_registration_failed() {
        let chain = Arc::new(InMemoryChain::new());
        let (exec, ledger) = executor(chain.clone());
        let did = Did::generate();
        let key = PrivateKey::generate().public_key();
        ledger.upsert_registration(TrustRegistration::new(did.clone(), key.to_hex(), true));
        let task = ChainTask::RegisterDid {
            did: did.clone(),
            public_key: key,
        };
        let record = TaskRecord::queued(task.kind(), task.arguments());
        let id = record.id;
        ledger.insert_task(record);

        chain.set_offline(true);
        let err = exec.execute(id, &task, ExecutionMode::Queued).await.unwrap_err();
        let exhausted = match err {
            TaskError::Exhausted(e) => e,
            other => panic!("expected exhaustion, got {other:?}"),
        };
        assert_eq!(exhausted.attempts, 3);
        assert!(exhausted.last_error.is_transient());

        let record = ledger.get_task(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.mode, Some(ExecutionMode::Queued));
        let registration = ledger.get_registration(&did).unwrap();
        assert_eq!(registration.status, RegistrationStatus::Failed);
        assert!(registration.last_error.is_some());
        assert!(ledger.list_transactions().is_empty());
    }

    #[tokio::test]
    async fn success_links_registration() {
        let (exec, ledger) = executor(Arc::new(InMemoryChain::new()));
        let did = Did::generate();
        let key = PrivateKey::generate().public_key();
        ledger.upsert_registration(TrustRegistration::new(did.clone(), key.to_hex(), false));
        let task = ChainTask::RegisterDid {
            did: did.clone(),
            public_key: key,
        };
        let tx = exec.execute(Uuid::new_v4(), &task, ExecutionMode::Direct).await.unwrap();
        let registration = ledger.get_registration(&did).unwrap();
        assert_eq!(registration.status, RegistrationStatus::Submitted);
        assert_eq!(registration.registration_tx, Some(tx));
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_write_is_not_resubmitted_when_recording_fails() {
        let operator = PrivateKey::generate();
        let ledger = Arc::new(MemoryLedger::new());
        let hash = ContentHash::from_bytes([5; 32]);

        // A first chain with the same operator leaves a row under the hash
        // the second chain will assign, so recording the second write fails.
        let earlier = BlockchainService::new(Arc::new(InMemoryChain::new()), ledger.clone(), operator.clone());
        let taken = earlier.anchor_credential(&hash).await.unwrap();

        let chain = Arc::new(InMemoryChain::new());
        let service = BlockchainService::new(chain.clone(), ledger.clone(), operator);
        let exec = TaskExecutor::new(service, RetryPolicy::default());
        let task = ChainTask::AnchorCredential {
            credential_id: None,
            hash,
        };
        let record = TaskRecord::queued(task.kind(), task.arguments());
        let id = record.id;
        ledger.insert_task(record);

        let err = exec.execute(id, &task, ExecutionMode::Direct).await.unwrap_err();
        let failed = match err {
            TaskError::Exhausted(e) => e,
            other => panic!("expected a failed task, got {other:?}"),
        };
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.last_error.submitted_tx(), Some(&taken));
        assert_eq!(chain.write_count(), 1);

        let record = ledger.get_task(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.tx_hash, Some(taken));
    }
}

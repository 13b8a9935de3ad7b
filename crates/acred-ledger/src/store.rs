//! # Ledger Store
//!
//! [`LedgerStore`] is the persistence seam for everything the service and
//! task layer record locally. [`MemoryLedger`] implements it with
//! [`Table`]s: `parking_lot` read-write locks that are never held across an
//! `.await`.
//!
//! Row updates are conditional and atomic per row: the closure runs under
//! the table's write lock, so a reconciliation sweep and a service call
//! can never interleave on the same record.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use acred_chain::TxHash;
use acred_core::{ContentHash, CredentialId, Did, Timestamp};
use acred_vc::{CredentialRecord, StatusTransitionError};

use crate::error::StoreError;
use crate::records::{OnChainTransaction, TaskRecord, TrustRegistration, TxStatus, VerificationRecord};

// -- Generic table ------------------------------------------------------------

/// Thread-safe, cloneable keyed table.
#[derive(Debug)]
pub struct Table<K, V> {
    data: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Table<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Table<K, V> {
    /// Insert only if the key is absent. Returns `false` if it existed.
    pub fn insert_new(&self, key: K, value: V) -> bool {
        let mut guard = self.data.write();
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, value);
        true
    }

    /// Insert or replace.
    pub fn upsert(&self, key: K, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    pub fn list(&self) -> Vec<V> {
        self.data.read().values().cloned().collect()
    }

    pub fn filter(&self, pred: impl Fn(&V) -> bool) -> Vec<V> {
        self.data.read().values().filter(|v| pred(v)).cloned().collect()
    }

    pub fn find(&self, pred: impl Fn(&V) -> bool) -> Option<V> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Atomically read-validate-update a row.
    ///
    /// `None` if the key is absent.
    pub fn try_update<R, E>(&self, key: &K, f: impl FnOnce(&mut V) -> Result<R, E>) -> Option<Result<R, E>> {
        self.data.write().get_mut(key).map(f)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove everything, returning how many rows were dropped.
    pub fn clear(&self) -> usize {
        let mut guard = self.data.write();
        let n = guard.len();
        guard.clear();
        n
    }
}

// -- Store trait ---------------------------------------------------------------

/// Counts removed by [`LedgerStore::reset()`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResetSummary {
    pub transactions: usize,
    pub registrations: usize,
    pub verifications: usize,
    pub tasks: usize,
}

/// Local persistence for chain activity and credentials.
pub trait LedgerStore: Send + Sync + std::fmt::Debug {
    // On-chain transactions

    fn insert_transaction(&self, tx: OnChainTransaction) -> Result<(), StoreError>;
    fn get_transaction(&self, tx_hash: &TxHash) -> Option<OnChainTransaction>;
    fn list_transactions(&self) -> Vec<OnChainTransaction>;
    fn pending_transactions(&self) -> Vec<OnChainTransaction>;

    /// Move a PENDING transaction to `status`. Returns `false` (and leaves
    /// the row alone) if it is no longer PENDING.
    fn resolve_transaction(&self, tx_hash: &TxHash, status: TxStatus, block_number: Option<u64>)
        -> Result<bool, StoreError>;

    // Trust registrations

    fn upsert_registration(&self, registration: TrustRegistration);
    fn get_registration(&self, did: &Did) -> Option<TrustRegistration>;
    fn list_registrations(&self) -> Vec<TrustRegistration>;
    fn update_registration(
        &self,
        did: &Did,
        f: &mut dyn FnMut(&mut TrustRegistration),
    ) -> Result<TrustRegistration, StoreError>;

    // Credentials

    fn insert_credential(&self, record: CredentialRecord) -> Result<(), StoreError>;
    fn get_credential(&self, id: &CredentialId) -> Option<CredentialRecord>;
    fn find_credential_by_hash(&self, hash: &ContentHash) -> Option<CredentialRecord>;
    fn update_credential(
        &self,
        id: &CredentialId,
        f: &mut dyn FnMut(&mut CredentialRecord) -> Result<(), StatusTransitionError>,
    ) -> Result<CredentialRecord, StoreError>;

    // Verification records (append-only)

    fn append_verification(&self, record: VerificationRecord);
    fn list_verifications(&self) -> Vec<VerificationRecord>;
    fn purge_verifications(&self) -> usize;

    // Tasks

    fn insert_task(&self, task: TaskRecord);
    fn get_task(&self, id: &Uuid) -> Option<TaskRecord>;
    fn list_tasks(&self) -> Vec<TaskRecord>;
    fn update_task(&self, id: &Uuid, f: &mut dyn FnMut(&mut TaskRecord)) -> Result<TaskRecord, StoreError>;

    /// Administrative reset of transactions, registrations, verification
    /// records and tasks. Credentials are kept.
    fn reset(&self) -> ResetSummary;
}

// -- In-memory implementation -------------------------------------------------

/// In-memory [`LedgerStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    transactions: Table<TxHash, OnChainTransaction>,
    registrations: Table<Did, TrustRegistration>,
    credentials: Table<CredentialId, CredentialRecord>,
    verifications: Arc<RwLock<Vec<VerificationRecord>>>,
    tasks: Table<Uuid, TaskRecord>,
}

/// Serializable copy of a [`MemoryLedger`]'s contents.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub transactions: Vec<OnChainTransaction>,
    #[serde(default)]
    pub registrations: Vec<TrustRegistration>,
    #[serde(default)]
    pub credentials: Vec<CredentialRecord>,
    #[serde(default)]
    pub verifications: Vec<VerificationRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let ledger = Self::new();
        for tx in snapshot.transactions {
            ledger.transactions.upsert(tx.tx_hash.clone(), tx);
        }
        for registration in snapshot.registrations {
            ledger.registrations.upsert(registration.did.clone(), registration);
        }
        for credential in snapshot.credentials {
            ledger.credentials.upsert(credential.id.clone(), credential);
        }
        for task in snapshot.tasks {
            ledger.tasks.upsert(task.id, task);
        }
        *ledger.verifications.write() = snapshot.verifications;
        ledger
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut credentials = self.credentials.list();
        credentials.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let mut registrations = self.registrations.list();
        registrations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        LedgerSnapshot {
            transactions: self.list_transactions(),
            registrations,
            credentials,
            verifications: self.list_verifications(),
            tasks: self.list_tasks(),
        }
    }
}

fn not_found(entity: &'static str, key: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity,
        key: key.to_string(),
    }
}

impl LedgerStore for MemoryLedger {
    fn insert_transaction(&self, tx: OnChainTransaction) -> Result<(), StoreError> {
        let key = tx.tx_hash.clone();
        if self.transactions.insert_new(key.clone(), tx) {
            Ok(())
        } else {
            Err(StoreError::Duplicate {
                entity: "transaction",
                key: key.to_string(),
            })
        }
    }

    fn get_transaction(&self, tx_hash: &TxHash) -> Option<OnChainTransaction> {
        self.transactions.get(tx_hash)
    }

    fn list_transactions(&self) -> Vec<OnChainTransaction> {
        let mut all = self.transactions.list();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    fn pending_transactions(&self) -> Vec<OnChainTransaction> {
        let mut pending = self.transactions.filter(OnChainTransaction::is_pending);
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending
    }

    fn resolve_transaction(&self, tx_hash: &TxHash, status: TxStatus, block_number: Option<u64>) -> Result<bool, StoreError> {
        self.transactions
            .try_update(tx_hash, |tx| {
                if !tx.is_pending() {
                    return Ok(false);
                }
                tx.status = status;
                tx.block_number = block_number;
                tx.updated_at = Timestamp::now();
                Ok(true)
            })
            .unwrap_or_else(|| Err(not_found("transaction", tx_hash)))
    }

    fn upsert_registration(&self, registration: TrustRegistration) {
        self.registrations.upsert(registration.did.clone(), registration);
    }

    fn get_registration(&self, did: &Did) -> Option<TrustRegistration> {
        self.registrations.get(did)
    }

    fn list_registrations(&self) -> Vec<TrustRegistration> {
        self.registrations.list()
    }

    fn update_registration(&self, did: &Did, f: &mut dyn FnMut(&mut TrustRegistration)) -> Result<TrustRegistration, StoreError> {
        self.registrations
            .try_update(did, |r| {
                f(r);
                r.updated_at = Timestamp::now();
                Ok(r.clone())
            })
            .unwrap_or_else(|| Err(not_found("registration", did)))
    }

    fn insert_credential(&self, record: CredentialRecord) -> Result<(), StoreError> {
        let key = record.id.clone();
        if self.credentials.insert_new(key.clone(), record) {
            Ok(())
        } else {
            Err(StoreError::Duplicate {
                entity: "credential",
                key: key.to_string(),
            })
        }
    }

    fn get_credential(&self, id: &CredentialId) -> Option<CredentialRecord> {
        self.credentials.get(id)
    }

    fn find_credential_by_hash(&self, hash: &ContentHash) -> Option<CredentialRecord> {
        self.credentials.find(|r| r.content_hash() == *hash)
    }

    fn update_credential(
        &self,
        id: &CredentialId,
        f: &mut dyn FnMut(&mut CredentialRecord) -> Result<(), StatusTransitionError>,
    ) -> Result<CredentialRecord, StoreError> {
        self.credentials
            .try_update(id, |r| {
                // Work on a copy so a failed transition leaves the row untouched.
                let mut next = r.clone();
                f(&mut next)?;
                *r = next.clone();
                Ok(next)
            })
            .unwrap_or_else(|| Err(not_found("credential", id)))
    }

    fn append_verification(&self, record: VerificationRecord) {
        self.verifications.write().push(record);
    }

    fn list_verifications(&self) -> Vec<VerificationRecord> {
        self.verifications.read().clone()
    }

    fn purge_verifications(&self) -> usize {
        let mut guard = self.verifications.write();
        let n = guard.len();
        guard.clear();
        n
    }

    fn insert_task(&self, task: TaskRecord) {
        self.tasks.upsert(task.id, task);
    }

    fn get_task(&self, id: &Uuid) -> Option<TaskRecord> {
        self.tasks.get(id)
    }

    fn list_tasks(&self) -> Vec<TaskRecord> {
        let mut all = self.tasks.list();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    fn update_task(&self, id: &Uuid, f: &mut dyn FnMut(&mut TaskRecord)) -> Result<TaskRecord, StoreError> {
        self.tasks
            .try_update(id, |t| {
                f(t);
                t.updated_at = Timestamp::now();
                Ok(t.clone())
            })
            .unwrap_or_else(|| Err(not_found("task", id)))
    }

    fn reset(&self) -> ResetSummary {
        let summary = ResetSummary {
            transactions: self.transactions.clear(),
            registrations: self.registrations.clear(),
            verifications: self.purge_verifications(),
            tasks: self.tasks.clear(),
        };
        tracing::warn!(
            transactions = summary.transactions,
            registrations = summary.registrations,
            verifications = summary.verifications,
            tasks = summary.tasks,
            "ledger reset"
        );
        summary
    }
}

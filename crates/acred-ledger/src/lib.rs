//! # acred-ledger — Blockchain Service and Local Ledger
//!
//! [`BlockchainService`] turns chain-client calls into registry operations
//! (register a DID, anchor a credential hash, revoke, update issuer trust,
//! and the matching reads). Every write is recorded in a [`LedgerStore`] as
//! a PENDING [`OnChainTransaction`]; only the reconciliation sweep in
//! `acred-tasks` moves it on.
//!
//! The store also holds the issuer's [`CredentialRecord`]s,
//! [`TrustRegistration`]s, write-once [`VerificationRecord`]s and
//! [`TaskRecord`]s.
//!
//! [`CredentialRecord`]: acred_vc::CredentialRecord

pub mod error;
pub mod records;
pub mod service;
pub mod store;

pub use error::{BlockchainError, StoreError};
pub use records::{
    CheckOutcome, ExecutionMode, OnChainTransaction, RegistrationStatus, TaskKind, TaskRecord, TaskStatus,
    TrustRegistration, TxKind, TxStatus, VerificationChecks, VerificationPath, VerificationRecord,
};
pub use service::{operations, BlockchainService};
pub use store::{LedgerSnapshot, LedgerStore, MemoryLedger, ResetSummary, Table};

//! # Ledger Records
//!
//! Entities persisted alongside chain activity:
//!
//! - [`OnChainTransaction`]: one submitted chain write. Created PENDING at
//!   submission; moved to CONFIRMED or FAILED only by the reconciliation
//!   sweep.
//! - [`TrustRegistration`]: an issuer DID, its public key, the transaction
//!   that registered it, and whether its trust flag has been pushed.
//! - [`VerificationRecord`]: write-once audit entry for a verification.
//! - [`TaskRecord`]: observable state of a dispatched chain-write task.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use acred_chain::TxHash;
use acred_core::{ContentHash, CredentialId, Did, Timestamp};

// ---------------------------------------------------------------------------
// On-chain transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    DidRegistration,
    CredentialAnchoring,
    CredentialRevocation,
    TrustUpdate,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DidRegistration => "DID_REGISTRATION",
            Self::CredentialAnchoring => "CREDENTIAL_ANCHORING",
            Self::CredentialRevocation => "CREDENTIAL_REVOCATION",
            Self::TrustUpdate => "TRUST_UPDATE",
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Failed => "FAILED",
        })
    }
}

/// A submitted chain write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainTransaction {
    pub tx_hash: TxHash,
    pub status: TxStatus,
    pub kind: TxKind,
    pub block_number: Option<u64>,
    /// Operation arguments, for audit and debugging.
    pub metadata: Map<String, Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OnChainTransaction {
    pub fn pending(tx_hash: TxHash, kind: TxKind, metadata: Map<String, Value>) -> Self {
        let now = Timestamp::now();
        Self {
            tx_hash,
            status: TxStatus::Pending,
            kind,
            block_number: None,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }
}

// ---------------------------------------------------------------------------
// Trust registrations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    /// Created; the registration transaction has not been submitted.
    Pending,
    /// Registration transaction submitted and linked.
    Submitted,
    /// Registration retries exhausted.
    Failed,
}

/// An issuer's DID registration and trust state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustRegistration {
    pub did: Did,
    /// Compressed public key, hex.
    pub public_key: String,
    pub status: RegistrationStatus,
    pub registration_tx: Option<TxHash>,
    /// Trust flag to publish once the registration is confirmed.
    pub trusted: bool,
    /// Whether the trust flag has been pushed on-chain.
    pub trust_updated: bool,
    pub trust_tx: Option<TxHash>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TrustRegistration {
    pub fn new(did: Did, public_key: impl Into<String>, trusted: bool) -> Self {
        let now = Timestamp::now();
        Self {
            did,
            public_key: public_key.into(),
            status: RegistrationStatus::Pending,
            registration_tx: None,
            trusted,
            trust_updated: false,
            trust_tx: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Verification records
// ---------------------------------------------------------------------------

/// Result of a check that may be impossible to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    Yes,
    No,
    Indeterminate,
}

impl CheckOutcome {
    pub fn is_yes(&self) -> bool {
        *self == Self::Yes
    }

    pub fn is_no(&self) -> bool {
        *self == Self::No
    }
}

impl From<bool> for CheckOutcome {
    fn from(b: bool) -> Self {
        if b {
            Self::Yes
        } else {
            Self::No
        }
    }
}

/// Which verification path produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationPath {
    /// The hash resolved to a locally stored credential.
    Internal,
    /// The hash is unknown locally; only anchoring was checkable.
    External,
}

/// Itemized check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChecks {
    pub signature_valid: bool,
    pub anchored: bool,
    pub issuer_trusted: CheckOutcome,
    pub revoked: CheckOutcome,
    pub expired: bool,
    pub issued: CheckOutcome,
}

/// Write-once audit entry for one verification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: Uuid,
    /// Who asked.
    pub requester: String,
    pub content_hash: ContentHash,
    pub credential_id: Option<CredentialId>,
    pub path: VerificationPath,
    pub checks: VerificationChecks,
    pub overall_valid: bool,
    pub verified_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Task records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    RegisterDid,
    AnchorCredential,
    RevokeCredential,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::RegisterDid => "register_did",
            Self::AnchorCredential => "anchor_credential",
            Self::RevokeCredential => "revoke_credential",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

/// How a task was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Queued,
    Direct,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Queued => "queued",
            Self::Direct => "direct",
        })
    }
}

/// Observable state of one dispatched task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub kind: TaskKind,
    pub arguments: Value,
    pub status: TaskStatus,
    pub mode: Option<ExecutionMode>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub tx_hash: Option<TxHash>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TaskRecord {
    pub fn queued(kind: TaskKind, arguments: Value) -> Self {
        let now = Timestamp::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            arguments,
            status: TaskStatus::Queued,
            mode: None,
            attempts: 0,
            last_error: None,
            tx_hash: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(TxStatus::Pending).unwrap(), "PENDING");
        assert_eq!(serde_json::to_value(TxKind::CredentialAnchoring).unwrap(), "CREDENTIAL_ANCHORING");
        assert_eq!(TxKind::TrustUpdate.as_str(), "TRUST_UPDATE");
        assert_eq!(serde_json::to_value(CheckOutcome::Indeterminate).unwrap(), "indeterminate");
        assert_eq!(serde_json::to_value(TaskKind::RegisterDid).unwrap(), "REGISTER_DID");
    }

    #[test]
    fn new_transaction_is_pending() {
        let mut meta = Map::new();
        meta.insert("vc_hash".into(), json!("ab"));
        let tx = OnChainTransaction::pending(TxHash::from_bytes([1; 32]), TxKind::CredentialAnchoring, meta);
        assert!(tx.is_pending());
        assert_eq!(tx.block_number, None);
    }

    #[test]
    fn check_outcome_from_bool() {
        assert!(CheckOutcome::from(true).is_yes());
        assert!(CheckOutcome::from(false).is_no());
        assert!(!CheckOutcome::Indeterminate.is_yes());
        assert!(!CheckOutcome::Indeterminate.is_no());
    }
}

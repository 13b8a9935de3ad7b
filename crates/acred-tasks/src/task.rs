//! Chain-writing tasks.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use acred_chain::TxHash;
use acred_core::{ContentHash, CredentialId, Did};
use acred_crypto::PublicKey;
use acred_ledger::{BlockchainError, BlockchainService, TaskKind};

/// One reliable chain write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ChainTask {
    RegisterDid {
        did: Did,
        public_key: PublicKey,
    },
    AnchorCredential {
        /// Local credential the hash belongs to, if any.
        credential_id: Option<CredentialId>,
        hash: ContentHash,
    },
    RevokeCredential {
        credential_id: CredentialId,
    },
}

impl ChainTask {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::RegisterDid { .. } => TaskKind::RegisterDid,
            Self::AnchorCredential { .. } => TaskKind::AnchorCredential,
            Self::RevokeCredential { .. } => TaskKind::RevokeCredential,
        }
    }

    /// What the task is about, for logs and errors.
    pub fn subject(&self) -> String {
        match self {
            Self::RegisterDid { did, .. } => did.to_string(),
            Self::AnchorCredential { hash, .. } => hash.to_hex(),
            Self::RevokeCredential { credential_id } => credential_id.to_string(),
        }
    }

    /// Arguments as stored on the task record.
    pub fn arguments(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "subject": self.subject() }))
    }

    /// Perform the write once.
    pub(crate) async fn run(&self, service: &BlockchainService) -> Result<TxHash, BlockchainError> {
        match self {
            Self::RegisterDid { did, public_key } => service.register_did(did, public_key).await,
            Self::AnchorCredential { hash, .. } => service.anchor_credential(hash).await,
            Self::RevokeCredential { credential_id } => service.revoke_credential(credential_id).await,
        }
    }
}

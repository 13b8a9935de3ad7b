//! # Blockchain Service
//!
//! Domain operations over a [`ChainClient`]. Each write submits one
//! contract transaction, signed by the operator key, and records it as a
//! PENDING [`OnChainTransaction`]. Reads persist nothing.
//!
//! Failures are wrapped in [`BlockchainError`] with the operation name and
//! its subject. Nothing here retries; the task layer owns that.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use acred_chain::{methods, ChainClient, ChainError, ContractName, NodeInfo, Receipt, Token, TxHash};
use acred_core::{ContentHash, CredentialId, Did};
use acred_crypto::{PrivateKey, PublicKey};

use crate::error::BlockchainError;
use crate::records::{OnChainTransaction, TxKind};
use crate::store::LedgerStore;

/// Operation names used in errors and logs.
pub mod operations {
    pub const REGISTER_DID: &str = "register_did";
    pub const ANCHOR_CREDENTIAL: &str = "anchor_credential";
    pub const REVOKE_CREDENTIAL: &str = "revoke_credential";
    pub const UPDATE_ISSUER_TRUST: &str = "update_issuer_trust";
    pub const IS_ISSUER_TRUSTED: &str = "is_issuer_trusted";
    pub const IS_REVOKED: &str = "is_revoked";
    pub const IS_ANCHORED: &str = "is_anchored";
    pub const IS_DID_REGISTERED: &str = "is_did_registered";
    pub const RESOLVE_DID: &str = "resolve_did";
    pub const TRANSACTION_RECEIPT: &str = "transaction_receipt";
    pub const STATUS: &str = "status";
}

/// Chain-backed registry operations with local transaction bookkeeping.
#[derive(Clone)]
pub struct BlockchainService {
    chain: Arc<dyn ChainClient>,
    ledger: Arc<dyn LedgerStore>,
    operator: Arc<PrivateKey>,
}

impl std::fmt::Debug for BlockchainService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainService")
            .field("ledger", &self.ledger)
            .field("operator", &self.operator_address())
            .finish_non_exhaustive()
    }
}

struct Write<'a> {
    operation: &'static str,
    subject: String,
    contract: ContractName,
    method: &'a str,
    args: Vec<Token>,
    kind: TxKind,
    metadata: Value,
}

impl BlockchainService {
    pub fn new(chain: Arc<dyn ChainClient>, ledger: Arc<dyn LedgerStore>, operator: PrivateKey) -> Self {
        Self {
            chain,
            ledger,
            operator: Arc::new(operator),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    /// Account address of the operator key, `0x`-prefixed.
    pub fn operator_address(&self) -> String {
        self.operator.account_address_hex()
    }

    // -- Writes ---------------------------------------------------------------

    /// Register `did` with its public key in the DID registry.
    pub async fn register_did(&self, did: &Did, public_key: &PublicKey) -> Result<TxHash, BlockchainError> {
        let key_hex = public_key.to_hex();
        self.submit(Write {
            operation: operations::REGISTER_DID,
            subject: did.to_string(),
            contract: ContractName::DidRegistry,
            method: methods::REGISTER_DID,
            args: vec![Token::String(did.to_string()), Token::String(key_hex.clone())],
            kind: TxKind::DidRegistration,
            metadata: json!({ "did": did, "public_key": key_hex }),
        })
        .await
    }

    /// Record a credential content hash in the anchor contract.
    pub async fn anchor_credential(&self, hash: &ContentHash) -> Result<TxHash, BlockchainError> {
        self.submit(Write {
            operation: operations::ANCHOR_CREDENTIAL,
            subject: hash.to_hex(),
            contract: ContractName::CredentialAnchor,
            method: methods::STORE_PROOF,
            args: vec![Token::Bytes32(*hash.as_bytes())],
            kind: TxKind::CredentialAnchoring,
            metadata: json!({ "vc_hash": hash.to_hex() }),
        })
        .await
    }

    pub async fn revoke_credential(&self, id: &CredentialId) -> Result<TxHash, BlockchainError> {
        self.submit(Write {
            operation: operations::REVOKE_CREDENTIAL,
            subject: id.to_string(),
            contract: ContractName::RevocationRegistry,
            method: methods::REVOKE_CREDENTIAL,
            args: vec![Token::String(id.to_string())],
            kind: TxKind::CredentialRevocation,
            metadata: json!({ "credential_id": id }),
        })
        .await
    }

    pub async fn update_issuer_trust(&self, did: &Did, trusted: bool) -> Result<TxHash, BlockchainError> {
        self.submit(Write {
            operation: operations::UPDATE_ISSUER_TRUST,
            subject: did.to_string(),
            contract: ContractName::TrustRegistry,
            method: methods::SET_ISSUER_TRUST_STATUS,
            args: vec![Token::String(did.to_string()), Token::Bool(trusted)],
            kind: TxKind::TrustUpdate,
            metadata: json!({ "did": did, "trusted": trusted }),
        })
        .await
    }

    async fn submit(&self, write: Write<'_>) -> Result<TxHash, BlockchainError> {
        let tx_hash = self
            .chain
            .write_contract(write.contract, write.method, &write.args, &self.operator)
            .await
            .map_err(|source| {
                tracing::error!(
                    operation = write.operation,
                    subject = %write.subject,
                    error = %source,
                    "chain write failed"
                );
                BlockchainError::Chain {
                    operation: write.operation,
                    subject: write.subject.clone(),
                    source,
                }
            })?;

        let metadata = match write.metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.ledger
            .insert_transaction(OnChainTransaction::pending(tx_hash.clone(), write.kind, metadata))
            .map_err(|source| BlockchainError::Persistence {
                operation: write.operation,
                subject: write.subject.clone(),
                tx_hash: tx_hash.clone(),
                source,
            })?;

        tracing::info!(
            operation = write.operation,
            subject = %write.subject,
            tx_hash = %tx_hash,
            kind = write.kind.as_str(),
            "transaction submitted"
        );
        Ok(tx_hash)
    }

    // -- Reads ----------------------------------------------------------------

    pub async fn is_issuer_trusted(&self, did: &Did) -> Result<bool, BlockchainError> {
        self.read_bool(
            operations::IS_ISSUER_TRUSTED,
            did.as_str(),
            ContractName::TrustRegistry,
            methods::IS_ISSUER_TRUSTED,
            Token::String(did.to_string()),
        )
        .await
    }

    pub async fn is_revoked(&self, id: &CredentialId) -> Result<bool, BlockchainError> {
        self.read_bool(
            operations::IS_REVOKED,
            id.as_str(),
            ContractName::RevocationRegistry,
            methods::IS_REVOKED,
            Token::String(id.to_string()),
        )
        .await
    }

    pub async fn is_anchored(&self, hash: &ContentHash) -> Result<bool, BlockchainError> {
        self.read_bool(
            operations::IS_ANCHORED,
            &hash.to_hex(),
            ContractName::CredentialAnchor,
            methods::VERIFY_PROOF,
            Token::Bytes32(*hash.as_bytes()),
        )
        .await
    }

    pub async fn is_did_registered(&self, did: &Did) -> Result<bool, BlockchainError> {
        self.read_bool(
            operations::IS_DID_REGISTERED,
            did.as_str(),
            ContractName::DidRegistry,
            methods::IS_DID_REGISTERED,
            Token::String(did.to_string()),
        )
        .await
    }

    /// Public key registered on-chain for `did`.
    ///
    /// `Ok(None)` when the registry has no entry (it answers with an empty
    /// string).
    pub async fn resolve_did(&self, did: &Did) -> Result<Option<PublicKey>, BlockchainError> {
        let subject = did.to_string();
        let out = self
            .read(
                operations::RESOLVE_DID,
                &subject,
                ContractName::DidRegistry,
                methods::RESOLVE_DID,
                Token::String(subject.clone()),
            )
            .await?;
        let Some(raw) = out.first().and_then(Token::as_str) else {
            return Err(unexpected(operations::RESOLVE_DID, &subject, "expected a string"));
        };
        if raw.is_empty() {
            return Ok(None);
        }
        PublicKey::parse(raw)
            .map(Some)
            .map_err(|e| unexpected(operations::RESOLVE_DID, &subject, e.to_string()))
    }

    pub async fn transaction_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, BlockchainError> {
        self.chain.get_receipt(tx_hash).await.map_err(|source| BlockchainError::Chain {
            operation: operations::TRANSACTION_RECEIPT,
            subject: tx_hash.to_string(),
            source,
        })
    }

    /// True only when a receipt exists and reports success.
    pub async fn is_transaction_confirmed(&self, tx_hash: &TxHash) -> Result<bool, BlockchainError> {
        Ok(self
            .transaction_receipt(tx_hash)
            .await?
            .is_some_and(|r| r.is_success()))
    }

    /// Liveness probe: chain id and latest block.
    pub async fn status(&self) -> Result<NodeInfo, BlockchainError> {
        self.chain.connect().await.map_err(|source| BlockchainError::Chain {
            operation: operations::STATUS,
            subject: self.operator_address(),
            source,
        })
    }

    async fn read(
        &self,
        operation: &'static str,
        subject: &str,
        contract: ContractName,
        method: &str,
        arg: Token,
    ) -> Result<Vec<Token>, BlockchainError> {
        self.chain
            .read_contract(contract, method, &[arg])
            .await
            .map_err(|source: ChainError| {
                tracing::warn!(operation, subject, error = %source, "chain read failed");
                BlockchainError::Chain {
                    operation,
                    subject: subject.to_string(),
                    source,
                }
            })
    }

    async fn read_bool(
        &self,
        operation: &'static str,
        subject: &str,
        contract: ContractName,
        method: &str,
        arg: Token,
    ) -> Result<bool, BlockchainError> {
        let out = self.read(operation, subject, contract, method, arg).await?;
        out.first()
            .and_then(Token::as_bool)
            .ok_or_else(|| unexpected(operation, subject, "expected a bool"))
    }
}

fn unexpected(operation: &'static str, subject: &str, detail: impl Into<String>) -> BlockchainError {
    BlockchainError::UnexpectedResponse {
        operation,
        subject: subject.to_string(),
        detail: detail.into(),
    }
}

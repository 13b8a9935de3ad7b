//! # In-Memory Chain
//!
//! A deterministic [`ChainClient`] that keeps the four registries in
//! process memory. Used by tests and by the CLI's `memory` dry-run network.
//!
//! - Revocation is one-way: no call un-revokes a credential id.
//! - Writes are mined immediately unless manual mining is enabled, in
//!   which case they take effect at the next [`InMemoryChain::mine()`].
//! - [`InMemoryChain::fail_next()`] makes the next N calls of any kind
//!   fail with [`ChainError::Connection`]; [`InMemoryChain::set_offline()`]
//!   fails every call until cleared.
//! - [`InMemoryChain::revert_next_writes()`] makes writes mine with a
//!   failed receipt and no state change.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use acred_crypto::{keccak256, PrivateKey};

use crate::abi::Token;
use crate::client::{ChainClient, NodeInfo, Receipt, TxHash};
use crate::config::ContractName;
use crate::contracts::methods;
use crate::error::ChainError;

/// Chain id reported by the in-memory chain.
pub const MEMORY_CHAIN_ID: u64 = 1337;

const ENDPOINT: &str = "memory://chain";

#[derive(Debug, Clone)]
struct PendingWrite {
    tx_hash: TxHash,
    contract: ContractName,
    method: String,
    args: Vec<Token>,
    revert: bool,
}

#[derive(Debug, Default)]
struct State {
    dids: HashMap<String, String>,
    trusted: HashMap<String, bool>,
    anchored: HashSet<[u8; 32]>,
    revoked: HashSet<String>,
    receipts: HashMap<TxHash, Receipt>,
    pending: Vec<PendingWrite>,
    block_number: u64,
    sequence: u64,
    fail_next: u32,
    offline: bool,
    revert_next: u32,
    manual_mining: bool,
    calls: u64,
    writes: u64,
}

/// In-memory registry chain.
#[derive(Debug, Default)]
pub struct InMemoryChain {
    state: Mutex<State>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes stay pending until [`mine()`](Self::mine).
    pub fn with_manual_mining() -> Self {
        let chain = Self::new();
        chain.state.lock().manual_mining = true;
        chain
    }

    /// Fail the next `n` calls with a connection error.
    pub fn fail_next(&self, n: u32) {
        self.state.lock().fail_next = n;
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// The next `n` writes mine with a failed receipt.
    pub fn revert_next_writes(&self, n: u32) {
        self.state.lock().revert_next = n;
    }

    /// Total calls received, including failed ones.
    pub fn call_count(&self) -> u64 {
        self.state.lock().calls
    }

    /// Writes accepted.
    pub fn write_count(&self) -> u64 {
        self.state.lock().writes
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Mine every pending write into one new block.
    pub fn mine(&self) -> u64 {
        let mut state = self.state.lock();
        state.block_number += 1;
        let block = state.block_number;
        let pending = std::mem::take(&mut state.pending);
        for write in pending {
            apply_write(&mut state, &write, block);
        }
        block
    }

    fn enter(&self) -> Result<parking_lot::MutexGuard<'_, State>, ChainError> {
        let mut state = self.state.lock();
        state.calls += 1;
        if state.offline {
            return Err(ChainError::connection(ENDPOINT, "node offline"));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(ChainError::connection(ENDPOINT, "injected connection failure"));
        }
        Ok(state)
    }
}

fn apply_write(state: &mut State, write: &PendingWrite, block: u64) {
    let success = !write.revert;
    if success {
        match (write.contract, write.method.as_str(), write.args.as_slice()) {
            (ContractName::DidRegistry, methods::REGISTER_DID, [Token::String(did), Token::String(key)]) => {
                state.dids.insert(did.clone(), key.clone());
            }
            (ContractName::TrustRegistry, methods::SET_ISSUER_TRUST_STATUS, [Token::String(did), Token::Bool(t)]) => {
                state.trusted.insert(did.clone(), *t);
            }
            (ContractName::CredentialAnchor, methods::STORE_PROOF, [Token::Bytes32(h)]) => {
                state.anchored.insert(*h);
            }
            (ContractName::RevocationRegistry, methods::REVOKE_CREDENTIAL, [Token::String(id)]) => {
                state.revoked.insert(id.clone());
            }
            _ => {}
        }
    }
    state.receipts.insert(
        write.tx_hash.clone(),
        Receipt {
            tx_hash: write.tx_hash.clone(),
            status: Some(success),
            block_number: Some(block),
        },
    );
}

fn bad_args(contract: ContractName, method: &str) -> ChainError {
    ChainError::contract(contract.as_str(), method, "argument mismatch")
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn connect(&self) -> Result<NodeInfo, ChainError> {
        let state = self.enter()?;
        Ok(NodeInfo {
            chain_id: MEMORY_CHAIN_ID,
            block_number: state.block_number,
        })
    }

    async fn read_contract(&self, contract: ContractName, method: &str, args: &[Token]) -> Result<Vec<Token>, ChainError> {
        let state = self.enter()?;
        let out = match (contract, method, args) {
            (ContractName::DidRegistry, methods::RESOLVE_DID, [Token::String(did)]) => {
                Token::String(state.dids.get(did).cloned().unwrap_or_default())
            }
            (ContractName::DidRegistry, methods::IS_DID_REGISTERED, [Token::String(did)]) => {
                Token::Bool(state.dids.contains_key(did))
            }
            (ContractName::TrustRegistry, methods::IS_ISSUER_TRUSTED, [Token::String(did)]) => {
                Token::Bool(state.trusted.get(did).copied().unwrap_or(false))
            }
            (ContractName::CredentialAnchor, methods::VERIFY_PROOF, [Token::Bytes32(h)]) => {
                Token::Bool(state.anchored.contains(h))
            }
            (ContractName::RevocationRegistry, methods::IS_REVOKED, [Token::String(id)]) => {
                Token::Bool(state.revoked.contains(id))
            }
            _ => return Err(bad_args(contract, method)),
        };
        Ok(vec![out])
    }

    async fn write_contract(
        &self,
        contract: ContractName,
        method: &str,
        args: &[Token],
        signer: &PrivateKey,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.enter()?;
        let known = matches!(
            (contract, method, args),
            (ContractName::DidRegistry, methods::REGISTER_DID, [Token::String(_), Token::String(_)])
                | (ContractName::TrustRegistry, methods::SET_ISSUER_TRUST_STATUS, [Token::String(_), Token::Bool(_)])
                | (ContractName::CredentialAnchor, methods::STORE_PROOF, [Token::Bytes32(_)])
                | (ContractName::RevocationRegistry, methods::REVOKE_CREDENTIAL, [Token::String(_)])
        );
        if !known {
            return Err(bad_args(contract, method));
        }
        if let (ContractName::DidRegistry, [Token::String(did), _]) = (contract, args) {
            if state.dids.contains_key(did) {
                return Err(ChainError::contract(contract.as_str(), method, "execution reverted: DID already registered"));
            }
        }

        state.sequence += 1;
        state.writes += 1;
        let mut preimage = signer.account_address_hex().into_bytes();
        preimage.extend_from_slice(&state.sequence.to_be_bytes());
        preimage.extend_from_slice(method.as_bytes());
        let tx_hash = TxHash::from_bytes(keccak256(&preimage));

        let revert = state.revert_next > 0;
        if revert {
            state.revert_next -= 1;
        }
        let write = PendingWrite {
            tx_hash: tx_hash.clone(),
            contract,
            method: method.to_string(),
            args: args.to_vec(),
            revert,
        };
        if state.manual_mining {
            state.pending.push(write);
        } else {
            state.block_number += 1;
            let block = state.block_number;
            apply_write(&mut state, &write, block);
        }
        tracing::debug!(contract = %contract, method, tx_hash = %tx_hash, "in-memory write accepted");
        Ok(tx_hash)
    }

    async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, ChainError> {
        let state = self.enter()?;
        Ok(state.receipts.get(tx_hash).cloned())
    }
}

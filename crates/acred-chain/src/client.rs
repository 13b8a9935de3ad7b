//! The chain client seam.
//!
//! [`ChainClient`] is the capability set every network adapter offers.
//! Writes return the transaction hash as soon as the node accepts the
//! transaction; confirmation is observed later through
//! [`ChainClient::get_receipt()`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use acred_core::TxHash;
use acred_crypto::PrivateKey;

use crate::abi::Token;
use crate::config::ContractName;
use crate::error::ChainError;

/// A mined transaction's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    /// `Some(true)` for status `0x1`, `Some(false)` for `0x0`.
    pub status: Option<bool>,
    pub block_number: Option<u64>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == Some(true)
    }

    pub fn is_failure(&self) -> bool {
        self.status == Some(false)
    }
}

/// Result of [`ChainClient::connect()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub chain_id: u64,
    pub block_number: u64,
}

/// Read/write access to the registry contracts on one network.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Probe the node; returns chain id and latest block.
    async fn connect(&self) -> Result<NodeInfo, ChainError>;

    /// Call a view function and decode its outputs.
    async fn read_contract(&self, contract: ContractName, method: &str, args: &[Token])
        -> Result<Vec<Token>, ChainError>;

    /// Sign and submit a state-changing call. Does not wait for mining.
    async fn write_contract(
        &self,
        contract: ContractName,
        method: &str,
        args: &[Token],
        signer: &PrivateKey,
    ) -> Result<TxHash, ChainError>;

    /// `None` while the transaction is unknown or unmined.
    async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, ChainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_status() {
        let r = Receipt {
            tx_hash: TxHash::from_bytes([1; 32]),
            status: Some(false),
            block_number: Some(7),
        };
        assert!(r.is_failure());
        assert!(!r.is_success());
    }
}

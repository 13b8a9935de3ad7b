use thiserror::Error;

use acred_chain::{ChainError, TxHash};
use acred_vc::StatusTransitionError;

/// Local store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {key} already exists")]
    Duplicate { entity: &'static str, key: String },

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error(transparent)]
    Transition(#[from] StatusTransitionError),
}

/// Service-level chain failure, carrying the operation and its subject.
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("{operation} failed for {subject}")]
    Chain {
        operation: &'static str,
        subject: String,
        #[source]
        source: ChainError,
    },

    #[error("{operation} for {subject}: unexpected contract response: {detail}")]
    UnexpectedResponse {
        operation: &'static str,
        subject: String,
        detail: String,
    },

    /// The node accepted the transaction; only the local row is missing.
    #[error("{operation} for {subject} succeeded on-chain as {tx_hash} but was not recorded")]
    Persistence {
        operation: &'static str,
        subject: String,
        tx_hash: TxHash,
        #[source]
        source: StoreError,
    },
}

impl BlockchainError {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Chain { operation, .. }
            | Self::UnexpectedResponse { operation, .. }
            | Self::Persistence { operation, .. } => operation,
        }
    }

    /// The chain client error underneath, if any.
    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            Self::Chain { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.chain_error().is_some_and(ChainError::is_transient)
    }

    /// Whether the write can be attempted again. A write the node already
    /// accepted must not be resubmitted.
    pub fn is_retryable(&self) -> bool {
        self.submitted_tx().is_none()
    }

    /// Transaction the node accepted before the failure, if any.
    pub fn submitted_tx(&self) -> Option<&TxHash> {
        match self {
            Self::Persistence { tx_hash, .. } => Some(tx_hash),
            _ => None,
        }
    }
}

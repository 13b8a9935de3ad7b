use thiserror::Error;

/// Chain client failures.
///
/// `Connection` is the transient class: the node could not be reached or
/// did not answer in time. Everything else is a definite answer from the
/// node or a local misconfiguration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Node unreachable, timed out, or returned a non-success HTTP status.
    #[error("chain node unreachable at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// ABI or address missing, argument mismatch, or the call reverted.
    #[error("contract {contract}.{method} failed: {reason}")]
    Contract {
        contract: String,
        method: String,
        reason: String,
    },

    /// The signing key could not be used.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// The node answered with a JSON-RPC error or an unreadable result.
    #[error("JSON-RPC {method} failed: {message}")]
    Rpc { method: String, message: String },
}

impl ChainError {
    pub fn connection(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn contract(contract: impl Into<String>, method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Contract {
            contract: contract.into(),
            method: method.into(),
            reason: reason.into(),
        }
    }

    pub fn rpc(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

impl From<acred_crypto::CryptoError> for ChainError {
    fn from(e: acred_crypto::CryptoError) -> Self {
        Self::InvalidKey(e.to_string())
    }
}

//! # Error Types
//!
//! Errors raised by the foundational layer. Higher crates wrap these with
//! `#[from]` conversions rather than re-describing them.

use thiserror::Error;

/// The document could not be turned into canonical bytes.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// The value contains something serde cannot represent as JSON
    /// (non-string map keys, failing `Serialize` impls).
    #[error("document is not serializable: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential documents must be JSON objects at the top level.
    #[error("credential document must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON kind that was supplied instead.
        found: &'static str,
    },

    /// A content hash string was not 64 lowercase hex characters.
    #[error("invalid content hash {value:?}: {reason}")]
    InvalidContentHash {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Validation failure for identifier and timestamp newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Not a `did:method:identifier` string.
    #[error("invalid DID {0:?}: expected did:<method>:<identifier>")]
    InvalidDid(String),

    /// Credential identifiers must be non-empty and free of whitespace.
    #[error("invalid credential id {0:?}")]
    InvalidCredentialId(String),

    /// Not a 32-byte hex transaction hash.
    #[error("invalid transaction hash {0:?}: expected 32 hex bytes")]
    InvalidTxHash(String),

    /// Timestamp could not be parsed or was not UTC.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

use thiserror::Error;

/// Errors from key parsing and signing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input did not decode to a usable private scalar or compressed point.
    #[error("invalid {kind} key format: {reason}")]
    InvalidKeyFormat {
        /// `"private"` or `"public"`.
        kind: &'static str,
        /// What was wrong with the input.
        reason: String,
    },

    /// A signature string was not 128 hex characters of a valid `r || s`.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The signing backend refused to produce a signature.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

impl CryptoError {
    pub(crate) fn private(reason: impl Into<String>) -> Self {
        Self::InvalidKeyFormat {
            kind: "private",
            reason: reason.into(),
        }
    }

    pub(crate) fn public(reason: impl Into<String>) -> Self {
        Self::InvalidKeyFormat {
            kind: "public",
            reason: reason.into(),
        }
    }
}

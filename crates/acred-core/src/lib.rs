//! # acred-core — Foundational Types for AuthentiCred
//!
//! Every other crate in the workspace depends on `acred-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All hashing and signing input flows
//!    through `CanonicalBytes`. No raw `serde_json::to_vec()` for digests.
//!    A verifier that re-serializes a credential reproduces the issuer's
//!    bytes exactly.
//!
//! 2. **`ContentHash` is computed only from `&CanonicalBytes`.** The
//!    function signature of [`sha256_digest()`] makes the "hashed the wrong
//!    bytes" defect unrepresentable.
//!
//! 3. **Validated identifiers.** [`Did`] rejects strings that are not
//!    `did:method:identifier` at construction and at deserialization;
//!    [`TxHash`] does the same for transaction hashes.
//!
//! 4. **UTC-only timestamps** truncated to seconds. Document dates keep
//!    the issuer's text so re-serializing never changes a hash.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `acred-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::{canonicalize_document, CanonicalBytes, PROOF_FIELD};
pub use digest::{hash_document, sha256_digest, sha256_hex, ContentHash};
pub use error::{EncodingError, ValidationError};
pub use identity::{is_content_hash_hex, CredentialId, Did, TxHash, DID_METHOD};
pub use temporal::{DocumentDate, Timestamp};

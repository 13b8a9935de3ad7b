//! # acred-verify — Credential Verification
//!
//! [`Verifier`] turns a [`VerificationInput`] (content hash or credential
//! document) into an itemized [`VerificationReport`]:
//!
//! | Check | On chain error |
//! |-------|----------------|
//! | signature (issuer key from local registration, else on-chain DID registry) | key missing: `false` |
//! | anchored | `false` |
//! | issuer trusted | local registration exists |
//! | revoked | local record status |
//! | expired | local only |
//! | issued | local only |
//!
//! Unknown hashes get only the anchoring check. Revocation that cannot be
//! decided counts as a pass under [`REVOCATION_POLICY`].

pub mod engine;
pub mod input;
pub mod policy;

pub use engine::{VerificationReport, Verifier};
pub use input::{InputError, VerificationInput};
pub use policy::{overall_valid, RevocationPolicy, REVOCATION_POLICY};

//! # acred-vc — Verifiable Credentials
//!
//! - [`CredentialDocument`]: the signed JSON claim (issuer, holder subject,
//!   dates, proof). Signing input and content hash are both the canonical
//!   bytes of the document with `proof` removed.
//! - [`CredentialRecord`]: the issuer-side record wrapping a document with
//!   its content hash and lifecycle status (DRAFT → ISSUED → REVOKED;
//!   EXPIRED is derived from the expiration date).
//! - [`CredentialSchema`]: ordered claim fields, each tagged with a
//!   [`FieldType`]; validation dispatches on the tag.

pub mod credential;
pub mod proof;
pub mod schema;
pub mod status;

pub use credential::{CredentialDocument, VcError, VC_CONTEXT_V1, VC_TYPE};
pub use proof::{Proof, ProofPurpose};
pub use schema::{CredentialSchema, FieldSpec, FieldType, FieldViolation, SchemaError};
pub use status::{CredentialRecord, CredentialStatus, StatusTransitionError};

//! # acred-crypto — Credential Signatures
//!
//! One signature scheme, used for every credential proof:
//!
//! - **Curve:** secp256k1.
//! - **Digest:** SHA-256 of the canonical document bytes.
//! - **Encoding:** raw 64-byte `r || s`, rendered as 128 lowercase hex
//!   characters. Signatures are produced low-S; verification accepts either
//!   S form.
//! - **Keys:** 32-byte private scalars; 33-byte compressed SEC1 public keys.
//!
//! Key generation, signing and verification all live here so they cannot
//! drift apart.
//!
//! ## Crate Policy
//!
//! - Depends only on `acred-core` internally.
//! - Private keys never implement `Serialize` and redact themselves in
//!   `Debug`; their bytes are zeroized on drop.
//! - Tests use real keys and real signatures, never mocks.

pub mod error;
pub mod ethereum;
pub mod secp256k1;

pub use error::CryptoError;
pub use ethereum::{account_address, account_address_hex, keccak256, RecoverableSignature};
pub use secp256k1::{sign, verify, PrivateKey, PublicKey, Signature, PROOF_TYPE};

//! # acred-cli — AuthentiCred Operator CLI
//!
//! ## Subcommands
//!
//! - `acred keygen | sign | hash | verify-signature` — offline key and
//!   document handling.
//! - `acred registry ...` — DID registration, issuer trust, issuance,
//!   anchoring and revocation.
//! - `acred verify` — verify a credential by hash or document.
//! - `acred admin ...` — reconciliation sweeps, the background worker, and
//!   ledger maintenance.
//!
//! ```bash
//! acred --network memory --ledger ledger.json registry register-did did:authenticred:uni --public-key 02ab...
//! acred --ledger ledger.json verify 5f2c...e1
//! ```

pub mod admin;
pub mod context;
pub mod keys;
pub mod registry;
pub mod verify;

use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! Keccak-256 and account helpers for the transaction signer.
//!
//! These operate on the same secp256k1 keys as credential signing, but hash
//! with Keccak-256 and produce recoverable signatures, as EVM nodes expect.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature};
use sha3::{Digest, Keccak256};

use crate::error::CryptoError;
use crate::secp256k1::{PrivateKey, PublicKey};

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// 20-byte account address: the last 20 bytes of the Keccak-256 of the
/// uncompressed point without its `04` prefix.
pub fn account_address(public_key: &PublicKey) -> [u8; 20] {
    let uncompressed = public_key.to_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    out
}

/// `0x`-prefixed lowercase hex address.
pub fn account_address_hex(public_key: &PublicKey) -> String {
    format!("0x{}", hex::encode(account_address(public_key)))
}

/// A recoverable signature over a 32-byte prehash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// Recovery id, 0 or 1.
    pub recovery_id: u8,
}

impl PrivateKey {
    /// Sign a Keccak-256 prehash, returning `(r, s, recovery_id)` with low S.
    pub fn sign_prehash_recoverable(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recid): (EcdsaSignature, RecoveryId) = self
            .as_signing_key()
            .sign_prehash_recoverable(prehash)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recid.to_byte(),
        })
    }

    /// Account address controlled by this key.
    pub fn account_address_hex(&self) -> String {
        account_address_hex(&self.public_key())
    }
}

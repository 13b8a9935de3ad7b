//! # ECDSA secp256k1 Signing and Verification
//!
//! ## Security Invariant
//!
//! - [`PrivateKey::sign()`] takes `&CanonicalBytes`, so issuers can only
//!   sign canonicalized documents. The byte-level [`sign()`] / [`verify()`]
//!   functions exist for protocol-level checks over arbitrary messages.
//! - Signing is deterministic (RFC 6979): the same key and message always
//!   yield the same signature.
//! - [`verify()`] never errors. Malformed keys or signatures are simply not
//!   valid signatures.
//!
//! ## Key Normalization
//!
//! Private keys are accepted as 64 hex characters (optional `0x`) or as
//! standard base64 of the 32 raw bytes. Public keys are accepted as 66 hex
//! characters (optional `0x`) or base64 of the 33-byte compressed point.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use acred_core::CanonicalBytes;

use crate::error::CryptoError;

/// Proof `type` value for signatures produced by this module.
pub const PROOF_TYPE: &str = "EcdsaSecp256k1Signature2019";

const PRIVATE_KEY_LEN: usize = 32;
const PUBLIC_KEY_LEN: usize = 33;
const SIGNATURE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// A secp256k1 signing key.
///
/// Does not implement `Serialize`; `Debug` prints no key material.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a new random key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Build from raw scalar bytes.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidKeyFormat`] if the slice is not 32 bytes or the
    /// scalar is zero / not below the curve order.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(CryptoError::private(format!(
                "expected {PRIVATE_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|_| CryptoError::private("scalar is zero or exceeds the curve order"))?;
        Ok(Self { inner })
    }

    /// Parse hex (optional `0x`) or base64 key material.
    pub fn parse(input: &str) -> Result<Self, CryptoError> {
        let bytes = decode_key_material(input.trim(), PRIVATE_KEY_LEN).map_err(CryptoError::private)?;
        Self::from_slice(&bytes)
    }

    /// The matching compressed public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.inner.verifying_key().clone())
    }

    /// Lowercase hex of the raw scalar. Zeroized when dropped.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.inner.to_bytes()))
    }

    /// Sign canonical document bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Result<Signature, CryptoError> {
        self.sign_bytes(data.as_bytes())
    }

    fn sign_bytes(&self, message: &[u8]) -> Result<Signature, CryptoError> {
        let sig: EcdsaSignature = self
            .inner
            .try_sign(message)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);
        let mut raw = [0u8; SIGNATURE_LEN];
        raw.copy_from_slice(&sig.to_bytes());
        Ok(Signature(raw))
    }

    /// Borrow the underlying k256 key, for protocol code that needs
    /// prehash or recoverable signatures (chain transaction signing).
    pub fn as_signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey(<redacted>, public={})", self.public_key())
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A secp256k1 public key, always rendered in compressed SEC1 form.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parse hex (optional `0x`) or base64 of a compressed point.
    pub fn parse(input: &str) -> Result<Self, CryptoError> {
        let bytes = decode_key_material(input.trim(), PUBLIC_KEY_LEN).map_err(CryptoError::public)?;
        if bytes[0] != 0x02 && bytes[0] != 0x03 {
            return Err(CryptoError::public("not a compressed point (prefix must be 02 or 03)"));
        }
        VerifyingKey::from_sec1_bytes(&bytes)
            .map(Self)
            .map_err(|_| CryptoError::public("point is not on the secp256k1 curve"))
    }

    /// 33-byte compressed SEC1 encoding.
    pub fn to_compressed(&self) -> [u8; PUBLIC_KEY_LEN] {
        let point = self.0.to_encoded_point(true);
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// 65-byte uncompressed SEC1 encoding (`04 || x || y`).
    pub fn to_uncompressed(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Lowercase hex of the compressed point (66 chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_compressed())
    }

    /// Verify a signature over canonical document bytes.
    pub fn verify(&self, data: &CanonicalBytes, signature: &Signature) -> bool {
        self.verify_bytes(data.as_bytes(), signature)
    }

    fn verify_bytes(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(sig) = EcdsaSignature::from_slice(&signature.0) else {
            return false;
        };
        let sig = sig.normalize_s().unwrap_or(sig);
        self.0.verify(message, &sig).is_ok()
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Raw `r || s` ECDSA signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    /// Lowercase hex rendering (128 chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 128 hex characters (case-insensitive, optional `0x`).
    pub fn from_hex(input: &str) -> Result<Self, CryptoError> {
        let s = strip_hex_prefix(input.trim());
        if s.len() != SIGNATURE_LEN * 2 {
            return Err(CryptoError::MalformedSignature(format!(
                "expected {} hex characters, got {}",
                SIGNATURE_LEN * 2,
                s.len()
            )));
        }
        let mut raw = [0u8; SIGNATURE_LEN];
        hex::decode_to_slice(s, &mut raw).map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        Ok(Self(raw))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Byte-level API
// ---------------------------------------------------------------------------

/// Sign arbitrary bytes, returning the hex signature.
pub fn sign(message: &[u8], private_key: &PrivateKey) -> Result<String, CryptoError> {
    private_key.sign_bytes(message).map(|s| s.to_hex())
}

/// Verify a hex signature over `message` with a hex/base64 public key.
///
/// Returns `false` for malformed signatures or keys.
pub fn verify(message: &[u8], signature_hex: &str, public_key: &str) -> bool {
    let Ok(signature) = Signature::from_hex(signature_hex) else {
        return false;
    };
    let Ok(public_key) = PublicKey::parse(public_key) else {
        return false;
    };
    public_key.verify_bytes(message, &signature)
}

// ---------------------------------------------------------------------------
// Key material decoding
// ---------------------------------------------------------------------------

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode `expected_len` bytes from hex (tried first) or standard base64.
fn decode_key_material(input: &str, expected_len: usize) -> Result<Zeroizing<Vec<u8>>, String> {
    let unprefixed = strip_hex_prefix(input);
    if unprefixed.len() == expected_len * 2 && unprefixed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(unprefixed)
            .map(Zeroizing::new)
            .map_err(|e| e.to_string());
    }
    match BASE64.decode(input) {
        Ok(bytes) if bytes.len() == expected_len => Ok(Zeroizing::new(bytes)),
        Ok(bytes) => Err(format!(
            "base64 decoded to {} bytes, expected {expected_len}",
            bytes.len()
        )),
        Err(_) => Err(format!(
            "expected {} hex characters (optional 0x prefix) or base64 of {expected_len} bytes, got {} characters",
            expected_len * 2,
            input.len()
        )),
    }
}

//! # Canonical Serialization — JCS Byte Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes that are
//! hashed or signed anywhere in AuthentiCred.
//!
//! ## Security Invariant
//!
//! `CanonicalBytes` has a private inner field. The only ways to construct it
//! are [`CanonicalBytes::new()`], [`CanonicalBytes::from_value()`] and
//! [`canonicalize_document()`], all of which serialize through `serde_jcs`
//! (RFC 8785): object keys sorted, compact separators, UTF-8 output.
//!
//! Signature verification recomputes these bytes from the stored or
//! submitted document. Any deviation in key order or whitespace would make
//! valid signatures fail, so nothing else is allowed to produce them.
//!
//! ## The `proof` field
//!
//! [`canonicalize_document()`] drops the top-level `proof` member before
//! serializing. Both the signing input and the content hash are computed over
//! this proof-less form, so attaching or replacing a proof never changes the
//! identity of a credential.
//!
//! ## Numbers
//!
//! Floats are accepted (schema `Float` claims such as grade averages).
//! `serde_jcs` formats them with the ECMAScript shortest round-trip
//! algorithm, which is deterministic for every finite `f64`.

use serde::Serialize;
use serde_json::Value;

use crate::error::EncodingError;

/// Name of the top-level member excluded from canonical document bytes.
pub const PROOF_FIELD: &str = "proof";

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Object keys are sorted; no insignificant whitespace.
/// - Produced only through this module's constructors.
/// - Identical for semantically equal JSON values regardless of the key
///   order they were built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::Serialization`] if the value cannot be
    /// represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, EncodingError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, EncodingError> {
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// View the bytes as UTF-8 text. JCS output is always valid UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Canonicalize a credential document with its `proof` member excluded.
///
/// This is the signing input and the content-hash preimage.
///
/// # Errors
///
/// - [`EncodingError::NotAnObject`] if the document is not a JSON object.
/// - [`EncodingError::Serialization`] if the document cannot be serialized.
pub fn canonicalize_document(doc: &impl Serialize) -> Result<CanonicalBytes, EncodingError> {
    let value = serde_json::to_value(doc)?;
    match value {
        Value::Object(mut map) => {
            map.remove(PROOF_FIELD);
            CanonicalBytes::from_value(Value::Object(map))
        }
        other => Err(EncodingError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

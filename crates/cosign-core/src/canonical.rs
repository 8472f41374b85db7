//! # Canonical Serialization
//!
//! Defines `CanonicalBytes`, the only byte sequence the workspace ever
//! signs or verifies.
//!
//! Every party to a contract reconstructs the [`ContractRecord`] locally and
//! signs it. Signatures only line up across parties if the bytes are
//! identical, so the record is serialized with RFC 8785 (JSON
//! Canonicalization Scheme): sorted keys, compact separators, no
//! insignificant whitespace.
//!
//! ## Coercion rules
//!
//! 1. **Reject floats.** Quorums and versions are integers; a float in a
//!    signable value means something upstream went wrong.
//! 2. **Recurse into objects and arrays.** Nested values get the same check.
//!
//! [`ContractRecord`]: crate::ContractRecord

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// The inner vector is private; [`CanonicalBytes::new()`] is the only
/// constructor, so holding a `CanonicalBytes` proves the float check and the
/// key ordering have been applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// non-integer number, and `CanonicalizationError::SerializationFailed`
    /// if serde cannot represent the value as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// The canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(items) => items.iter().try_for_each(reject_floats),
    }
}

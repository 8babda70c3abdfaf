//! Deterministic canonicalization and fingerprinting.
//!
//! Two independently written clients (the form add-on and the web verifier)
//! must produce byte-identical fingerprints for the same logical data. The
//! canonical form is therefore defined without reference to any language's
//! default serialization order:
//!
//! 1. Object keys are ordered lexicographically, recursively.
//! 2. Array elements are canonicalized first, then ordered by their
//!    canonical JSON text. This covers arrays of primitives and arrays of
//!    objects alike, so the same set of responses in a different order
//!    yields the same fingerprint.
//! 3. The result is serialized as RFC 8785 JSON (JCS): keys compared by
//!    UTF-16 code units, ES6 number formatting, minimal escaping.
//! 4. The canonical text is hashed with SHA-256 and rendered as 64
//!    lowercase hex characters.
//!
//! Plain text skips steps 1-3 and its UTF-8 bytes are hashed directly.
//!
//! # Example
//!
//! ```rust
//! use formproof_lib::canonical::fingerprint_value;
//! use serde_json::json;
//!
//! let a = fingerprint_value(&json!({"b": 1, "a": 2})).unwrap();
//! let b = fingerprint_value(&json!({"a": 2, "b": 1})).unwrap();
//! assert_eq!(a, b);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

use crate::{NotaryError, Result};

/// Length of a hex-encoded fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// SHA-256 fingerprint of canonicalized data, as lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a hex fingerprint, normalizing to lowercase.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless the input is exactly 64 hex digits.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.len() != FINGERPRINT_HEX_LEN {
            return Err(NotaryError::validation(
                "fingerprint",
                format!(
                    "expected {} hex characters, got {}",
                    FINGERPRINT_HEX_LEN,
                    trimmed.len()
                ),
            ));
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(NotaryError::validation(
                "fingerprint",
                "not hexadecimal",
            ));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = NotaryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Input accepted by [`fingerprint`].
#[derive(Clone, Debug, PartialEq)]
pub enum CanonicalInput {
    /// Structured data, canonicalized before hashing.
    Structured(Value),
    /// Plain text, hashed as-is.
    Text(String),
}

impl CanonicalInput {
    /// Classify raw text: a JSON object or array is structured, anything
    /// else (including bare JSON scalars) is plain text.
    pub fn detect(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Self::Structured(value),
            _ => Self::Text(raw.to_string()),
        }
    }
}

/// Produce the canonical JSON text for `value`.
///
/// # Errors
///
/// Returns [`NotaryError::Canonicalization`] if the value cannot be written
/// as RFC 8785 JSON.
pub fn canonicalize(value: &Value) -> Result<String> {
    let ordered = order_value(value)?;
    to_jcs(&ordered)
}

/// Fingerprint structured data.
pub fn fingerprint_value(value: &Value) -> Result<Fingerprint> {
    let canonical = canonicalize(value)?;
    Ok(hash_bytes(canonical.as_bytes()))
}

/// Fingerprint plain text without structural canonicalization.
pub fn fingerprint_text(text: &str) -> Fingerprint {
    hash_bytes(text.as_bytes())
}

/// Fingerprint any serializable type.
///
/// # Errors
///
/// Types that serde cannot turn into a JSON value (maps with non-string
/// keys, failing `Serialize` impls) are reported as
/// [`NotaryError::Canonicalization`], never as a hashing failure.
pub fn fingerprint_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Fingerprint> {
    let value = serde_json::to_value(value)
        .map_err(|e| NotaryError::Canonicalization(e.to_string()))?;
    fingerprint_value(&value)
}

/// Fingerprint a [`CanonicalInput`].
pub fn fingerprint(input: &CanonicalInput) -> Result<Fingerprint> {
    match input {
        CanonicalInput::Structured(value) => fingerprint_value(value),
        CanonicalInput::Text(text) => Ok(fingerprint_text(text)),
    }
}

fn hash_bytes(bytes: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(bytes);
    Fingerprint::from_digest(&digest)
}

fn to_jcs(value: &Value) -> Result<String> {
    serde_json_canonicalizer::to_string(value)
        .map_err(|e| NotaryError::Canonicalization(e.to_string()))
}

/// Recursively order array elements; key order is left to the JCS writer.
fn order_value(value: &Value) -> Result<Value> {
    match value {
        Value::Object(map) => {
            let mut ordered = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                ordered.insert(key.clone(), order_value(child)?);
            }
            Ok(Value::Object(ordered))
        }
        Value::Array(items) => {
            let mut keyed = items
                .iter()
                .map(|item| {
                    let ordered = order_value(item)?;
                    let text = to_jcs(&ordered)?;
                    Ok((text, ordered))
                })
                .collect::<Result<Vec<_>>>()?;
            keyed.sort_by(|(a, _), (b, _)| utf16_cmp(a, b));
            Ok(Value::Array(keyed.into_iter().map(|(_, v)| v).collect()))
        }
        other => Ok(other.clone()),
    }
}

/// Compare strings by UTF-16 code units, the order JavaScript clients use.
fn utf16_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

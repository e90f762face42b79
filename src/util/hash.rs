//! Content digests for reports.
//!
//! Uses SHA256 over canonical JSON so that two runs over the same inputs
//! produce the same digest regardless of discovery order.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex SHA256 of raw bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex SHA256 of a value's compact JSON encoding.
///
/// Callers must only pass values with deterministic key order
/// (structs and `BTreeMap`s).
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn canonical_digest<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(sha256_hex(&bytes))
}

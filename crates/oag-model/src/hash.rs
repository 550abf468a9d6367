//! Content digests for snapshots and derived identifiers
//!
//! [`ContentHash`] is a SHA-256 digest over the canonical JSON encoding of a
//! payload. Object keys are sorted before encoding, so two structurally equal
//! payloads hash the same whatever order their maps were built in.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// SHA-256 of arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// SHA-256 of a value's canonical JSON encoding
    ///
    /// # Errors
    /// Returns error if the value cannot be represented as JSON
    pub fn compute_serializable<T>(value: &T) -> Result<Self, HashError>
    where
        T: serde::Serialize + ?Sized,
    {
        let canonical = canonicalize(serde_json::to_value(value)?);
        Ok(Self::compute(&serde_json::to_vec(&canonical)?))
    }

    /// Short form: first 16 hex chars. This is the digest recorded on snapshots.
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Payload could not be encoded for hashing
#[derive(Debug, thiserror::Error)]
#[error("serialization error: {0}")]
pub struct HashError(#[from] serde_json::Error);

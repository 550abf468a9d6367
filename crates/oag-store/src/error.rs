//! Error types for the persistence boundary

use crate::kind::ResourceKind;
use std::path::PathBuf;

/// Errors raised by [`Storage`](crate::Storage) implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No value stored under the key
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Resource kind
        kind: ResourceKind,
        /// Resource key
        id: String,
    },

    /// Key cannot be mapped to a storage location
    #[error("invalid {kind} key '{id}': {reason}")]
    InvalidKey {
        /// Resource kind
        kind: ResourceKind,
        /// Offending key
        id: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// Underlying I/O failure
    #[error("io error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create not-found error
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the key simply has no value
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

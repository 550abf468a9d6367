//! In-memory storage backend

use crate::error::StoreError;
use crate::kind::{validate_key, ResourceKind};
use crate::Storage;
use async_trait::async_trait;
use dashmap::DashMap;

/// Concurrent in-memory [`Storage`]
///
/// Values live in a `DashMap` keyed by `(kind, id)`. Used for tests and for
/// ephemeral engines.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<(ResourceKind, String), Vec<u8>>,
}

impl MemoryStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values across all kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn load(&self, kind: ResourceKind, id: &str) -> Result<Vec<u8>, StoreError> {
        validate_key(kind, id)?;
        self.entries
            .get(&(kind, id.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(kind, id))
    }

    async fn save(&self, kind: ResourceKind, id: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        validate_key(kind, id)?;
        self.entries.insert((kind, id.to_string()), bytes);
        Ok(())
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.key().1.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), StoreError> {
        validate_key(kind, id)?;
        self.entries
            .remove(&(kind, id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(kind, id))
    }
}

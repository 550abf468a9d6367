//! OAG Persistence Boundary
//!
//! The only component that touches durable storage. Everything above it sees
//! an abstract key-value interface:
//! - `load(kind, id)` → bytes or [`StoreError::NotFound`]
//! - `save(kind, id, bytes)`
//! - `list(kind)` → ids
//! - `delete(kind, id)`
//!
//! Two backends ship here: [`FileStore`] (one JSON file per key under a root
//! directory) and [`MemoryStore`] (concurrent map, for tests and ephemeral use).

#![warn(unreachable_pub)]

mod error;
mod fs;
mod kind;
mod memory;

pub use error::StoreError;
pub use fs::FileStore;
pub use kind::{validate_key, ResourceKind};
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::fmt::Debug;

/// Key-value persistence interface
///
/// Implementations must be safe to share across tasks. Keys are validated by
/// [`validate_key`]; `/` separates nested segments.
#[async_trait]
pub trait Storage: Send + Sync + Debug {
    /// Read the value stored under `(kind, id)`
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if absent, [`StoreError::Io`] on backend failure
    async fn load(&self, kind: ResourceKind, id: &str) -> Result<Vec<u8>, StoreError>;

    /// Write or replace the value under `(kind, id)`
    ///
    /// # Errors
    /// [`StoreError::Io`] on backend failure
    async fn save(&self, kind: ResourceKind, id: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// All ids stored under `kind`, sorted
    ///
    /// # Errors
    /// [`StoreError::Io`] on backend failure
    async fn list(&self, kind: ResourceKind) -> Result<Vec<String>, StoreError>;

    /// Remove the value under `(kind, id)`
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if absent, [`StoreError::Io`] on backend failure
    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), StoreError>;

    /// Whether a value exists under `(kind, id)`
    ///
    /// # Errors
    /// Propagates any failure other than not-found
    async fn exists(&self, kind: ResourceKind, id: &str) -> Result<bool, StoreError> {
        match self.load(kind, id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

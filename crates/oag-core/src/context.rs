//! Injected collaborators
//!
//! Every service receives an [`EngineContext`] at construction instead of
//! reaching for process-wide state. Tests swap in a [`ManualClock`],
//! [`SequentialIds`] and a [`MemoryStore`](oag_store::MemoryStore).

use crate::config::EngineConfig;
use crate::error::{OagError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use oag_model::ResourceType;
use oag_store::{ResourceKind, Storage};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Clock frozen at `start`
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to `instant`
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    /// Move forward by `step`
    pub fn advance(&self, step: Duration) {
        let mut now = self.now.lock();
        *now += step;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Source of fresh resource ids
pub trait IdGenerator: Send + Sync + Debug {
    /// Id for a new graph instance
    fn oag_id(&self) -> String;

    /// Id for a new version snapshot
    fn snapshot_id(&self) -> String;
}

/// UUID v4 for graph instances, `ver_<ulid>` for snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn oag_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn snapshot_id(&self) -> String {
        format!("ver_{}", ulid::Ulid::new().to_string().to_ascii_lowercase())
    }
}

/// Predictable ids: `oag-0001`, `ver_0001`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    /// Generator starting at 1
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl IdGenerator for SequentialIds {
    fn oag_id(&self) -> String {
        format!("oag-{:04}", self.bump())
    }

    fn snapshot_id(&self) -> String {
        format!("ver_{:04}", self.bump())
    }
}

/// One async mutex per versioned resource
///
/// Serializes read-modify-write sequences on a resource's stored state. An
/// entry lives only while some caller holds or waits for it.
#[derive(Debug, Default)]
pub struct ResourceLocks {
    inner: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl ResourceLocks {
    /// Wait for exclusive access to `(resource_type, resource_id)`
    pub async fn acquire(&self, resource_type: ResourceType, resource_id: &str) -> ResourceGuard<'_> {
        let key = format!("{resource_type}/{resource_id}");
        let lock = Arc::clone(self.inner.entry(key.clone()).or_default().value());
        let guard = lock.lock_owned().await;
        ResourceGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of resources currently locked or awaited
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// No resource is locked or awaited
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Exclusive access to one resource; released on drop
#[derive(Debug)]
pub struct ResourceGuard<'a> {
    locks: &'a ResourceLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // waiters hold their own clone, so only an idle entry has a count of one
        self.locks
            .inner
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Collaborators shared by every service
#[derive(Debug)]
pub struct EngineContext {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: EngineConfig,
    locks: ResourceLocks,
}

impl EngineContext {
    /// Context over `storage` with the system clock and random ids
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, config: EngineConfig) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIds),
            config,
            locks: ResourceLocks::default(),
        }
    }

    /// Context whose storage is chosen by `config`
    #[must_use]
    pub fn from_config(config: EngineConfig) -> Self {
        Self::new(config.open_storage(), config)
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the id generator
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Persistence backend
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Clock
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Id generator
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Per-resource writer locks
    #[inline]
    #[must_use]
    pub fn locks(&self) -> &ResourceLocks {
        &self.locks
    }

    /// Load and decode a stored value; `None` when absent
    pub(crate) async fn read<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        key: &str,
    ) -> Result<Option<T>> {
        let bytes = match self.storage.load(kind, key).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| OagError::serialization(format!("{kind} '{key}'"), e))
    }

    /// Encode and store a value
    pub(crate) async fn write<T: Serialize + ?Sized>(
        &self,
        kind: ResourceKind,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let encoded = if self.config.pretty_json {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        let bytes = encoded.map_err(|e| OagError::serialization(format!("{kind} '{key}'"), e))?;
        self.storage.save(kind, key, bytes).await?;
        Ok(())
    }
}

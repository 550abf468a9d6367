//! Version control for schemas and graph instances
//!
//! Each resource has an append-only [`VersionIndex`] and one stored
//! [`VersionSnapshot`] per entry. Snapshots form a tree through
//! `parentVersionId`; rollback adds a new child of the target instead of
//! rewriting history.
//!
//! # Storage keys
//! - index: `<resourceType>/<resourceId>`
//! - snapshot: `<resourceType>/<resourceId>/<versionId>`
//!
//! Every operation that rewrites the index holds the resource's writer lock
//! from the index read to the index write, so numbering stays gap-free under
//! concurrent callers.

use crate::context::EngineContext;
use crate::error::{OagError, Result};
use oag_model::{
    diff, Branch, ContentHash, ResourceType, VersionDiff, VersionIndex, VersionSnapshot,
    VersionSummary,
};
use oag_store::ResourceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Options for [`VersionControl::create_snapshot`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotOptions {
    /// Author comment
    pub comment: String,
    /// Author; `system` when absent
    pub created_by: Option<String>,
    /// Parent snapshot; the current latest when absent
    pub parent_version_id: Option<String>,
}

impl SnapshotOptions {
    /// Options with a comment
    #[must_use]
    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            ..Self::default()
        }
    }

    /// With author
    #[must_use]
    pub fn with_created_by(mut self, author: impl Into<String>) -> Self {
        self.created_by = Some(author.into());
        self
    }

    /// With explicit parent
    #[must_use]
    pub fn with_parent(mut self, version_id: impl Into<String>) -> Self {
        self.parent_version_id = Some(version_id.into());
        self
    }
}

/// Options for [`VersionControl::rollback`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollbackOptions {
    /// Appended to the generated comment
    pub comment: Option<String>,
    /// Author; `system` when absent
    pub created_by: Option<String>,
}

/// Page of history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Entries to return; the configured default when absent
    pub limit: Option<usize>,
    /// Entries to skip
    pub offset: usize,
}

/// Snapshot, history, diff and rollback for versioned resources
#[derive(Debug, Clone)]
pub struct VersionControl {
    ctx: Arc<EngineContext>,
}

fn index_key(resource_type: ResourceType, resource_id: &str) -> String {
    format!("{resource_type}/{resource_id}")
}

fn snapshot_key(resource_type: ResourceType, resource_id: &str, version_id: &str) -> String {
    format!("{resource_type}/{resource_id}/{version_id}")
}

impl VersionControl {
    /// Version control over the context's storage
    #[inline]
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Capture `data` as the resource's next version
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if an explicit parent is not in the index
    #[tracing::instrument(skip(self, data, options), fields(resource = %resource_id, kind = %resource_type))]
    pub async fn create_snapshot(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
        data: Value,
        options: SnapshotOptions,
    ) -> Result<VersionSnapshot> {
        let _guard = self.ctx.locks().acquire(resource_type, resource_id).await;
        self.append(resource_id, resource_type, data, options).await
    }

    /// Index entries, newest first
    ///
    /// # Errors
    /// [`OagError::IoFailure`] or [`OagError::Serialization`]
    pub async fn get_version_history(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
        query: HistoryQuery,
    ) -> Result<Vec<VersionSummary>> {
        let limit = query.limit.unwrap_or(self.ctx.config().history_limit);
        let index = self.load_index(resource_id, resource_type).await?;
        Ok(index.history(query.offset, limit))
    }

    /// Most recently created snapshot
    ///
    /// # Errors
    /// [`OagError::IoFailure`] or [`OagError::Serialization`]
    pub async fn latest(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
    ) -> Result<Option<VersionSummary>> {
        let index = self.load_index(resource_id, resource_type).await?;
        Ok(index.latest().cloned())
    }

    /// Full snapshot by id
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if absent
    pub async fn get_version(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
        version_id: &str,
    ) -> Result<VersionSnapshot> {
        let key = snapshot_key(resource_type, resource_id, version_id);
        self.ctx
            .read(ResourceKind::VersionSnapshot, &key)
            .await?
            .ok_or_else(|| OagError::not_found("version", version_id))
    }

    /// Re-issue the payload of `version_id` as a new snapshot
    ///
    /// The new snapshot takes the next number after the current latest and
    /// names `version_id` as its parent.
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the target is absent
    #[tracing::instrument(skip(self, options), fields(resource = %resource_id, kind = %resource_type))]
    pub async fn rollback(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
        version_id: &str,
        options: RollbackOptions,
    ) -> Result<VersionSnapshot> {
        let _guard = self.ctx.locks().acquire(resource_type, resource_id).await;
        let target = self.get_version(resource_id, resource_type, version_id).await?;

        let mut comment = format!("Rolled back to version {}", target.version);
        if let Some(extra) = options.comment.filter(|c| !c.is_empty()) {
            comment.push_str(": ");
            comment.push_str(&extra);
        }
        let options = SnapshotOptions {
            comment,
            created_by: options.created_by,
            parent_version_id: Some(version_id.to_string()),
        };
        let snapshot = self.append(resource_id, resource_type, target.data, options).await?;
        tracing::info!(from = %target.version, to = %snapshot.version, "rolled back");
        Ok(snapshot)
    }

    /// Structural difference from `version_id1` to `version_id2`
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if either snapshot is absent
    pub async fn diff(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
        version_id1: &str,
        version_id2: &str,
    ) -> Result<VersionDiff> {
        let (old, new) = futures::try_join!(
            self.get_version(resource_id, resource_type, version_id1),
            self.get_version(resource_id, resource_type, version_id2),
        )?;
        Ok(diff(&old.data, &new.data))
    }

    /// Branch heads: snapshots no other snapshot names as parent
    ///
    /// # Errors
    /// [`OagError::IoFailure`] or [`OagError::Serialization`]
    pub async fn get_branches(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
    ) -> Result<Vec<Branch>> {
        let index = self.load_index(resource_id, resource_type).await?;
        Ok(index.branches(self.ctx.config().branch_scan_limit))
    }

    /// Remove one snapshot and its index entry
    ///
    /// Remaining snapshots keep their numbers, and the removed number is never
    /// issued again.
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the snapshot is absent
    #[tracing::instrument(skip(self), fields(resource = %resource_id, kind = %resource_type))]
    pub async fn delete_version(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
        version_id: &str,
    ) -> Result<()> {
        let _guard = self.ctx.locks().acquire(resource_type, resource_id).await;
        let key = snapshot_key(resource_type, resource_id, version_id);
        if !self.ctx.storage().exists(ResourceKind::VersionSnapshot, &key).await? {
            return Err(OagError::not_found("version", version_id));
        }

        let mut index = self.load_index(resource_id, resource_type).await?;
        if index.remove(version_id).is_some() {
            self.save_index(resource_id, resource_type, &index).await?;
            tracing::debug!(remaining = index.versions.len(), "index rewritten");
        }
        self.ctx
            .storage()
            .delete(ResourceKind::VersionSnapshot, &key)
            .await
            .map_err(|e| OagError::from_store(e, || OagError::not_found("version", version_id)))?;
        tracing::info!(version_id, "snapshot deleted");
        Ok(())
    }

    /// Snapshot creation; the caller holds the resource lock
    async fn append(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
        data: Value,
        options: SnapshotOptions,
    ) -> Result<VersionSnapshot> {
        let mut index = self.load_index(resource_id, resource_type).await?;

        let parent_version_id = match options.parent_version_id {
            Some(parent) if index.get(&parent).is_none() => {
                return Err(OagError::not_found("version", parent));
            }
            Some(parent) => Some(parent),
            None => index.latest().map(|v| v.id.clone()),
        };

        let version = index
            .next_version()
            .map_err(|source| OagError::VersionExhausted {
                resource: format!("{resource_type}/{resource_id}"),
                source,
            })?;
        let hash = ContentHash::compute_serializable(&data)
            .map_err(|e| OagError::serialization("snapshot payload", e))?
            .short();
        let snapshot = VersionSnapshot {
            id: self.ctx.ids().snapshot_id(),
            resource_id: resource_id.to_string(),
            resource_type,
            version,
            data,
            hash,
            comment: options.comment,
            created_by: options.created_by.unwrap_or_else(|| "system".to_string()),
            created_at: self.ctx.clock().now(),
            parent_version_id,
        };

        let key = snapshot_key(resource_type, resource_id, &snapshot.id);
        self.ctx.write(ResourceKind::VersionSnapshot, &key, &snapshot).await?;
        index.append(snapshot.summary());
        self.save_index(resource_id, resource_type, &index).await?;

        tracing::info!(
            version_id = %snapshot.id,
            version = %snapshot.version,
            hash = %snapshot.hash,
            "snapshot created"
        );
        Ok(snapshot)
    }

    async fn load_index(&self, resource_id: &str, resource_type: ResourceType) -> Result<VersionIndex> {
        let key = index_key(resource_type, resource_id);
        Ok(self
            .ctx
            .read(ResourceKind::VersionIndex, &key)
            .await?
            .unwrap_or_default())
    }

    async fn save_index(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
        index: &VersionIndex,
    ) -> Result<()> {
        let key = index_key(resource_type, resource_id);
        self.ctx.write(ResourceKind::VersionIndex, &key, index).await
    }
}

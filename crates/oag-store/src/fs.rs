//! Filesystem storage backend
//!
//! Layout: `<root>/<kind>/<segment>/.../<last>.json`. Writes go through a
//! sibling temp file and a rename so readers never observe a torn value.

use crate::error::StoreError;
use crate::kind::{validate_key, ResourceKind};
use crate::Storage;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const EXTENSION: &str = "json";

/// Directory-backed [`Storage`]
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_seq: AtomicU64,
}

impl FileStore {
    /// Store rooted at `root`; directories are created lazily
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    fn path_for(&self, kind: ResourceKind, id: &str) -> Result<PathBuf, StoreError> {
        validate_key(kind, id)?;
        let mut path = self.kind_dir(kind);
        path.extend(id.split('/'));
        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".");
        file_name.push(EXTENSION);
        path.set_file_name(file_name);
        Ok(path)
    }
}

#[async_trait]
impl Storage for FileStore {
    async fn load(&self, kind: ResourceKind, id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(kind, id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(kind, id)),
            Err(e) => Err(StoreError::io_error(path, e)),
        }
    }

    async fn save(&self, kind: ResourceKind, id: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(kind, id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io_error(parent, e))?;
        }

        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(".tmp{}-{seq}", std::process::id()));
        let tmp = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io_error(&path, e));
        }
        tracing::trace!(kind = %kind, id, bytes = bytes.len(), "stored value");
        Ok(())
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<String>, StoreError> {
        let base = self.kind_dir(kind);
        let mut ids = Vec::new();
        let mut pending = vec![(base.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io_error(&dir, e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::io_error(&dir, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::io_error(entry.path(), e))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), format!("{prefix}{name}/")));
                } else if let Some(stem) = name.strip_suffix(".json") {
                    ids.push(format!("{prefix}{stem}"));
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(kind, id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(kind, id)),
            Err(e) => Err(StoreError::io_error(path, e)),
        }
    }
}

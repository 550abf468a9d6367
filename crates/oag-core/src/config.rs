//! Engine configuration
//!
//! Built in code with `with_*` builders or loaded from TOML. `OAG_DATA_DIR`
//! overrides the data directory.

use crate::trace::TraceRules;
use oag_store::{FileStore, MemoryStore, Storage};
use oag_validate::AcceptancePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding [`EngineConfig::data_dir`]
pub const DATA_DIR_ENV: &str = "OAG_DATA_DIR";

/// Persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file per key under `data_dir`
    #[default]
    File,
    /// Process-local map
    Memory,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`EngineConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory of the file backend
    pub data_dir: PathBuf,
    /// Persistence backend
    pub backend: Backend,
    /// Default page size of version history
    pub history_limit: usize,
    /// History entries scanned for branch heads
    pub branch_scan_limit: usize,
    /// Default page size of graph instance listings
    pub list_limit: usize,
    /// Schemas kept in the lookup cache
    pub schema_cache_capacity: u64,
    /// What imported and replaced graphs must satisfy
    pub acceptance: AcceptancePolicy,
    /// Indent stored JSON
    pub pretty_json: bool,
    /// Relation and type names used by trace analyses
    pub trace: TraceRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: Backend::File,
            history_limit: 50,
            branch_scan_limit: 1000,
            list_limit: 50,
            schema_cache_capacity: 256,
            acceptance: AcceptancePolicy::Lenient,
            pretty_json: true,
            trace: TraceRules::default(),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory configuration, for tests and scratch work
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default().with_backend(Backend::Memory)
    }

    /// Parse TOML
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed input
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] if unreadable, [`ConfigError::Parse`] if malformed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `OAG_DATA_DIR` when set
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    /// With data directory
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// With backend
    #[inline]
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// With acceptance policy
    #[inline]
    #[must_use]
    pub fn with_acceptance(mut self, acceptance: AcceptancePolicy) -> Self {
        self.acceptance = acceptance;
        self
    }

    /// With history page size
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// With listing page size
    #[inline]
    #[must_use]
    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit;
        self
    }

    /// With compact or indented JSON
    #[inline]
    #[must_use]
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }

    /// With trace rules
    #[must_use]
    pub fn with_trace_rules(mut self, rules: TraceRules) -> Self {
        self.trace = rules;
        self
    }

    /// Storage backend described by this configuration
    #[must_use]
    pub fn open_storage(&self) -> Arc<dyn Storage> {
        match self.backend {
            Backend::File => Arc::new(FileStore::new(self.data_dir.clone())),
            Backend::Memory => Arc::new(MemoryStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.branch_scan_limit, 1000);
        assert_eq!(config.acceptance, AcceptancePolicy::Lenient);
        assert!(config.pretty_json);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/oag"
            backend = "memory"
            acceptance = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/oag"));
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.acceptance, AcceptancePolicy::Strict);
        assert_eq!(config.list_limit, 50);
    }

    #[test]
    fn trace_table_overrides_named_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
            [trace]
            verified_by = "tested_by"
            critical_types = ["Release", "Recall"]
            "#,
        )
        .unwrap();
        assert_eq!(config.trace.verified_by, "tested_by");
        assert_eq!(config.trace.critical_types, ["Release", "Recall"]);
        assert_eq!(config.trace.finds, "finds");
        assert_eq!(config.trace.requirement_threshold, 3);
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(matches!(
            EngineConfig::from_toml_str(r#"backend = "s3""#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oag.toml");
        std::fs::write(&path, "history_limit = 10\n").unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().history_limit, 10);
        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}

//! OAG Core
//!
//! Stateful services of the schema-governed graph engine: stored schemas,
//! graph instances (OAGs) bound to them, and versioned history for both.
//!
//! # Core Concepts
//!
//! - [`Engine`]: facade wiring every service over one [`EngineContext`]
//! - [`SchemaRegistry`]: stored schema definitions behind a moka cache
//! - [`OagService`]: create, import, validate, export, duplicate and delete graph instances
//! - [`GraphService`]: node and edge editing, neighbor queries and search inside an instance
//! - [`TraceService`]: upstream and downstream chains, test coverage, change impact
//! - [`VersionControl`]: snapshots, history, diff, rollback and branches
//! - [`EngineConfig`]: TOML configuration with environment overrides
//! - [`Clock`] / [`IdGenerator`]: injected time and identity for deterministic tests
//!
//! # Example
//!
//! ```rust
//! use oag_core::{CreateOptions, Engine};
//! use oag_model::{EntityTypeDef, SchemaDefinition};
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let engine = Engine::in_memory();
//!     let schema = SchemaDefinition::new("1.0.0").with_entity(EntityTypeDef::new("Vehicle"));
//!     engine.schemas().put("core", &schema).await.unwrap();
//!
//!     let oag = engine
//!         .oags()
//!         .create_from_schema("core", CreateOptions::default())
//!         .await
//!         .unwrap();
//!     assert_eq!(oag.schema_id, "core");
//! });
//! ```

#![warn(unreachable_pub)]

mod config;
mod context;
mod engine;
mod error;
mod graph;
mod oag;
mod query;
mod registry;
mod templates;
mod trace;
mod versioning;

pub use config::{Backend, ConfigError, EngineConfig, DATA_DIR_ENV};
pub use context::{
    Clock, EngineContext, IdGenerator, ManualClock, RandomIds, ResourceGuard, ResourceLocks,
    SequentialIds, SystemClock,
};
pub use engine::Engine;
pub use error::{OagError, Result};
pub use graph::{GraphService, MergeSummary};
pub use oag::{
    CreateOptions, ExportFormat, ImportOutcome, ImportRequest, ListFilter, OagService,
    OagValidation,
};
pub use query::{EdgeFilter, GraphQuery, Neighbor, NodeFilter, ObjectProperties};
pub use registry::{SchemaRegistry, SchemaSummary};
pub use templates::{Template, TemplateCatalog, BUILTIN_TEMPLATES};
pub use trace::{
    ChainEntry, ChangeImpact, IssueRef, PathStep, RiskLevel, TestCoverage, TraceKind, TraceReport,
    TraceRequest, TraceRules, TraceService, Tracer, DEFAULT_TRACE_DEPTH, MAX_TRACE_DEPTH,
};
pub use versioning::{HistoryQuery, RollbackOptions, SnapshotOptions, VersionControl};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

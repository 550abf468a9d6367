//! OAG Data Model
//!
//! Schema-governed graph types shared by every other crate.
//!
//! # Core Concepts
//!
//! - [`SchemaDefinition`]: entity and relation types with their property declarations
//! - [`Node`] / [`Edge`] / [`GraphData`]: the typed graph payload
//! - [`GraphInstance`]: one graph (OAG) bound to a schema version
//! - [`VersionSnapshot`] / [`VersionIndex`]: content-hashed history per resource
//! - [`diff`]: structural comparison between two versioned payloads
//!
//! # Example
//!
//! ```rust
//! use oag_model::{EntityTypeDef, RelationTypeDef, SchemaDefinition};
//!
//! let schema = SchemaDefinition::new("1.0.0")
//!     .with_entity(EntityTypeDef::new("Vehicle"))
//!     .with_entity(EntityTypeDef::new("DomainProject"))
//!     .with_relation(RelationTypeDef::new(
//!         "has_domain_project",
//!         ["Vehicle"],
//!         ["DomainProject"],
//!     ));
//! assert!(schema.relation_type("has_domain_project").is_some());
//! ```

#![warn(unreachable_pub)]

mod diff;
mod graph;
mod hash;
mod instance;
mod schema;
mod version;

pub use diff::{diff, DiffBucket, ModifiedBucket, ModifiedEntry, Section, VersionDiff};
pub use graph::{Edge, GraphData, GraphMetadata, GraphStatistics, Node, PropertyMap};
pub use hash::{ContentHash, HashError};
pub use instance::{GraphInstance, OagStatus, OagSummary};
pub use schema::{
    EntityTypeDef, PropertyDef, PropertyType, RelationTypeDef, SchemaDefinition, TypeCode,
};
pub use version::{
    Branch, ResourceType, VersionExhausted, VersionIndex, VersionNumber, VersionParseError,
    VersionSnapshot, VersionSummary, COMPONENT_LIMIT,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

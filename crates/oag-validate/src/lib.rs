//! OAG Validation
//!
//! Conformance of graphs to schemas, and of schemas to naming rules.
//!
//! # Core Concepts
//!
//! - [`GraphValidator`]: every node and edge checked against a schema, no short-circuit
//! - [`ValidationReport`]: findings split into errors and warnings
//! - [`AcceptancePolicy`]: the caller's tolerance (`Lenient` ignores warnings)
//! - [`lint_schema`]: code, label, color and endpoint rules for schema definitions
//! - [`analyze_change`]: breaking vs non-breaking changes between two schemas
//!
//! # Example
//!
//! ```rust
//! use oag_model::{Edge, EntityTypeDef, Node, SchemaDefinition};
//! use oag_validate::{GraphValidator, IssueKind};
//!
//! let schema = SchemaDefinition::new("1.0.0").with_entity(EntityTypeDef::new("Vehicle"));
//! let nodes = vec![Node::new("VEH-1", "Vehicle")];
//! let edges = vec![Edge::new("e1", "VEH-1", "drives", "VEH-9")];
//!
//! let report = GraphValidator::new().validate(&nodes, &edges, &schema);
//! assert_eq!(report.errors_of(&IssueKind::RelationTypeUndefined).count(), 1);
//! assert_eq!(report.errors_of(&IssueKind::DanglingEdgeReference).count(), 1);
//! ```

#![warn(unreachable_pub)]

mod impact;
mod lint;
mod report;
mod validator;

pub use impact::{analyze_change, ChangeImpact, SchemaChange};
pub use lint::{
    is_valid_color, is_valid_entity_code, is_valid_property_name, is_valid_relation_code,
    lint_schema, MAX_LABEL_LEN,
};
pub use report::{AcceptancePolicy, IssueKind, Location, Severity, ValidationIssue, ValidationReport};
pub use validator::GraphValidator;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! OAG Assembly Pipeline
//!
//! Turns raw source records into a schema-conformant graph.
//!
//! # Stages
//!
//! - [`Classifier`]: record id → entity type via an ordered prefix table
//! - [`NodeAssembler`]: classified records → nodes, with every drop reported
//! - [`EdgeInference`]: foreign-key fields → edges via a fixed rule catalog
//! - [`EdgePropertySynthesizer`]: fills declared relation properties
//! - [`GraphAssembler`]: all of the above in one call
//!
//! No stage fails. Missing data degrades to skipped records, unresolved
//! edges, or default-filled properties.

#![warn(unreachable_pub)]

mod assemble;
mod classifier;
mod fields;
mod inference;
mod pipeline;
mod synthesizer;

pub use assemble::{derive_label, AssembledNodes, NodeAssembler, SkipReason, SkippedRecord};
pub use classifier::{
    Classification, Classifier, Discriminator, PrefixRule, RuleTarget, UnclassifiedReason,
    TEAM_CAPACITY, TEST_CASE,
};
pub use inference::{edge_id, Direction, EdgeInference, EdgeRule, InferredEdges, DEFAULT_RULES};
pub use pipeline::{AssembledGraph, GraphAssembler};
pub use synthesizer::{
    AuthoritativeEdge, AuthoritativeEdges, EdgePropertySynthesizer, PropertyRule,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Schema change impact
//!
//! Compares two schema definitions and classifies each change as breaking or
//! non-breaking. With a graph at hand it also counts the nodes whose type lost
//! its definition or one of its properties.

use oag_model::{GraphData, SchemaDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One classified schema change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SchemaChange {
    /// Entity type no longer declared
    EntityRemoved {
        /// Type code
        code: String,
    },
    /// Entity type newly declared
    EntityAdded {
        /// Type code
        code: String,
    },
    /// Property no longer declared on a surviving entity type
    PropertyRemoved {
        /// Owning type code
        entity: String,
        /// Property name
        property: String,
    },
    /// Property newly declared on a surviving entity type
    PropertyAdded {
        /// Owning type code
        entity: String,
        /// Property name
        property: String,
    },
    /// Relation type no longer declared
    RelationRemoved {
        /// Relation code
        code: String,
    },
    /// Relation type newly declared
    RelationAdded {
        /// Relation code
        code: String,
    },
}

impl SchemaChange {
    /// Whether existing graphs may stop conforming
    #[must_use]
    pub fn is_breaking(&self) -> bool {
        matches!(
            self,
            Self::EntityRemoved { .. } | Self::PropertyRemoved { .. } | Self::RelationRemoved { .. }
        )
    }
}

/// Result of [`analyze_change`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeImpact {
    /// Removals
    pub breaking: Vec<SchemaChange>,
    /// Additions
    pub non_breaking: Vec<SchemaChange>,
    /// Graph nodes whose type lost a definition or property
    pub affected_nodes: usize,
}

impl ChangeImpact {
    /// No breaking changes
    #[inline]
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.breaking.is_empty()
    }
}

/// Classify the changes from `old` to `new`
///
/// Changes are listed in the declaration order of the schema they come from.
#[must_use]
pub fn analyze_change(
    old: &SchemaDefinition,
    new: &SchemaDefinition,
    graph: Option<&GraphData>,
) -> ChangeImpact {
    let mut impact = ChangeImpact::default();
    let mut degraded: HashSet<&str> = HashSet::new();

    for code in old.entity_types.keys() {
        if !new.entity_types.contains_key(code) {
            degraded.insert(code.as_str());
            impact.breaking.push(SchemaChange::EntityRemoved { code: code.clone() });
        }
    }
    for (code, def) in &new.entity_types {
        let Some(prior) = old.entity_types.get(code) else {
            impact.non_breaking.push(SchemaChange::EntityAdded { code: code.clone() });
            continue;
        };
        for property in prior.properties.keys() {
            if !def.properties.contains_key(property) {
                degraded.insert(code.as_str());
                impact.breaking.push(SchemaChange::PropertyRemoved {
                    entity: code.clone(),
                    property: property.clone(),
                });
            }
        }
        for property in def.properties.keys() {
            if !prior.properties.contains_key(property) {
                impact.non_breaking.push(SchemaChange::PropertyAdded {
                    entity: code.clone(),
                    property: property.clone(),
                });
            }
        }
    }

    for code in old.relation_types.keys() {
        if !new.relation_types.contains_key(code) {
            impact.breaking.push(SchemaChange::RelationRemoved { code: code.clone() });
        }
    }
    for code in new.relation_types.keys() {
        if !old.relation_types.contains_key(code) {
            impact.non_breaking.push(SchemaChange::RelationAdded { code: code.clone() });
        }
    }

    if let Some(graph) = graph {
        impact.affected_nodes = graph
            .nodes
            .iter()
            .filter(|n| degraded.contains(n.node_type.as_str()))
            .count();
    }

    tracing::debug!(
        breaking = impact.breaking.len(),
        non_breaking = impact.non_breaking.len(),
        affected_nodes = impact.affected_nodes,
        "schema change analyzed"
    );
    impact
}

//! Graph conformance against a schema
//!
//! The validator never short-circuits: it scans every node and every edge and
//! returns the complete error and warning lists.
//!
//! # Checks
//! 1. Nodes: id present and unique, type present and declared (errors); label
//!    present and required properties filled (warnings)
//! 2. Edges: id, source, target, type present; type declared; endpoints exist (errors)
//! 3. Endpoint types within the relation's `from`/`to` (warnings only)

use crate::report::{IssueKind, Location, ValidationReport};
use oag_model::{Edge, GraphData, Node, SchemaDefinition};
use std::collections::HashMap;

/// Stateless graph validator
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphValidator;

impl GraphValidator {
    /// Create new validator instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate a graph payload
    #[must_use]
    pub fn validate_graph(&self, graph: &GraphData, schema: &SchemaDefinition) -> ValidationReport {
        self.validate(&graph.nodes, &graph.edges, schema)
    }

    /// Validate nodes and edges against `schema`
    #[must_use]
    pub fn validate(&self, nodes: &[Node], edges: &[Edge], schema: &SchemaDefinition) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut by_id: HashMap<&str, &Node> = HashMap::with_capacity(nodes.len());

        for (index, node) in nodes.iter().enumerate() {
            Self::check_node(index, node, schema, &mut by_id, &mut report);
        }
        for (index, edge) in edges.iter().enumerate() {
            Self::check_edge(index, edge, schema, &by_id, &mut report);
        }

        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "graph validated"
        );
        report
    }

    fn check_node<'a>(
        index: usize,
        node: &'a Node,
        schema: &SchemaDefinition,
        by_id: &mut HashMap<&'a str, &'a Node>,
        report: &mut ValidationReport,
    ) {
        let at = || Location::Node {
            index,
            id: (!node.id.is_empty()).then(|| node.id.clone()),
        };
        let name = if node.id.is_empty() {
            format!("node at index {index}")
        } else {
            format!("node {}", node.id)
        };

        if node.id.is_empty() {
            report.error(IssueKind::MissingField, at(), format!("{name} missing id"));
        } else if by_id.insert(node.id.as_str(), node).is_some() {
            report.error(IssueKind::DuplicateId, at(), format!("{name} duplicates an earlier node id"));
        }

        let entity = if node.node_type.is_empty() {
            report.error(IssueKind::MissingField, at(), format!("{name} missing type"));
            None
        } else if let Some(entity) = schema.entity_type(&node.node_type) {
            Some(entity)
        } else {
            report.error(
                IssueKind::EntityTypeUndefined,
                at(),
                format!("{name} has type {} not defined in schema", node.node_type),
            );
            None
        };

        if node.label.is_empty() {
            report.warning(IssueKind::MissingField, at(), format!("{name} missing label"));
        }

        if let Some(entity) = entity {
            for (prop, def) in &entity.properties {
                if def.required && node.field(prop).is_none() {
                    report.warning(
                        IssueKind::RequiredFieldMissing,
                        at(),
                        format!("{name} missing required property {prop}"),
                    );
                }
            }
        }
    }

    fn check_edge(
        index: usize,
        edge: &Edge,
        schema: &SchemaDefinition,
        by_id: &HashMap<&str, &Node>,
        report: &mut ValidationReport,
    ) {
        let at = || Location::Edge {
            index,
            id: (!edge.id.is_empty()).then(|| edge.id.clone()),
        };
        let name = if edge.id.is_empty() {
            format!("edge at index {index}")
        } else {
            format!("edge {}", edge.id)
        };

        if edge.id.is_empty() {
            report.error(IssueKind::MissingField, at(), format!("{name} missing id"));
        }
        for (field, value) in [("source", &edge.source), ("target", &edge.target)] {
            if value.is_empty() {
                report.error(IssueKind::MissingField, at(), format!("{name} missing {field}"));
            }
        }

        let relation = if edge.edge_type.is_empty() {
            report.error(IssueKind::MissingField, at(), format!("{name} missing type"));
            None
        } else if let Some(relation) = schema.relation_type(&edge.edge_type) {
            Some(relation)
        } else {
            report.error(
                IssueKind::RelationTypeUndefined,
                at(),
                format!("{name} has type {} not defined in schema", edge.edge_type),
            );
            None
        };

        let mut resolve = |field: &str, id: &str| -> Option<&Node> {
            if id.is_empty() {
                return None;
            }
            let found = by_id.get(id).copied();
            if found.is_none() {
                report.error(
                    IssueKind::DanglingEdgeReference,
                    at(),
                    format!("{name} {field} node {id} not found"),
                );
            }
            found
        };
        let source = resolve("source", &edge.source);
        let target = resolve("target", &edge.target);

        if let (Some(source), Some(target), Some(relation)) = (source, target, relation) {
            if !relation.allows_source(&source.node_type) {
                report.warning(
                    IssueKind::TypeConstraintViolation,
                    at(),
                    format!(
                        "{name} ({}): source type {} not in [{}]",
                        edge.edge_type,
                        source.node_type,
                        relation.from.join(", ")
                    ),
                );
            }
            if !relation.allows_target(&target.node_type) {
                report.warning(
                    IssueKind::TypeConstraintViolation,
                    at(),
                    format!(
                        "{name} ({}): target type {} not in [{}]",
                        edge.edge_type,
                        target.node_type,
                        relation.to.join(", ")
                    ),
                );
            }
        }
    }
}

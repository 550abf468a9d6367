//! Scenario Plan: schema conformance and schema hygiene
//!
//! Story:
//! - Graphs arrive from imports, hand edits and older schema versions.
//! - The validator must report every problem in one pass, classify each as
//!   an error or a warning, and never invent findings for clean data.
//! - Schema authors get the same treatment for their definitions: lint for
//!   naming and endpoint rules, impact analysis before replacing a schema.

use oag_model::{Edge, EntityTypeDef, GraphData, Node, RelationTypeDef, SchemaDefinition};
use oag_test_utils::{sample_graph, vehicle_schema};
use oag_validate::{
    analyze_change, lint_schema, AcceptancePolicy, GraphValidator, IssueKind, Location,
    SchemaChange,
};
use proptest::prelude::*;

fn named(id: &str, node_type: &str) -> Node {
    let data = serde_json::json!({ "name": id });
    Node::new(id, node_type).with_data(data.as_object().cloned().unwrap_or_default())
}

proptest! {
    /// Tenet: exactly one EntityTypeUndefined error per node of an undeclared type.
    #[test]
    fn undefined_types_are_counted_exactly(kinds in proptest::collection::vec(any::<bool>(), 0..40)) {
        let nodes: Vec<Node> = kinds
            .iter()
            .enumerate()
            .map(|(i, declared)| {
                let node_type = if *declared { "Vehicle" } else { "Spaceship" };
                named(&format!("N-{i}"), node_type)
            })
            .collect();
        let report = GraphValidator::new().validate(&nodes, &[], &vehicle_schema());

        let undeclared = kinds.iter().filter(|d| !**d).count();
        prop_assert_eq!(report.errors_of(&IssueKind::EntityTypeUndefined).count(), undeclared);
        prop_assert_eq!(report.errors.len(), undeclared);
    }

    /// Tenet: exactly one DanglingEdgeReference error per missing endpoint.
    #[test]
    fn dangling_endpoints_are_counted_exactly(
        endpoints in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..30)
    ) {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut missing = 0;
        for (i, (source_exists, target_exists)) in endpoints.iter().enumerate() {
            let source = format!("VEH-{i}");
            let target = format!("DP-{i}");
            if *source_exists {
                nodes.push(named(&source, "Vehicle"));
            } else {
                missing += 1;
            }
            if *target_exists {
                nodes.push(named(&target, "DomainProject"));
            } else {
                missing += 1;
            }
            edges.push(Edge::new(format!("e{i}"), source, "has_domain_project", target));
        }
        let report = GraphValidator::new().validate(&nodes, &edges, &vehicle_schema());

        prop_assert_eq!(report.errors_of(&IssueKind::DanglingEdgeReference).count(), missing);
        prop_assert_eq!(report.errors.len(), missing);
    }
}

/// Tenet: the reference graph is valid against the reference schema.
#[test]
fn sample_graph_is_valid() {
    let report = GraphValidator::new().validate_graph(&sample_graph(), &vehicle_schema());
    assert!(report.is_valid(), "{report:?}");
}

/// Tenet: validation does not stop at the first problem.
///
/// A single pass reports node and edge problems together, and endpoint type
/// mismatches stay warnings that only the strict policy refuses.
#[test]
fn findings_accumulate_across_nodes_and_edges() {
    let graph = GraphData::new(
        vec![
            named("VEH-1", "Vehicle"),
            named("VEH-2", "Vehicle"),
            named("X-1", "Spaceship"),
        ],
        vec![
            Edge::new("e1", "VEH-1", "has_domain_project", "VEH-2"),
            Edge::new("e2", "VEH-1", "teleports_to", "X-1"),
            Edge::new("e3", "VEH-1", "has_domain_project", "DP-404"),
        ],
    );
    let report = GraphValidator::new().validate_graph(&graph, &vehicle_schema());

    assert_eq!(report.errors_of(&IssueKind::EntityTypeUndefined).count(), 1);
    assert_eq!(report.errors_of(&IssueKind::RelationTypeUndefined).count(), 1);
    assert_eq!(report.errors_of(&IssueKind::DanglingEdgeReference).count(), 1);

    let mismatch = report
        .warnings_of(&IssueKind::TypeConstraintViolation)
        .next()
        .unwrap();
    assert_eq!(mismatch.location, Location::Edge { index: 0, id: Some("e1".to_string()) });
    assert!(!report.accepts(AcceptancePolicy::Lenient));
}

/// Tenet: endpoint mismatches alone are accepted leniently and refused strictly.
#[test]
fn policy_decides_on_warnings() {
    let graph = GraphData::new(
        vec![named("VEH-1", "Vehicle"), named("VEH-2", "Vehicle")],
        vec![Edge::new("e1", "VEH-1", "has_domain_project", "VEH-2")],
    );
    let report = GraphValidator::new().validate_graph(&graph, &vehicle_schema());
    assert!(report.is_valid());
    assert!(report.accepts(AcceptancePolicy::Lenient));
    assert!(!report.accepts(AcceptancePolicy::Strict));
}

/// Tenet: the reference schema lints clean, and broken codes are caught.
#[test]
fn lint_reference_and_broken_schemas() {
    assert!(lint_schema(&vehicle_schema()).is_valid());

    let broken = SchemaDefinition::new("1.0.0")
        .with_entity(EntityTypeDef::new("vehicle"))
        .with_relation(RelationTypeDef::new("HasPart", ["vehicle"], ["Wheel"]));
    let report = lint_schema(&broken);
    assert!(!report.is_valid());
    assert_eq!(report.errors_of(&IssueKind::UndefinedEndpoint).count(), 1);
}

/// Tenet: removing a type used by the graph is breaking and counts affected nodes.
#[test]
fn impact_of_removing_a_used_type() {
    let old = vehicle_schema();
    let mut new = vehicle_schema();
    new.entity_types.shift_remove("DomainProject");

    let impact = analyze_change(&old, &new, Some(&sample_graph()));
    assert!(!impact.is_compatible());
    assert!(impact
        .breaking
        .iter()
        .any(|c| matches!(c, SchemaChange::EntityRemoved { code } if code == "DomainProject")));
    assert_eq!(impact.affected_nodes, 1);
}

//! Scenario Plan: requirement traceability
//!
//! Story:
//! - A vehicle project breaks features down into software requirements, which
//!   are implemented by modules and shipped in release packages.
//! - Requirements are verified by test cases; failing cases raise issues.
//! - Before changing a requirement, the team traces what it came from, what
//!   depends on it, how well it is tested and who must be told.
//!
//! Dimensions covered:
//! - Chains: direction, depth limits, confidence, ordering
//! - Coverage and change impact over the stored instance
//! - Root paths with several origins
//! - Configuration: relation and type names come from the engine config
//! - Errors: depth range, unknown entities and instances, per-item batches

use oag_core::{
    CreateOptions, Engine, EngineConfig, EngineContext, ManualClock, OagError, RiskLevel,
    SequentialIds, TraceKind, TraceRequest, TraceRules,
};
use oag_model::{Edge, EntityTypeDef, GraphData, Node, RelationTypeDef, SchemaDefinition};
use oag_store::MemoryStore;
use oag_test_utils::{fixed_now, record};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

const SCHEMA_ID: &str = "trace-schema";

fn schema() -> SchemaDefinition {
    [
        "VehicleProject",
        "Feature",
        "SWR",
        "PerceptionFusion",
        "ReleasePackage",
        "TestCase",
        "Issue",
    ]
    .into_iter()
    .fold(SchemaDefinition::new("1.0.0"), |s, code| s.with_entity(EntityTypeDef::new(code)))
    .with_relation(RelationTypeDef::new("has_feature", ["VehicleProject"], ["Feature"]))
    .with_relation(RelationTypeDef::new("refined_to", ["Feature"], ["SWR"]))
    .with_relation(RelationTypeDef::new("implemented_by", ["SWR"], ["PerceptionFusion"]))
    .with_relation(RelationTypeDef::new("released_in", ["PerceptionFusion"], ["ReleasePackage"]))
    .with_relation(RelationTypeDef::new("verified_by", ["SWR"], ["TestCase"]))
    .with_relation(RelationTypeDef::new("finds", ["TestCase"], ["Issue"]))
}

fn node(id: &str, node_type: &str, data: Value) -> Node {
    Node::new(id, node_type).with_data(record(data))
}

fn edge(source: &str, relation: &str, target: &str, data: Value) -> Edge {
    Edge::new(format!("{source}-{target}"), source, relation, target).with_data(record(data))
}

fn program() -> GraphData {
    GraphData::new(
        vec![
            node("VP-1", "VehicleProject", json!({"project_name": "Sedan 2027"})),
            node("FEAT-1", "Feature", json!({"title": "Lane keeping", "owner": "alice"})),
            node("FEAT-2", "Feature", json!({"title": "Lane centering"})),
            node("SWR-1", "SWR", json!({"owner": "bob", "estimated_hours": 10})),
            node("MOD-1", "PerceptionFusion", json!({"PM": "carol", "estimated_hours": 30})),
            node("PKG-1", "ReleasePackage", json!({"owner": "dave"})),
            node("TC-1", "TestCase", json!({"status": "PASSED"})),
            node("TC-2", "TestCase", json!({"status": "FAILED"})),
            node("TC-3", "TestCase", json!({"status": "BLOCKED"})),
            node(
                "ISS-1",
                "Issue",
                json!({"severity": "major", "status": "open", "description": "drifts at 120 km/h"}),
            ),
        ],
        vec![
            edge("VP-1", "has_feature", "FEAT-1", json!({})),
            edge("VP-1", "has_feature", "FEAT-2", json!({})),
            edge("FEAT-1", "refined_to", "SWR-1", json!({"confidence": 0.9})),
            edge("FEAT-2", "refined_to", "SWR-1", json!({})),
            edge("SWR-1", "implemented_by", "MOD-1", json!({})),
            edge("MOD-1", "released_in", "PKG-1", json!({})),
            edge("SWR-1", "verified_by", "TC-1", json!({})),
            edge("SWR-1", "verified_by", "TC-2", json!({})),
            edge("SWR-1", "verified_by", "TC-3", json!({})),
            edge("TC-2", "finds", "ISS-1", json!({})),
        ],
    )
}

async fn traced_engine(config: EngineConfig) -> (Engine, String) {
    let ctx = EngineContext::new(Arc::new(MemoryStore::new()), config)
        .with_clock(Arc::new(ManualClock::new(fixed_now())))
        .with_ids(Arc::new(SequentialIds::new()));
    let engine = Engine::new(ctx);
    engine.schemas().put(SCHEMA_ID, &schema()).await.unwrap();
    let oag = engine
        .oags()
        .create_from_schema(SCHEMA_ID, CreateOptions::named("Lane keeping program"))
        .await
        .unwrap();
    let (_, report) = engine.oags().replace_graph(&oag.id, program()).await.unwrap();
    assert!(report.is_valid(), "{report:?}");
    (engine, oag.id)
}

/// Tenet: a full trace shows where a requirement came from, what it feeds and how it is tested.
#[tokio::test]
async fn full_trace_of_a_requirement() {
    let (engine, oag) = traced_engine(EngineConfig::in_memory()).await;
    let report = engine
        .traces()
        .trace(&oag, "SWR-1", TraceKind::FullTrace, 3)
        .await
        .unwrap();

    assert_eq!(report.query_entity.id, "SWR-1");
    assert_eq!(report.timestamp, fixed_now());

    let upstream = report.upstream_chain.unwrap();
    let up: Vec<_> = upstream.iter().map(|e| (e.level, e.entity_id.as_str())).collect();
    assert_eq!(up, [(1, "FEAT-1"), (1, "FEAT-2"), (2, "VP-1"), (2, "VP-1")]);
    assert_eq!(upstream[0].trace_confidence, 0.9);
    assert_eq!(upstream[0].relation, "refined_to");

    let downstream = report.downstream_chain.unwrap();
    assert!(downstream.iter().all(|e| e.level <= 3));
    assert!(downstream.iter().any(|e| e.entity_id == "PKG-1" && e.level == 2));
    assert!(downstream.iter().any(|e| e.entity_id == "ISS-1" && e.level == 2));

    let coverage = report.test_coverage.unwrap();
    assert_eq!((coverage.total_test_cases, coverage.passed, coverage.failed), (3, 1, 1));
    assert_eq!(coverage.issues.len(), 1);
    assert_eq!(coverage.issues[0].description, Some(json!("drifts at 120 km/h")));
    assert!(report.change_impact.is_none());
}

/// Tenet: changing a feature that reaches a release package is high risk and names its owners.
#[tokio::test]
async fn impact_analysis_of_a_feature() {
    let (engine, oag) = traced_engine(EngineConfig::in_memory()).await;
    let report = engine
        .traces()
        .trace(&oag, "FEAT-1", TraceKind::ImpactAnalysis, 1)
        .await
        .unwrap();

    assert_eq!(report.downstream_chain.map(|c| c.len()), Some(1));
    let impact = report.change_impact.unwrap();
    assert_eq!(impact.risk_level, RiskLevel::High);
    assert_eq!(impact.affected_entities["ReleasePackage"], ["PKG-1"]);
    assert_eq!(impact.notified_owners, ["bob", "carol", "dave"]);
    assert_eq!(impact.estimated_effort_hours, 40.0);
    assert_eq!(impact.impact_score, 7);
}

/// Tenet: every root path to an entity is listed, root first.
#[tokio::test]
async fn paths_from_every_origin() {
    let (engine, oag) = traced_engine(EngineConfig::in_memory()).await;
    let paths = engine.traces().full_paths(&oag, "MOD-1").await.unwrap();
    let ids: Vec<Vec<&str>> = paths
        .iter()
        .map(|p| p.iter().map(|s| s.id.as_str()).collect())
        .collect();
    assert_eq!(
        ids,
        [
            vec!["VP-1", "FEAT-1", "SWR-1", "MOD-1"],
            vec!["VP-1", "FEAT-2", "SWR-1", "MOD-1"],
        ]
    );
    assert_eq!(paths[0][0].label, "Sedan 2027");
    assert_eq!(paths[0][1].label, "Lane keeping");
}

/// Tenet: deployments rename the relations and types the analyses key on.
#[tokio::test]
async fn rules_come_from_configuration() {
    let rules = TraceRules {
        critical_types: Vec::new(),
        requirement_types: vec!["SWR".into()],
        requirement_threshold: 0,
        passed_statuses: vec!["BLOCKED".into()],
        ..TraceRules::default()
    };
    let (engine, oag) = traced_engine(EngineConfig::in_memory().with_trace_rules(rules)).await;

    let coverage = engine.traces().coverage(&oag, "SWR-1").await.unwrap();
    assert_eq!(coverage.passed, 1);
    assert_eq!(coverage.failed, 1);

    let report = engine
        .traces()
        .trace(&oag, "FEAT-1", TraceKind::ImpactAnalysis, 3)
        .await
        .unwrap();
    assert_eq!(report.change_impact.unwrap().risk_level, RiskLevel::Medium);
}

/// Tenet: bad requests fail alone and name their cause.
#[tokio::test]
async fn errors_are_specific() {
    let (engine, oag) = traced_engine(EngineConfig::in_memory()).await;
    let traces = engine.traces();

    let err = traces.trace(&oag, "SWR-1", TraceKind::FullTrace, 6).await.unwrap_err();
    assert!(matches!(err, OagError::InvalidArgument(_)));
    let err = traces.trace("oag-9999", "SWR-1", TraceKind::FullTrace, 3).await.unwrap_err();
    assert!(matches!(err, OagError::ResourceNotFound { kind: "oag", .. }));
    let err = traces.coverage(&oag, "SWR-9").await.unwrap_err();
    assert!(matches!(err, OagError::ResourceNotFound { kind: "node", .. }));

    let requests: Vec<TraceRequest> = serde_json::from_value(json!([
        {"entityId": "SWR-1", "queryType": "downstream_tasks", "depth": 1},
        {"entityId": "SWR-9"},
        {"entityId": "FEAT-1", "depth": 0},
    ]))
    .unwrap();
    let results = traces.trace_batch(&oag, &requests).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().downstream_chain.as_ref().map(Vec::len), Some(4));
    assert!(results[1].as_ref().unwrap_err().is_not_found());
    assert!(matches!(results[2], Err(OagError::InvalidArgument(_))));
}

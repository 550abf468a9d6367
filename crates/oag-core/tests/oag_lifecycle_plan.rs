//! Scenario Plan: graph instance lifecycle
//!
//! Story:
//! - A program office registers its domain schema, spins up instances from
//!   templates and imports record dumps from the planning system.
//! - Instances are listed, patched, validated, exported for downstream tools
//!   and eventually deleted.
//! - A stricter deployment refuses imports that carry any warning.
//!
//! Dimensions covered:
//! - Creation: defaults derived from the schema, templates, batches
//! - Import: assembly, validation and the acceptance policy
//! - Maintenance: listing order and filters, patches, exports, deletion

use chrono::Duration;
use oag_core::{
    CreateOptions, Engine, EngineConfig, EngineContext, ExportFormat, ImportRequest, ListFilter,
    OagError,
};
use oag_model::{GraphInstance, OagStatus};
use oag_store::MemoryStore;
use oag_test_utils::{records, seeded_engine, vehicle_records, vehicle_schema, CORE_SCHEMA_ID};
use oag_validate::AcceptancePolicy;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

/// Tenet: an import stores the assembled graph and reports on it.
#[tokio::test]
async fn import_stores_assembled_graph() {
    let (engine, _clock) = seeded_engine().await;
    let outcome = engine
        .oags()
        .import_graph(
            CORE_SCHEMA_ID,
            ImportRequest {
                records: vehicle_records(),
                options: CreateOptions::named("Sedan import"),
                ..ImportRequest::default()
            },
        )
        .await
        .unwrap();

    assert!(outcome.report.is_clean(), "{:?}", outcome.report);
    assert!(outcome.skipped.is_empty());
    assert!(outcome.unresolved.is_empty());

    let stored = engine.oags().get_oag(&outcome.instance.id).await.unwrap();
    assert_eq!(stored, outcome.instance);
    assert_eq!(stored.name, "Sedan import");
    assert_eq!(stored.schema_version, "2.0.0");
    assert_eq!(stored.data.nodes.len(), 2);
    assert_eq!(stored.data.edges.len(), 1);
    assert_eq!(stored.data.edges[0].data["createdAt"], json!("2024-03-15"));

    let stats = engine.oags().statistics(&stored.id).await.unwrap();
    assert_eq!(stats.node_count, 2);
    assert_eq!(stats.edge_count, 1);

    let validation = engine.oags().validate_oag(&stored.id).await.unwrap();
    assert!(validation.is_valid());
    assert_eq!(validation.schema_id, CORE_SCHEMA_ID);
}

/// Tenet: warnings pass a lenient deployment and stop a strict one.
#[tokio::test]
async fn strict_policy_refuses_warnings() {
    // VEH-2 lacks the required `name`
    let batch = records([json!({"id": "VEH-2", "vin": "X"})]);

    let (lenient, _clock) = seeded_engine().await;
    let outcome = lenient
        .oags()
        .import_graph(
            CORE_SCHEMA_ID,
            ImportRequest {
                records: batch.clone(),
                ..ImportRequest::default()
            },
        )
        .await
        .unwrap();
    assert!(outcome.report.is_valid());
    assert!(!outcome.report.is_clean());

    let strict = Engine::new(EngineContext::new(
        Arc::new(MemoryStore::new()),
        EngineConfig::in_memory().with_acceptance(AcceptancePolicy::Strict),
    ));
    strict.schemas().put(CORE_SCHEMA_ID, &vehicle_schema()).await.unwrap();
    let err = strict
        .oags()
        .import_graph(
            CORE_SCHEMA_ID,
            ImportRequest {
                records: batch,
                ..ImportRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OagError::RequiredFieldMissing(_)), "{err:?}");
    assert!(strict.oags().list_oags(&ListFilter::default()).await.unwrap().is_empty());
}

/// Tenet: defaults come from the schema, templates override them.
#[tokio::test]
async fn creation_defaults_and_templates() {
    let (engine, _clock) = seeded_engine().await;
    let plain = engine
        .oags()
        .create_from_schema(CORE_SCHEMA_ID, CreateOptions::default())
        .await
        .unwrap();
    assert_eq!(plain.name, "Core Domain Instance");
    assert_eq!(plain.description, format!("Instance created from {CORE_SCHEMA_ID}"));
    assert_eq!(plain.created_by, "system");
    assert_eq!(plain.entity_types, vehicle_schema().entity_codes());
    assert!(plain.data.nodes.is_empty());

    let templated = engine
        .oags()
        .generate_from_template("vehicle-development", CreateOptions::default())
        .await
        .unwrap();
    assert_eq!(templated.name, "Vehicle Development OAG");
    assert_eq!(templated.description, "Standard vehicle development ontology");
    assert_eq!(templated.schema_id, CORE_SCHEMA_ID);

    let renamed = engine
        .oags()
        .generate_from_template("vehicle-development", CreateOptions::named("Mine"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Mine");

    let unbacked = engine
        .oags()
        .generate_from_template("adas-project", CreateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(unbacked, OagError::SchemaNotFound(ref id) if id == "adas-schema-v2"));

    let unknown = engine
        .oags()
        .generate_from_template("spaceship", CreateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(unknown, OagError::TemplateNotFound(_)));
}

/// Tenet: batch failures stay per item.
#[tokio::test]
async fn batch_instantiation_reports_each_item() {
    let (engine, _clock) = seeded_engine().await;
    let made = engine
        .oags()
        .batch_instantiate(
            CORE_SCHEMA_ID,
            vec![CreateOptions::named("a"), CreateOptions::named("b")],
        )
        .await;
    assert_eq!(made.len(), 2);
    assert!(made.iter().all(Result::is_ok));

    let failed = engine
        .oags()
        .batch_instantiate("missing", vec![CreateOptions::named("c")])
        .await;
    assert!(matches!(failed.as_slice(), [Err(OagError::SchemaNotFound(_))]));
}

/// Tenet: listings are newest first and honor filters and paging.
#[tokio::test]
async fn listing_order_and_filters() {
    let (engine, clock) = seeded_engine().await;
    let mut created = Vec::new();
    for (name, status) in [
        ("first", OagStatus::Active),
        ("second", OagStatus::Draft),
        ("third", OagStatus::Active),
    ] {
        clock.advance(Duration::minutes(1));
        let instance = engine
            .oags()
            .create_from_schema(CORE_SCHEMA_ID, CreateOptions::named(name).with_status(status))
            .await
            .unwrap();
        created.push(instance.id);
    }

    let names = |list: Vec<oag_model::OagSummary>| list.into_iter().map(|s| s.name).collect::<Vec<_>>();
    let all = engine.oags().list_oags(&ListFilter::default()).await.unwrap();
    assert_eq!(names(all), ["third", "second", "first"]);

    let active = engine
        .oags()
        .list_oags(&ListFilter {
            status: Some(OagStatus::Active),
            ..ListFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(names(active), ["third", "first"]);

    let page = engine
        .oags()
        .list_oags(&ListFilter {
            limit: Some(1),
            offset: 1,
            ..ListFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(names(page), ["second"]);

    let elsewhere = engine
        .oags()
        .list_oags(&ListFilter {
            schema_id: Some("other".to_string()),
            ..ListFilter::default()
        })
        .await
        .unwrap();
    assert!(elsewhere.is_empty());
}

/// Tenet: patches merge shallowly and never touch identity or creation time.
#[tokio::test]
async fn update_preserves_identity() {
    let (engine, clock) = seeded_engine().await;
    let original = engine
        .oags()
        .create_from_schema(CORE_SCHEMA_ID, CreateOptions::default())
        .await
        .unwrap();

    clock.advance(Duration::hours(2));
    let patch = records([json!({
        "id": "hijacked",
        "createdAt": "1999-01-01T00:00:00Z",
        "name": "Renamed",
        "status": "archived",
    })])
    .remove(0);
    let updated = engine.oags().update_oag(&original.id, patch).await.unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(updated.updated_at, original.created_at + Duration::hours(2));
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.status, OagStatus::Archived);
    assert_eq!(engine.oags().get_oag(&original.id).await.unwrap(), updated);

    let malformed = records([json!({"status": "exploded"})]).remove(0);
    let err = engine.oags().update_oag(&original.id, malformed).await.unwrap_err();
    assert!(matches!(err, OagError::Serialization { .. }));
}

/// Tenet: exports parse back to the stored instance in every supported format.
#[tokio::test]
async fn exports_round_trip() {
    let (engine, _clock) = seeded_engine().await;
    let outcome = engine
        .oags()
        .import_graph(
            CORE_SCHEMA_ID,
            ImportRequest {
                records: vehicle_records(),
                ..ImportRequest::default()
            },
        )
        .await
        .unwrap();
    let id = outcome.instance.id;

    let json_text = engine.oags().export_oag(&id, ExportFormat::Json).await.unwrap();
    let from_json: GraphInstance = serde_json::from_str(&json_text).unwrap();
    assert_eq!(from_json.data.statistics().node_count, 2);

    let format: ExportFormat = "YML".parse().unwrap();
    let yaml_text = engine.oags().export_oag(&id, format).await.unwrap();
    let from_yaml: GraphInstance = serde_yaml::from_str(&yaml_text).unwrap();
    assert_eq!(from_yaml, from_json);

    assert!(matches!(
        "csv".parse::<ExportFormat>(),
        Err(OagError::UnsupportedFormat(ref f)) if f == "csv"
    ));
}

/// Tenet: deletion is final and reported once.
#[tokio::test]
async fn delete_is_final() {
    let (engine, _clock) = seeded_engine().await;
    let instance = engine
        .oags()
        .create_from_schema(CORE_SCHEMA_ID, CreateOptions::default())
        .await
        .unwrap();

    engine.oags().delete_oag(&instance.id).await.unwrap();
    let gone = engine.oags().get_oag(&instance.id).await.unwrap_err();
    assert!(matches!(gone, OagError::ResourceNotFound { kind: "oag", .. }));
    assert!(engine.oags().delete_oag(&instance.id).await.unwrap_err().is_not_found());
}

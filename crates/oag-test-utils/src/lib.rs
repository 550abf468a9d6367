//! Testing utilities for the OAG workspace
//!
//! Shared schemas, record batches and deterministic engines.

#![allow(missing_docs)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use oag_core::{Engine, EngineConfig, EngineContext, ManualClock, SequentialIds};
use oag_model::{
    Edge, EntityTypeDef, GraphData, Node, PropertyDef, PropertyMap, PropertyType, RelationTypeDef,
    SchemaDefinition,
};
use oag_store::{FileStore, MemoryStore};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

pub const CORE_SCHEMA_ID: &str = "core-domain-schema-v2";

pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
}

/// Vehicle, project, planning and quality types with the relations between them
pub fn vehicle_schema() -> SchemaDefinition {
    let mut schema = SchemaDefinition::new("2.0.0")
        .with_entity(
            EntityTypeDef::new("Vehicle")
                .with_label("Vehicle")
                .with_property("name", PropertyDef::of(PropertyType::String).required())
                .with_property("vin", PropertyDef::of(PropertyType::String)),
        )
        .with_entity(
            EntityTypeDef::new("DomainProject")
                .with_label("Domain Project")
                .with_property("name", PropertyDef::of(PropertyType::String))
                .with_property("vehicleId", PropertyDef::of(PropertyType::String)),
        )
        .with_entity(EntityTypeDef::new("Team").with_label("Team"))
        .with_entity(EntityTypeDef::new("TestPlan").with_label("Test Plan"))
        .with_entity(
            EntityTypeDef::new("TeamCapacity")
                .with_label("Team Capacity")
                .with_property("capacity", PropertyDef::of(PropertyType::Integer)),
        )
        .with_entity(EntityTypeDef::new("TestCase").with_label("Test Case"))
        .with_relation(
            RelationTypeDef::new("has_domain_project", ["Vehicle"], ["DomainProject"])
                .with_label("Has Domain Project")
                .with_property("relationship", PropertyDef::of(PropertyType::String))
                .with_property("createdAt", PropertyDef::of(PropertyType::Date))
                .with_property("priority", PropertyDef::of(PropertyType::String))
                .with_property("status", PropertyDef::of(PropertyType::String))
                .with_property("sequence", PropertyDef::of(PropertyType::Integer))
                .with_property(
                    "phase",
                    PropertyDef::enumeration(["CONCEPT", "DEVELOPMENT", "VALIDATION"]),
                ),
        )
        .with_relation(
            RelationTypeDef::new("project_has_team", ["DomainProject"], ["Team"])
                .with_label("Project Has Team"),
        )
        .with_relation(
            RelationTypeDef::new("testplan_has_case", ["TestPlan"], ["TestCase"])
                .with_label("Test Plan Has Case"),
        );
    schema.name = Some("Core Domain".to_string());
    schema
}

pub fn record(value: Value) -> PropertyMap {
    match value {
        Value::Object(map) => map,
        other => panic!("record fixture must be an object, got {other}"),
    }
}

pub fn records(values: impl IntoIterator<Item = Value>) -> Vec<PropertyMap> {
    values.into_iter().map(record).collect()
}

/// One vehicle with one project under it
pub fn vehicle_records() -> Vec<PropertyMap> {
    records([
        json!({"id": "VEH-1", "name": "Sedan X", "vin": "1HGCM82633A004352", "priority": "HIGH"}),
        json!({"id": "DP-1", "name": "Powertrain", "vehicleId": "VEH-1", "status": "PLANNED"}),
    ])
}

/// `TC-` records of both kinds plus one that matches neither
pub fn tc_records() -> Vec<PropertyMap> {
    records([
        json!({"id": "TP-1", "name": "Regression"}),
        json!({"id": "TC-1", "teamId": "TEAM-1", "capacity": 40}),
        json!({"id": "TC-2", "testPlanId": "TP-1", "steps": ["open", "close"]}),
        json!({"id": "TC-3", "name": "Mystery"}),
    ])
}

pub fn sample_graph() -> GraphData {
    GraphData::new(
        vec![
            Node::new("VEH-1", "Vehicle").with_label("Sedan X"),
            Node::new("DP-1", "DomainProject").with_label("Powertrain"),
        ],
        vec![Edge::new("e1", "VEH-1", "has_domain_project", "DP-1")],
    )
}

pub fn memory_context() -> (EngineContext, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(fixed_now()));
    let ctx = EngineContext::new(Arc::new(MemoryStore::new()), EngineConfig::in_memory())
        .with_clock(clock.clone())
        .with_ids(Arc::new(SequentialIds::new()));
    (ctx, clock)
}

/// In-memory engine with a manual clock and sequential ids
pub fn memory_engine() -> (Engine, Arc<ManualClock>) {
    let (ctx, clock) = memory_context();
    (Engine::new(ctx), clock)
}

/// File-backed engine rooted at `dir`
pub fn file_engine(dir: &Path) -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(fixed_now()));
    let config = EngineConfig::new().with_data_dir(dir);
    let ctx = EngineContext::new(Arc::new(FileStore::new(dir)), config)
        .with_clock(clock.clone())
        .with_ids(Arc::new(SequentialIds::new()));
    (Engine::new(ctx), clock)
}

/// Engine with [`vehicle_schema`] stored under [`CORE_SCHEMA_ID`]
pub async fn seeded_engine() -> (Engine, Arc<ManualClock>) {
    let (engine, clock) = memory_engine();
    engine
        .schemas()
        .put(CORE_SCHEMA_ID, &vehicle_schema())
        .await
        .unwrap();
    (engine, clock)
}

//! Edge property synthesis
//!
//! Fills the properties a relation type declares when no authoritative edge
//! data exists. Authoritative data always wins: a non-empty prior payload is
//! returned untouched.
//!
//! Otherwise each declared property resolves through [`PropertyRule`], chosen
//! by property name first and declared type second. Synthesis is total (every
//! declared property gets a value, possibly `null`) and deterministic for a
//! fixed calendar date.

use oag_model::{Node, PropertyDef, PropertyMap, PropertyType, RelationTypeDef, SchemaDefinition};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const DATE_NAMES: &[&str] = &[
    "createdAt",
    "updatedAt",
    "lastUpdated",
    "foundDate",
    "startDate",
    "endDate",
    "freezeDate",
    "releaseDate",
    "deployDate",
    "dueDate",
    "commitDate",
    "executionDate",
    "joinDate",
];
const STATUS_NAMES: &[&str] = &["status", "buildStatus", "testStatus", "executionStatus"];
const SEQUENCE_NAMES: &[&str] = &[
    "sequence",
    "sprintNumber",
    "piNumber",
    "level",
    "order",
    "depth",
    "iteration",
];
const MEASURE_NAMES: &[&str] = &[
    "estimatedHours",
    "actualHours",
    "remainingHours",
    "progress",
    "coverage",
    "size",
    "weight",
    "storyPoints",
    "effort",
    "duration",
    "capacity",
    "percentage",
    "count",
    "score",
];
const TEAM_NAMES: &[&str] = &["ownerTeamId", "teamId"];
const FREE_TEXT_NAMES: &[&str] = &[
    "scope",
    "description",
    "changeLog",
    "notes",
    "comment",
    "rationale",
    "summary",
];

/// Fallback chain used for one property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRule {
    /// Relation description, else `"<source> <relation> <target>"`
    Relationship,
    /// Current calendar date, `YYYY-MM-DD`
    Today,
    /// Source `priority`, target `priority`, `"MEDIUM"`
    Priority,
    /// Source `status`, target `status`, `"IN_PROGRESS"`
    Status,
    /// Target `version`, source `version`, `"V1.0"`
    Version,
    /// Same-named field, `1`
    Sequence,
    /// Same-named field, `0`
    Measure,
    /// Cross-resolved `ownerTeamId`/`teamId`, `null`
    TeamReference,
    /// Same-named field, `""`
    FreeText,
    /// Same-named field, first declared enum value
    FirstEnumValue,
    /// Same-named field, `null`
    SameNamed,
}

impl PropertyRule {
    /// Choose the rule for a declared property
    #[must_use]
    pub fn for_property(name: &str, def: &PropertyDef) -> Self {
        if name == "relationship" {
            Self::Relationship
        } else if is_date_like(name) {
            Self::Today
        } else if name == "priority" {
            Self::Priority
        } else if STATUS_NAMES.contains(&name) || name.ends_with("Status") {
            Self::Status
        } else if name == "version" || name.ends_with("Version") || name.starts_with("version") {
            Self::Version
        } else if SEQUENCE_NAMES.contains(&name) || name.ends_with("Number") {
            Self::Sequence
        } else if MEASURE_NAMES.contains(&name)
            || ["Hours", "Count", "Rate", "Points"].iter().any(|s| name.ends_with(s))
        {
            Self::Measure
        } else if TEAM_NAMES.contains(&name) {
            Self::TeamReference
        } else if FREE_TEXT_NAMES.contains(&name) {
            Self::FreeText
        } else if def.kind == PropertyType::Enum {
            Self::FirstEnumValue
        } else {
            Self::SameNamed
        }
    }
}

fn is_date_like(name: &str) -> bool {
    DATE_NAMES.contains(&name) || name.ends_with("Date") || name.ends_with("At")
}

fn label_of(node: &Node) -> &str {
    if node.label.is_empty() {
        &node.id
    } else {
        &node.label
    }
}

fn first_of(candidates: &[Option<&Value>]) -> Option<Value> {
    candidates.iter().flatten().next().map(|v| (*v).clone())
}

/// Edge record from an authoritative source
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthoritativeEdge {
    /// Source node id
    pub source: String,
    /// Relation type code
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Target node id
    pub target: String,
    /// Recorded properties
    #[serde(default)]
    pub data: PropertyMap,
}

/// Authoritative edge data indexed by exact `(source, type, target)`
#[derive(Debug, Clone, Default)]
pub struct AuthoritativeEdges {
    by_triple: HashMap<(String, String, String), PropertyMap>,
}

impl AuthoritativeEdges {
    /// Index records; the first record for a triple wins
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = AuthoritativeEdge>) -> Self {
        let mut by_triple = HashMap::new();
        for record in records {
            by_triple
                .entry((record.source, record.edge_type, record.target))
                .or_insert(record.data);
        }
        Self { by_triple }
    }

    /// Recorded properties for a triple
    #[must_use]
    pub fn lookup(&self, source: &str, edge_type: &str, target: &str) -> Option<&PropertyMap> {
        self.by_triple
            .get(&(source.to_string(), edge_type.to_string(), target.to_string()))
    }

    /// Number of indexed triples
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_triple.len()
    }

    /// Whether nothing is indexed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_triple.is_empty()
    }
}

/// Deterministic relation property filler
#[derive(Debug, Clone, Copy)]
pub struct EdgePropertySynthesizer {
    today: NaiveDate,
}

impl EdgePropertySynthesizer {
    /// Synthesizer that stamps date-like properties with `today`
    #[inline]
    #[must_use]
    pub const fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Date stamped on date-like properties
    #[inline]
    #[must_use]
    pub const fn today(&self) -> NaiveDate {
        self.today
    }

    /// Properties for an edge of `relation_code` between `source` and `target`
    ///
    /// An undefined relation has no declared properties, so the result is the
    /// prior payload or empty.
    #[must_use]
    pub fn synthesize(
        &self,
        schema: &SchemaDefinition,
        source: &Node,
        relation_code: &str,
        target: &Node,
        prior: Option<&PropertyMap>,
    ) -> PropertyMap {
        match schema.relation_type(relation_code) {
            Some(relation) => self.synthesize_for(relation, source, target, prior),
            None => prior.cloned().unwrap_or_default(),
        }
    }

    /// Properties for an edge of a resolved relation type
    #[must_use]
    pub fn synthesize_for(
        &self,
        relation: &RelationTypeDef,
        source: &Node,
        target: &Node,
        prior: Option<&PropertyMap>,
    ) -> PropertyMap {
        if let Some(prior) = prior.filter(|p| !p.is_empty()) {
            return prior.clone();
        }
        relation
            .properties
            .iter()
            .map(|(name, def)| {
                let rule = PropertyRule::for_property(name, def);
                (name.clone(), self.resolve(rule, name, def, relation, source, target))
            })
            .collect()
    }

    /// Value for one property under a given rule
    #[must_use]
    pub fn resolve(
        &self,
        rule: PropertyRule,
        name: &str,
        def: &PropertyDef,
        relation: &RelationTypeDef,
        source: &Node,
        target: &Node,
    ) -> Value {
        let same_named = || first_of(&[source.field(name), target.field(name)]);
        match rule {
            PropertyRule::Relationship => match relation.description.as_deref() {
                Some(text) if !text.is_empty() => Value::from(text),
                _ => Value::from(format!(
                    "{} {} {}",
                    label_of(source),
                    relation.display_label(),
                    label_of(target)
                )),
            },
            PropertyRule::Today => Value::from(self.today.format("%Y-%m-%d").to_string()),
            PropertyRule::Priority => first_of(&[source.field("priority"), target.field("priority")])
                .unwrap_or_else(|| Value::from("MEDIUM")),
            PropertyRule::Status => first_of(&[source.field("status"), target.field("status")])
                .unwrap_or_else(|| Value::from("IN_PROGRESS")),
            PropertyRule::Version => first_of(&[target.field("version"), source.field("version")])
                .unwrap_or_else(|| Value::from("V1.0")),
            PropertyRule::Sequence => same_named().unwrap_or_else(|| Value::from(1)),
            PropertyRule::Measure => same_named().unwrap_or_else(|| Value::from(0)),
            PropertyRule::TeamReference => {
                let other = if name == "ownerTeamId" { "teamId" } else { "ownerTeamId" };
                first_of(&[
                    source.field(name),
                    source.field(other),
                    target.field(name),
                    target.field(other),
                ])
                .unwrap_or(Value::Null)
            }
            PropertyRule::FreeText => same_named().unwrap_or_else(|| Value::from("")),
            PropertyRule::FirstEnumValue => same_named()
                .or_else(|| def.enum_values.first().map(|v| Value::from(v.as_str())))
                .unwrap_or(Value::Null),
            PropertyRule::SameNamed => same_named().unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn node(id: &str, label: &str, data: serde_json::Value) -> Node {
        Node::new(id, "T")
            .with_label(label)
            .with_data(data.as_object().cloned().unwrap())
    }

    fn relation() -> RelationTypeDef {
        RelationTypeDef::new("has_feature", ["Product"], ["Feature"])
            .with_label("contains")
            .with_property("relationship", PropertyDef::of(PropertyType::String))
            .with_property("createdAt", PropertyDef::of(PropertyType::Date))
            .with_property("priority", PropertyDef::enumeration(["HIGH", "MEDIUM", "LOW"]))
            .with_property("status", PropertyDef::of(PropertyType::String))
            .with_property("targetVersion", PropertyDef::of(PropertyType::String))
            .with_property("sequence", PropertyDef::of(PropertyType::Integer))
            .with_property("estimatedHours", PropertyDef::of(PropertyType::Float))
            .with_property("ownerTeamId", PropertyDef::of(PropertyType::String))
            .with_property("scope", PropertyDef::of(PropertyType::Text))
            .with_property("coupling", PropertyDef::enumeration(["TIGHT", "LOOSE"]))
            .with_property("owner", PropertyDef::of(PropertyType::String))
    }

    #[test]
    fn every_fallback_path_with_empty_nodes() {
        let synth = EdgePropertySynthesizer::new(today());
        let props = synth.synthesize_for(
            &relation(),
            &node("PROD-1", "Car", json!({})),
            &node("FEAT-1", "Lights", json!({})),
            None,
        );
        assert_eq!(
            serde_json::Value::Object(props),
            json!({
                "relationship": "Car contains Lights",
                "createdAt": "2026-03-14",
                "priority": "MEDIUM",
                "status": "IN_PROGRESS",
                "targetVersion": "V1.0",
                "sequence": 1,
                "estimatedHours": 0,
                "ownerTeamId": null,
                "scope": "",
                "coupling": "TIGHT",
                "owner": null
            })
        );
    }

    #[test]
    fn node_fields_take_precedence_over_defaults() {
        let synth = EdgePropertySynthesizer::new(today());
        let source = node(
            "PROD-1",
            "Car",
            json!({"priority": "HIGH", "version": "V2.0", "teamId": "TEAM-9", "scope": "EU"}),
        );
        let target = node(
            "FEAT-1",
            "Lights",
            json!({"status": "DONE", "version": "V3.1", "sequence": 4, "estimatedHours": 12, "coupling": "LOOSE"}),
        );
        let props = synth.synthesize_for(&relation(), &source, &target, None);
        assert_eq!(props["priority"], "HIGH");
        assert_eq!(props["status"], "DONE");
        assert_eq!(props["targetVersion"], "V3.1");
        assert_eq!(props["sequence"], 4);
        assert_eq!(props["estimatedHours"], 12);
        assert_eq!(props["ownerTeamId"], "TEAM-9");
        assert_eq!(props["scope"], "EU");
        assert_eq!(props["coupling"], "LOOSE");
    }

    #[test]
    fn description_is_the_relationship_sentence() {
        let synth = EdgePropertySynthesizer::new(today());
        let rel = relation().with_description("product ships feature");
        let props = synth.synthesize_for(&rel, &node("A", "", json!({})), &node("B", "", json!({})), None);
        assert_eq!(props["relationship"], "product ships feature");
    }

    #[test]
    fn prior_data_is_returned_unchanged() {
        let synth = EdgePropertySynthesizer::new(today());
        let prior = json!({"priority": "LOW", "custom": [1, 2]}).as_object().cloned().unwrap();
        let source = node("A", "A", json!({"priority": "HIGH"}));
        let target = node("B", "B", json!({}));

        let first = synth.synthesize_for(&relation(), &source, &target, Some(&prior));
        let second = synth.synthesize_for(&relation(), &source, &target, Some(&prior));
        assert_eq!(first, prior);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn empty_prior_falls_back_to_synthesis() {
        let synth = EdgePropertySynthesizer::new(today());
        let empty = PropertyMap::new();
        let props = synth.synthesize_for(
            &relation(),
            &node("A", "A", json!({})),
            &node("B", "B", json!({})),
            Some(&empty),
        );
        assert_eq!(props.len(), relation().properties.len());
    }

    #[test]
    fn undefined_relation_yields_prior_or_empty() {
        let synth = EdgePropertySynthesizer::new(today());
        let schema = SchemaDefinition::new("1.0.0");
        let a = node("A", "A", json!({}));
        assert!(synth.synthesize(&schema, &a, "ghost", &a, None).is_empty());
    }

    #[test]
    fn rule_selection_prefers_name_over_type() {
        let enum_def = PropertyDef::enumeration(["X"]);
        assert_eq!(PropertyRule::for_property("status", &enum_def), PropertyRule::Status);
        assert_eq!(PropertyRule::for_property("kind", &enum_def), PropertyRule::FirstEnumValue);
        assert_eq!(
            PropertyRule::for_property("versionNumber", &PropertyDef::default()),
            PropertyRule::Version
        );
        assert_eq!(
            PropertyRule::for_property("releaseDate", &PropertyDef::default()),
            PropertyRule::Today
        );
        assert_eq!(
            PropertyRule::for_property("teamId", &PropertyDef::default()),
            PropertyRule::TeamReference
        );
    }

    #[test]
    fn authoritative_lookup_is_exact() {
        let edges = AuthoritativeEdges::new(vec![AuthoritativeEdge {
            source: "A".into(),
            edge_type: "r".into(),
            target: "B".into(),
            data: json!({"k": 1}).as_object().cloned().unwrap(),
        }]);
        assert!(edges.lookup("A", "r", "B").is_some());
        assert!(edges.lookup("B", "r", "A").is_none());
    }
}

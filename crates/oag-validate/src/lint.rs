//! Schema lint
//!
//! Naming and well-formedness rules for schema definitions, checked before a
//! schema is stored or edited. Findings use the same report as graph validation.

use crate::report::{IssueKind, Location, ValidationReport};
use oag_model::{EntityTypeDef, PropertyDef, PropertyType, RelationTypeDef, SchemaDefinition};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Longest accepted entity label, in characters
pub const MAX_LABEL_LEN: usize = 50;

static ENTITY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9_]*$").expect("entity code pattern"));
static RELATION_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("relation code pattern"));
static PROPERTY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9_]*$").expect("property name pattern"));
static COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("color pattern"));

/// Whether `code` is a well-formed entity type code
#[must_use]
pub fn is_valid_entity_code(code: &str) -> bool {
    ENTITY_CODE.is_match(code)
}

/// Whether `code` is a well-formed relation type code
#[must_use]
pub fn is_valid_relation_code(code: &str) -> bool {
    RELATION_CODE.is_match(code)
}

/// Whether `name` is a well-formed property name
#[must_use]
pub fn is_valid_property_name(name: &str) -> bool {
    PROPERTY_NAME.is_match(name)
}

/// Whether `color` is `#RGB` or `#RRGGBB`
#[must_use]
pub fn is_valid_color(color: &str) -> bool {
    COLOR.is_match(color)
}

/// Lint a schema definition
///
/// Map keys are authoritative for codes; a `code` field inside a definition
/// is ignored here.
#[must_use]
pub fn lint_schema(schema: &SchemaDefinition) -> ValidationReport {
    let mut report = ValidationReport::new();

    if schema.version.trim().is_empty() {
        report.warning(IssueKind::MissingField, Location::Schema, "schema has no version");
    }

    if schema.entity_types.is_empty() {
        report.error(
            IssueKind::EmptySchema,
            Location::Schema,
            "schema must declare at least one entity type",
        );
    }
    for (code, def) in &schema.entity_types {
        lint_entity(code, def, &mut report);
    }
    for (code, def) in &schema.relation_types {
        lint_relation(code, def, schema, &mut report);
    }

    // Isolation only means something once relations exist
    if !schema.relation_types.is_empty() {
        let connected: HashSet<&str> = schema
            .relation_types
            .values()
            .flat_map(|r| r.from.iter().chain(&r.to))
            .map(String::as_str)
            .collect();
        for code in schema.entity_types.keys() {
            if !connected.contains(code.as_str()) {
                report.warning(
                    IssueKind::IsolatedEntityType,
                    Location::EntityType { code: code.clone() },
                    format!("entity type {code} takes part in no relation type"),
                );
            }
        }
    }

    tracing::debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "schema linted"
    );
    report
}

fn lint_entity(code: &str, def: &EntityTypeDef, report: &mut ValidationReport) {
    let at = || Location::EntityType { code: code.to_string() };

    if !is_valid_entity_code(code) {
        report.error(
            IssueKind::InvalidFormat,
            at(),
            format!("entity type code {code:?} must start with an uppercase letter and contain only letters, digits and underscores"),
        );
    }

    let label = def.label.trim();
    if label.is_empty() {
        report.error(IssueKind::MissingField, at(), format!("entity type {code} has no label"));
    } else if def.label.chars().count() > MAX_LABEL_LEN {
        report.error(
            IssueKind::InvalidFormat,
            at(),
            format!("entity type {code} label exceeds {MAX_LABEL_LEN} characters"),
        );
    }

    if !def.color.is_empty() && !is_valid_color(&def.color) {
        report.error(
            IssueKind::InvalidFormat,
            at(),
            format!("entity type {code} color {:?} is not #RGB or #RRGGBB", def.color),
        );
    }

    for (name, prop) in &def.properties {
        lint_property(code, name, prop, report);
    }
}

fn lint_property(owner: &str, name: &str, def: &PropertyDef, report: &mut ValidationReport) {
    let at = || Location::Property {
        owner: owner.to_string(),
        name: name.to_string(),
    };

    if !is_valid_property_name(name) {
        report.error(
            IssueKind::InvalidFormat,
            at(),
            format!("property {owner}.{name} must start with a lowercase letter and contain only letters, digits and underscores"),
        );
    }
    match &def.kind {
        PropertyType::Other(kind) => report.error(
            IssueKind::UnknownPropertyType,
            at(),
            format!("property {owner}.{name} has unknown type {kind:?}"),
        ),
        PropertyType::Enum if def.enum_values.is_empty() => report.error(
            IssueKind::MissingField,
            at(),
            format!("enum property {owner}.{name} declares no values"),
        ),
        _ => {}
    }
}

fn lint_relation(
    code: &str,
    def: &RelationTypeDef,
    schema: &SchemaDefinition,
    report: &mut ValidationReport,
) {
    let at = || Location::RelationType { code: code.to_string() };

    if !is_valid_relation_code(code) {
        report.error(
            IssueKind::InvalidFormat,
            at(),
            format!("relation type code {code:?} must start with a lowercase letter and contain only lowercase letters, digits and underscores"),
        );
    }
    if def.label.trim().is_empty() {
        report.error(IssueKind::MissingField, at(), format!("relation type {code} has no label"));
    }

    for (side, types) in [("source", &def.from), ("target", &def.to)] {
        if types.is_empty() {
            report.error(
                IssueKind::MissingField,
                at(),
                format!("relation type {code} declares no {side} types"),
            );
        }
        for entity in types {
            if schema.entity_type(entity).is_none() {
                report.error(
                    IssueKind::UndefinedEndpoint,
                    at(),
                    format!("relation type {code} references undefined {side} type {entity}"),
                );
            }
        }
    }

    for (name, prop) in &def.properties {
        lint_property(code, name, prop, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patterns() {
        assert!(is_valid_entity_code("DomainProject"));
        assert!(!is_valid_entity_code("domainProject"));
        assert!(!is_valid_entity_code("Domain-Project"));
        assert!(is_valid_relation_code("has_domain_project"));
        assert!(!is_valid_relation_code("hasDomainProject"));
        assert!(is_valid_property_name("vehicleId"));
        assert!(!is_valid_property_name("VehicleId"));
        assert!(is_valid_color("#1890ff"));
        assert!(is_valid_color("#FFF"));
        assert!(!is_valid_color("1890ff"));
        assert!(!is_valid_color("#12345"));
    }

    #[test]
    fn well_formed_schema_is_clean() {
        let schema = SchemaDefinition::new("1.0.0")
            .with_entity(EntityTypeDef::new("Vehicle"))
            .with_entity(EntityTypeDef::new("DomainProject"))
            .with_relation(RelationTypeDef::new(
                "has_domain_project",
                ["Vehicle"],
                ["DomainProject"],
            ));
        let report = lint_schema(&schema);
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn empty_schema() {
        let report = lint_schema(&SchemaDefinition::new(""));
        assert_eq!(report.errors_of(&IssueKind::EmptySchema).count(), 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn reports_every_malformed_element() {
        let schema: SchemaDefinition = serde_json::from_value(json!({
            "version": "1.0.0",
            "entityTypes": {
                "vehicle": {"label": "", "color": "blue", "properties": {
                    "Name": {"type": "string"},
                    "kind": {"type": "Enum"},
                    "blob": {"type": "binary"}
                }},
                "Orphan": {"label": "Orphan"}
            },
            "relationTypes": {
                "HasPart": {"label": "has part", "from": ["vehicle"], "to": ["Ghost"]},
                "empty_ends": {"label": "x", "from": [], "to": []}
            }
        }))
        .unwrap();
        let report = lint_schema(&schema);

        assert_eq!(report.errors_of(&IssueKind::InvalidFormat).count(), 4);
        assert_eq!(report.errors_of(&IssueKind::UnknownPropertyType).count(), 1);
        assert_eq!(report.errors_of(&IssueKind::UndefinedEndpoint).count(), 1);
        // label, enum values, two empty endpoint lists
        assert_eq!(report.errors_of(&IssueKind::MissingField).count(), 4);
        let isolated: Vec<_> = report
            .warnings_of(&IssueKind::IsolatedEntityType)
            .map(|w| w.location.clone())
            .collect();
        assert_eq!(isolated, vec![Location::EntityType { code: "Orphan".into() }]);
    }

    #[test]
    fn long_label_rejected() {
        let schema = SchemaDefinition::new("1.0.0")
            .with_entity(EntityTypeDef::new("Vehicle").with_label("x".repeat(MAX_LABEL_LEN + 1)));
        let report = lint_schema(&schema);
        assert_eq!(report.errors_of(&IssueKind::InvalidFormat).count(), 1);
    }
}

//! Schema definitions
//!
//! A [`SchemaDefinition`] declares which entity types and relation types a
//! graph may contain, and the properties each one carries. Maps keep their
//! declared order so that "first declared" has a stable meaning.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Entity or relation type code
pub type TypeCode = String;

/// Versioned declaration of entity and relation types
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    /// Semantic version triple, as declared by the schema author
    #[serde(default)]
    pub version: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Entity types keyed by code
    #[serde(default)]
    pub entity_types: IndexMap<TypeCode, EntityTypeDef>,
    /// Relation types keyed by code
    #[serde(default)]
    pub relation_types: IndexMap<TypeCode, RelationTypeDef>,
}

impl SchemaDefinition {
    /// Empty schema with the given version
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Add an entity type, keyed by its code
    #[must_use]
    pub fn with_entity(mut self, def: EntityTypeDef) -> Self {
        self.entity_types.insert(def.code.clone(), def);
        self
    }

    /// Add a relation type, keyed by its code
    #[must_use]
    pub fn with_relation(mut self, def: RelationTypeDef) -> Self {
        self.relation_types.insert(def.code.clone(), def);
        self
    }

    /// Look up an entity type
    #[inline]
    #[must_use]
    pub fn entity_type(&self, code: &str) -> Option<&EntityTypeDef> {
        self.entity_types.get(code)
    }

    /// Look up a relation type
    #[inline]
    #[must_use]
    pub fn relation_type(&self, code: &str) -> Option<&RelationTypeDef> {
        self.relation_types.get(code)
    }

    /// Entity type codes in declared order
    #[must_use]
    pub fn entity_codes(&self) -> Vec<TypeCode> {
        self.entity_types.keys().cloned().collect()
    }

    /// Relation type codes in declared order
    #[must_use]
    pub fn relation_codes(&self) -> Vec<TypeCode> {
        self.relation_types.keys().cloned().collect()
    }
}

/// Declared entity type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeDef {
    /// Type code, e.g. `Vehicle`
    #[serde(default)]
    pub code: TypeCode,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared properties
    #[serde(default)]
    pub properties: IndexMap<String, PropertyDef>,
    /// Display color, `#RGB` or `#RRGGBB`
    #[serde(default)]
    pub color: String,
    /// Icon name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Owning domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Parent entity type code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<TypeCode>,
    /// Abstract types are never instantiated directly
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
}

impl EntityTypeDef {
    /// New entity type with a label equal to its code
    #[must_use]
    pub fn new(code: impl Into<TypeCode>) -> Self {
        let code = code.into();
        Self {
            label: code.clone(),
            code,
            ..Self::default()
        }
    }

    /// Set the label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, def: PropertyDef) -> Self {
        self.properties.insert(name.into(), def);
        self
    }
}

/// Declared relation type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationTypeDef {
    /// Relation code, e.g. `has_domain_project`
    #[serde(default, alias = "id")]
    pub code: TypeCode,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Human description, used as the `relationship` sentence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed source entity types; empty means unconstrained
    #[serde(default)]
    pub from: Vec<TypeCode>,
    /// Allowed target entity types; empty means unconstrained
    #[serde(default)]
    pub to: Vec<TypeCode>,
    /// Declared edge properties
    #[serde(default)]
    pub properties: IndexMap<String, PropertyDef>,
}

impl RelationTypeDef {
    /// New relation type between the given endpoint types
    #[must_use]
    pub fn new<F, T>(code: impl Into<TypeCode>, from: F, to: T) -> Self
    where
        F: IntoIterator,
        F::Item: Into<TypeCode>,
        T: IntoIterator,
        T::Item: Into<TypeCode>,
    {
        let code = code.into();
        Self {
            label: code.clone(),
            code,
            from: from.into_iter().map(Into::into).collect(),
            to: to.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, def: PropertyDef) -> Self {
        self.properties.insert(name.into(), def);
        self
    }

    /// Whether a node of `entity_type` may be the source
    #[inline]
    #[must_use]
    pub fn allows_source(&self, entity_type: &str) -> bool {
        self.from.is_empty() || self.from.iter().any(|t| t == entity_type)
    }

    /// Whether a node of `entity_type` may be the target
    #[inline]
    #[must_use]
    pub fn allows_target(&self, entity_type: &str) -> bool {
        self.to.is_empty() || self.to.iter().any(|t| t == entity_type)
    }

    /// Label for sentences, falling back to the code
    #[must_use]
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.code
        } else {
            &self.label
        }
    }
}

/// Property declaration on an entity or relation type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    /// Value type
    #[serde(rename = "type", default)]
    pub kind: PropertyType,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Whether nodes must carry a value
    #[serde(default)]
    pub required: bool,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values for `Enum`
    #[serde(default, alias = "values", alias = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Example value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl PropertyDef {
    /// Property of the given type
    #[must_use]
    pub fn of(kind: PropertyType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Enum property with allowed values
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: PropertyType::Enum,
            enum_values: values.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Mark as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Declared property value type
///
/// Parsing is case-insensitive. Unknown names are kept as [`PropertyType::Other`]
/// so schema lint can report them instead of failing to load the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PropertyType {
    /// Short string
    #[default]
    String,
    /// Long text
    Text,
    /// Integer
    Integer,
    /// Floating point number
    Float,
    /// Boolean
    Boolean,
    /// Calendar date or timestamp
    Date,
    /// One of a declared set of values
    Enum,
    /// Nested object
    Object,
    /// List
    Array,
    /// Unrecognized type name
    Other(String),
}

impl PropertyType {
    /// Canonical name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "String",
            Self::Text => "Text",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Enum => "Enum",
            Self::Object => "Object",
            Self::Array => "Array",
            Self::Other(name) => name,
        }
    }

    /// Whether this is one of the known types
    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl Display for PropertyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl PropertyType {
    /// Parse a declared type name, case-insensitively
    #[must_use]
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "text" => Self::Text,
            "integer" | "int" => Self::Integer,
            "float" | "number" | "double" => Self::Float,
            "boolean" | "bool" => Self::Boolean,
            "date" | "datetime" => Self::Date,
            "enum" => Self::Enum,
            "object" | "json" => Self::Object,
            "array" => Self::Array,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl Serialize for PropertyType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_name(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_payload_format() {
        let schema: SchemaDefinition = serde_json::from_value(json!({
            "version": "2.0.0",
            "entityTypes": {
                "Vehicle": {
                    "code": "Vehicle",
                    "label": "Vehicle",
                    "color": "#1890ff",
                    "properties": {
                        "name": {"type": "String", "required": true},
                        "status": {"type": "enum", "values": ["ACTIVE", "RETIRED"]}
                    }
                }
            },
            "relationTypes": {
                "has_domain_project": {
                    "id": "has_domain_project",
                    "label": "has domain project",
                    "from": ["Vehicle"],
                    "to": ["DomainProject"]
                }
            }
        }))
        .unwrap();

        let vehicle = schema.entity_type("Vehicle").unwrap();
        assert!(vehicle.properties["name"].required);
        assert_eq!(vehicle.properties["status"].kind, PropertyType::Enum);
        assert_eq!(vehicle.properties["status"].enum_values, ["ACTIVE", "RETIRED"]);
        assert_eq!(
            schema.relation_type("has_domain_project").unwrap().code,
            "has_domain_project"
        );
    }

    #[test]
    fn unknown_property_type_is_preserved() {
        let def: PropertyDef = serde_json::from_value(json!({"type": "Geo"})).unwrap();
        assert_eq!(def.kind, PropertyType::Other("Geo".into()));
        assert!(!def.kind.is_known());
        assert_eq!(serde_json::to_value(&def).unwrap()["type"], "Geo");
    }

    #[test]
    fn empty_endpoint_sets_are_unconstrained() {
        let open = RelationTypeDef::new("relates", Vec::<String>::new(), Vec::<String>::new());
        assert!(open.allows_source("Anything"));

        let closed = RelationTypeDef::new("has_feature", ["Product"], ["Feature"]);
        assert!(closed.allows_source("Product"));
        assert!(!closed.allows_source("Feature"));
        assert!(closed.allows_target("Feature"));
    }

    #[test]
    fn codes_keep_declared_order() {
        let schema = SchemaDefinition::new("1.0.0")
            .with_entity(EntityTypeDef::new("Zeta"))
            .with_entity(EntityTypeDef::new("Alpha"));
        assert_eq!(schema.entity_codes(), ["Zeta", "Alpha"]);
    }
}

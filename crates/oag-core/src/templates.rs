//! Closed catalog of graph instance templates

use crate::error::{OagError, Result};
use serde::Serialize;

/// Named preset bound to one schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Template id
    pub id: &'static str,
    /// Schema the instance is created from
    pub schema_id: &'static str,
    /// Default instance name
    pub name: &'static str,
    /// Default instance description
    pub description: &'static str,
}

/// Built-in templates
pub const BUILTIN_TEMPLATES: &[Template] = &[
    Template {
        id: "vehicle-development",
        schema_id: "core-domain-schema-v2",
        name: "Vehicle Development OAG",
        description: "Standard vehicle development ontology",
    },
    Template {
        id: "adas-project",
        schema_id: "adas-schema-v2",
        name: "ADAS Project OAG",
        description: "ADAS system development ontology",
    },
];

/// Template lookup
#[derive(Debug, Clone, Copy)]
pub struct TemplateCatalog {
    templates: &'static [Template],
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self {
            templates: BUILTIN_TEMPLATES,
        }
    }
}

impl TemplateCatalog {
    /// Catalog of the built-in templates
    #[inline]
    #[must_use]
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Template by id
    ///
    /// # Errors
    /// [`OagError::TemplateNotFound`] for ids outside the catalog
    pub fn get(&self, id: &str) -> Result<&'static Template> {
        self.templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| OagError::TemplateNotFound(id.to_string()))
    }

    /// All templates
    pub fn iter(&self) -> impl Iterator<Item = &'static Template> {
        self.templates.iter()
    }
}

//! Graph instances (OAGs) bound to a schema version

use crate::graph::GraphData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Lifecycle status of a graph instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OagStatus {
    /// In use
    #[default]
    Active,
    /// Work in progress
    Draft,
    /// Retired, kept for reference
    Archived,
}

impl Display for OagStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Archived => "archived",
        })
    }
}

impl FromStr for OagStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "draft" => Ok(Self::Draft),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// One graph instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphInstance {
    /// Instance id
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Bound schema id
    pub schema_id: String,
    /// Schema version at creation time
    #[serde(default)]
    pub schema_version: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: OagStatus,
    /// Creator
    #[serde(default = "default_creator")]
    pub created_by: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Nodes and edges
    #[serde(default)]
    pub data: GraphData,
    /// Entity type codes declared by the bound schema
    #[serde(default)]
    pub entity_types: Vec<String>,
    /// Relation type codes declared by the bound schema
    #[serde(default)]
    pub relation_types: Vec<String>,
}

pub(crate) fn default_creator() -> String {
    "system".to_string()
}

impl GraphInstance {
    /// Listing projection
    #[must_use]
    pub fn summary(&self) -> OagSummary {
        OagSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            schema_id: self.schema_id.clone(),
            schema_version: self.schema_version.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Listing projection of a [`GraphInstance`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OagSummary {
    /// Instance id
    pub id: String,
    /// Display name
    pub name: String,
    /// Bound schema id
    pub schema_id: String,
    /// Bound schema version
    pub schema_version: String,
    /// Lifecycle status
    pub status: OagStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_wire_format() {
        assert_eq!(serde_json::to_value(OagStatus::Archived).unwrap(), json!("archived"));
        assert_eq!("draft".parse::<OagStatus>().unwrap(), OagStatus::Draft);
        assert!("published".parse::<OagStatus>().is_err());
    }

    #[test]
    fn instance_defaults_optional_fields() {
        let instance: GraphInstance = serde_json::from_value(json!({
            "id": "oag-1",
            "name": "Demo",
            "schemaId": "core",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(instance.status, OagStatus::Active);
        assert_eq!(instance.created_by, "system");
        assert!(instance.data.nodes.is_empty());
        assert_eq!(instance.summary().schema_id, "core");
    }
}

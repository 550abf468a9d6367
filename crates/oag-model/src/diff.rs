//! Structural diff between two versioned payloads
//!
//! Compares the keyed sections of two payloads:
//! - `entityTypes` and `relationTypes` (schema maps, or code lists on graph instances)
//! - `data.nodes` and `data.edges` keyed by id (graph instances only)
//!
//! For each key in the union: only in the new payload → added, only in the
//! old → removed, in both but unequal → modified. Keys are visited in sorted
//! order so the result is deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Compared section of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Schema entity types
    EntityTypes,
    /// Schema relation types
    RelationTypes,
    /// Graph nodes
    Nodes,
    /// Graph edges
    Edges,
}

impl Section {
    /// All sections in comparison order
    pub const ALL: [Self; 4] = [
        Self::EntityTypes,
        Self::RelationTypes,
        Self::Nodes,
        Self::Edges,
    ];

    fn locate(self, payload: &Value) -> Option<&Value> {
        match self {
            Self::EntityTypes => payload.get("entityTypes"),
            Self::RelationTypes => payload.get("relationTypes"),
            Self::Nodes => payload
                .get("data")
                .and_then(|d| d.get("nodes"))
                .or_else(|| payload.get("nodes")),
            Self::Edges => payload
                .get("data")
                .and_then(|d| d.get("edges"))
                .or_else(|| payload.get("edges")),
        }
    }

    fn keyed(self, payload: &Value) -> BTreeMap<String, &Value> {
        match self.locate(payload) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (element_key(item).unwrap_or_else(|| format!("#{i}")), item))
                .collect(),
            _ => BTreeMap::new(),
        }
    }
}

fn element_key(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["id", "code"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

/// Entries added to or removed from each section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffBucket {
    /// Entity type definitions
    pub entity_types: Vec<Value>,
    /// Relation type definitions
    pub relation_types: Vec<Value>,
    /// Nodes
    pub nodes: Vec<Value>,
    /// Edges
    pub edges: Vec<Value>,
}

impl DiffBucket {
    fn section_mut(&mut self, section: Section) -> &mut Vec<Value> {
        match section {
            Section::EntityTypes => &mut self.entity_types,
            Section::RelationTypes => &mut self.relation_types,
            Section::Nodes => &mut self.nodes,
            Section::Edges => &mut self.edges,
        }
    }

    /// Whether every section is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_types.is_empty()
            && self.relation_types.is_empty()
            && self.nodes.is_empty()
            && self.edges.is_empty()
    }
}

/// Paired old/new content for a changed key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedEntry {
    /// Code or id
    pub key: String,
    /// Content in the first payload
    pub old: Value,
    /// Content in the second payload
    pub new: Value,
}

/// Modified entries per section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedBucket {
    /// Entity type definitions
    pub entity_types: Vec<ModifiedEntry>,
    /// Relation type definitions
    pub relation_types: Vec<ModifiedEntry>,
    /// Nodes
    pub nodes: Vec<ModifiedEntry>,
    /// Edges
    pub edges: Vec<ModifiedEntry>,
}

impl ModifiedBucket {
    fn section_mut(&mut self, section: Section) -> &mut Vec<ModifiedEntry> {
        match section {
            Section::EntityTypes => &mut self.entity_types,
            Section::RelationTypes => &mut self.relation_types,
            Section::Nodes => &mut self.nodes,
            Section::Edges => &mut self.edges,
        }
    }

    /// Whether every section is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_types.is_empty()
            && self.relation_types.is_empty()
            && self.nodes.is_empty()
            && self.edges.is_empty()
    }
}

/// Result of comparing two payloads
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VersionDiff {
    /// Present only in the second payload
    pub added: DiffBucket,
    /// Present only in the first payload
    pub removed: DiffBucket,
    /// Present in both with different content
    pub modified: ModifiedBucket,
}

impl VersionDiff {
    /// Whether the payloads are equal in every compared section
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Compare `old` against `new`
#[must_use]
pub fn diff(old: &Value, new: &Value) -> VersionDiff {
    let mut out = VersionDiff::default();
    for section in Section::ALL {
        let before = section.keyed(old);
        let after = section.keyed(new);
        let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
        for key in keys {
            match (before.get(key), after.get(key)) {
                (None, Some(added)) => out.added.section_mut(section).push((*added).clone()),
                (Some(removed), None) => out.removed.section_mut(section).push((*removed).clone()),
                (Some(a), Some(b)) if a != b => out.modified.section_mut(section).push(ModifiedEntry {
                    key: key.clone(),
                    old: (*a).clone(),
                    new: (*b).clone(),
                }),
                _ => {}
            }
        }
    }
    out
}

//! Nodes, edges and graph payloads
//!
//! Missing identity fields deserialize to empty strings rather than failing,
//! so an imported graph can always be handed to the validator, which reports
//! the gaps instead.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Arbitrary business payload carried by nodes and edges
pub type PropertyMap = Map<String, Value>;

/// Typed graph node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique id
    #[serde(default)]
    pub id: String,
    /// Entity type code
    #[serde(rename = "type", default)]
    pub node_type: String,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Business payload
    #[serde(default)]
    pub data: PropertyMap,
}

impl Node {
    /// New node with an empty payload; the label defaults to the id
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            node_type: node_type.into(),
            data: PropertyMap::new(),
        }
    }

    /// Set the label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the payload
    #[must_use]
    pub fn with_data(mut self, data: PropertyMap) -> Self {
        self.data = data;
        self
    }

    /// Payload field, treating JSON `null` as absent
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }
}

/// Typed directed edge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Edge {
    /// Edge id
    #[serde(default)]
    pub id: String,
    /// Source node id
    #[serde(default)]
    pub source: String,
    /// Target node id
    #[serde(default)]
    pub target: String,
    /// Relation type code
    #[serde(rename = "type", default)]
    pub edge_type: String,
    /// Relation properties
    #[serde(default)]
    pub data: PropertyMap,
}

impl Edge {
    /// New edge with an empty payload
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        edge_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            data: PropertyMap::new(),
        }
    }

    /// Set the payload
    #[must_use]
    pub fn with_data(mut self, data: PropertyMap) -> Self {
        self.data = data;
        self
    }
}

/// Graph payload: `{ nodes, edges }` with optional cached statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphData {
    /// Nodes
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Cached metadata; recomputed on export, never trusted on input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GraphMetadata>,
}

impl GraphData {
    /// Graph from nodes and edges
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            metadata: None,
        }
    }

    /// Count nodes and edges per type
    #[must_use]
    pub fn statistics(&self) -> GraphStatistics {
        let mut stats = GraphStatistics {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            ..GraphStatistics::default()
        };
        for node in &self.nodes {
            *stats.node_types.entry(node.node_type.clone()).or_default() += 1;
        }
        for edge in &self.edges {
            *stats.edge_types.entry(edge.edge_type.clone()).or_default() += 1;
        }
        stats
    }

    /// Replace cached metadata with freshly computed statistics
    #[must_use]
    pub fn with_fresh_statistics(mut self) -> Self {
        self.metadata = Some(GraphMetadata {
            statistics: self.statistics(),
        });
        self
    }

    /// Find a node by id
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Cached graph metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Counts and per-type distributions
    #[serde(default)]
    pub statistics: GraphStatistics,
}

/// Node/edge counts and per-type distributions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatistics {
    /// Total nodes
    pub node_count: usize,
    /// Total edges
    pub edge_count: usize,
    /// Nodes per entity type
    pub node_types: BTreeMap<String, usize>,
    /// Edges per relation type
    pub edge_types: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_deserialize_empty() {
        let node: Node = serde_json::from_value(json!({"type": "Vehicle"})).unwrap();
        assert!(node.id.is_empty());
        assert!(node.label.is_empty());
        assert_eq!(node.node_type, "Vehicle");
    }

    #[test]
    fn field_treats_null_as_absent() {
        let node: Node = serde_json::from_value(json!({
            "id": "VEH-1", "type": "Vehicle", "data": {"priority": null, "status": "ACTIVE"}
        }))
        .unwrap();
        assert!(node.field("priority").is_none());
        assert_eq!(node.field("status"), Some(&json!("ACTIVE")));
    }

    #[test]
    fn statistics_count_per_type() {
        let graph = GraphData::new(
            vec![
                Node::new("VEH-1", "Vehicle"),
                Node::new("VEH-2", "Vehicle"),
                Node::new("DP-1", "DomainProject"),
            ],
            vec![Edge::new("e1", "VEH-1", "has_domain_project", "DP-1")],
        );
        let stats = graph.statistics();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 1);
        assert_eq!(stats.node_types["Vehicle"], 2);
        assert_eq!(stats.edge_types["has_domain_project"], 1);
    }

    #[test]
    fn stale_statistics_are_replaced() {
        let mut graph = GraphData::new(vec![Node::new("A", "T")], vec![]);
        graph.metadata = Some(GraphMetadata {
            statistics: GraphStatistics {
                node_count: 99,
                ..GraphStatistics::default()
            },
        });
        let graph = graph.with_fresh_statistics();
        assert_eq!(graph.metadata.unwrap().statistics.node_count, 1);
    }
}

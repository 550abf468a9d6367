//! Read-side views over one graph payload
//!
//! Filters, neighbor lookups and keyword search. Relation labels come from the
//! bound schema when one is supplied and fall back to the relation code.

use oag_model::{Edge, GraphData, Node, PropertyMap, SchemaDefinition};
use serde::{Deserialize, Serialize};

/// Node selection; empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeFilter {
    /// Only nodes of this entity type
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    /// Only nodes with one of these ids
    pub ids: Option<Vec<String>>,
}

impl NodeFilter {
    /// Nodes of one type
    #[must_use]
    pub fn of_type(node_type: impl Into<String>) -> Self {
        Self {
            node_type: Some(node_type.into()),
            ids: None,
        }
    }

    fn matches(&self, node: &Node) -> bool {
        self.node_type.as_deref().map_or(true, |t| t == node.node_type)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&node.id))
    }
}

/// Edge selection; empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeFilter {
    /// Only edges of this relation type
    #[serde(rename = "type")]
    pub edge_type: Option<String>,
    /// Only edges leaving this node
    pub source: Option<String>,
    /// Only edges entering this node
    pub target: Option<String>,
}

impl EdgeFilter {
    fn matches(&self, edge: &Edge) -> bool {
        self.edge_type.as_deref().map_or(true, |t| t == edge.edge_type)
            && self.source.as_deref().map_or(true, |s| s == edge.source)
            && self.target.as_deref().map_or(true, |t| t == edge.target)
    }
}

/// One edge seen from one of its endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Neighbor {
    /// Edge id
    pub relation_id: String,
    /// Relation type code
    pub relation_type: String,
    /// Schema label of the relation type, or its code
    pub relation_label: String,
    /// Node at the other end; `None` for a dangling edge
    pub node: Option<Node>,
    /// Edge properties
    pub properties: PropertyMap,
}

/// Every relation touching one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectProperties {
    /// Queried node
    pub node_id: String,
    /// Edges leaving the node, with their targets
    pub outgoing: Vec<Neighbor>,
    /// Edges entering the node, with their sources
    pub incoming: Vec<Neighbor>,
}

/// Borrowed query view over a graph
#[derive(Debug, Clone, Copy)]
pub struct GraphQuery<'a> {
    graph: &'a GraphData,
    schema: Option<&'a SchemaDefinition>,
}

impl<'a> GraphQuery<'a> {
    /// View without relation labels
    #[must_use]
    pub fn new(graph: &'a GraphData) -> Self {
        Self { graph, schema: None }
    }

    /// Label relations from `schema`
    #[must_use]
    pub fn with_schema(mut self, schema: &'a SchemaDefinition) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Underlying graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &'a GraphData {
        self.graph
    }

    /// Nodes matching `filter`, in stored order
    pub fn nodes(&self, filter: &NodeFilter) -> Vec<&'a Node> {
        self.graph.nodes.iter().filter(|n| filter.matches(n)).collect()
    }

    /// Edges matching `filter`, in stored order
    pub fn edges(&self, filter: &EdgeFilter) -> Vec<&'a Edge> {
        self.graph.edges.iter().filter(|e| filter.matches(e)).collect()
    }

    /// Node by id
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&'a Node> {
        self.graph.node(id)
    }

    /// Edge by id
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&'a Edge> {
        self.graph.edges.iter().find(|e| e.id == id)
    }

    /// Edges leaving `id`
    pub fn outgoing_edges<'q>(&self, id: &'q str) -> impl Iterator<Item = &'a Edge> + 'q
    where
        'a: 'q,
    {
        let graph = self.graph;
        graph.edges.iter().filter(move |e| e.source == id)
    }

    /// Edges entering `id`
    pub fn incoming_edges<'q>(&self, id: &'q str) -> impl Iterator<Item = &'a Edge> + 'q
    where
        'a: 'q,
    {
        let graph = self.graph;
        graph.edges.iter().filter(move |e| e.target == id)
    }

    /// Targets of the edges leaving `id`
    #[must_use]
    pub fn outgoing(&self, id: &str) -> Vec<Neighbor> {
        self.graph
            .edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| self.neighbor(e, &e.target))
            .collect()
    }

    /// Sources of the edges entering `id`
    #[must_use]
    pub fn incoming(&self, id: &str) -> Vec<Neighbor> {
        self.graph
            .edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| self.neighbor(e, &e.source))
            .collect()
    }

    /// Both directions at once
    #[must_use]
    pub fn object_properties(&self, id: &str) -> ObjectProperties {
        ObjectProperties {
            node_id: id.to_string(),
            outgoing: self.outgoing(id),
            incoming: self.incoming(id),
        }
    }

    /// Schema label of a relation type, or the code itself
    #[must_use]
    pub fn relation_label(&self, code: &str) -> String {
        self.schema
            .and_then(|s| s.relation_type(code))
            .map_or_else(|| code.to_string(), |r| r.display_label().to_string())
    }

    /// Nodes whose id or payload contains `keyword`, ignoring case
    ///
    /// The payload is matched against its JSON text, so keys match as well as
    /// values.
    #[must_use]
    pub fn search(&self, keyword: &str) -> Vec<&'a Node> {
        let needle = keyword.to_lowercase();
        self.graph
            .nodes
            .iter()
            .filter(|n| {
                n.id.to_lowercase().contains(&needle)
                    || serde_json::to_string(&n.data)
                        .is_ok_and(|text| text.to_lowercase().contains(&needle))
            })
            .collect()
    }

    fn neighbor(&self, edge: &Edge, other: &str) -> Neighbor {
        Neighbor {
            relation_id: edge.id.clone(),
            relation_type: edge.edge_type.clone(),
            relation_label: self.relation_label(&edge.edge_type),
            node: self.node(other).cloned(),
            properties: edge.data.clone(),
        }
    }
}

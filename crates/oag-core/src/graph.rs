//! Node and edge editing inside stored graph instances
//!
//! Every write loads the instance under its per-resource lock, applies one
//! structural edit, refreshes the cached statistics and `updatedAt`, and saves.
//! Edits check graph structure (unique ids, existing endpoints) but leave
//! schema conformance to [`OagService::validate_oag`](crate::OagService::validate_oag).

use crate::context::EngineContext;
use crate::error::{OagError, Result};
use crate::oag::OagService;
use crate::query::{EdgeFilter, GraphQuery, NodeFilter, ObjectProperties};
use crate::registry::SchemaRegistry;
use oag_model::{Edge, GraphData, GraphInstance, Node, PropertyMap, ResourceType, SchemaDefinition};
use oag_pipeline::edge_id;
use oag_store::ResourceKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

const NODE_PINNED: [&str; 1] = ["id"];
const EDGE_PINNED: [&str; 4] = ["id", "source", "target", "type"];

/// Counts reported by [`GraphService::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    /// Nodes whose id was new
    pub added_nodes: usize,
    /// Edges whose (source, type, target) was new
    pub added_edges: usize,
    /// Nodes after the merge
    pub total_nodes: usize,
    /// Edges after the merge
    pub total_edges: usize,
}

/// Node and edge access for stored instances
#[derive(Debug, Clone)]
pub struct GraphService {
    ctx: Arc<EngineContext>,
    schemas: SchemaRegistry,
    oags: OagService,
}

impl GraphService {
    /// Service over shared collaborators
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>, schemas: SchemaRegistry, oags: OagService) -> Self {
        Self { ctx, schemas, oags }
    }

    /// Nodes matching `filter`
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance is absent
    pub async fn nodes(&self, oag_id: &str, filter: &NodeFilter) -> Result<Vec<Node>> {
        let instance = self.oags.get_oag(oag_id).await?;
        let query = GraphQuery::new(&instance.data);
        Ok(query.nodes(filter).into_iter().cloned().collect())
    }

    /// Edges matching `filter`
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance is absent
    pub async fn edges(&self, oag_id: &str, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        let instance = self.oags.get_oag(oag_id).await?;
        let query = GraphQuery::new(&instance.data);
        Ok(query.edges(filter).into_iter().cloned().collect())
    }

    /// One node
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance or the node is absent
    pub async fn node(&self, oag_id: &str, node_id: &str) -> Result<Node> {
        let instance = self.oags.get_oag(oag_id).await?;
        instance
            .data
            .node(node_id)
            .cloned()
            .ok_or_else(|| OagError::not_found("node", node_id))
    }

    /// One edge
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance or the edge is absent
    pub async fn edge(&self, oag_id: &str, edge_id: &str) -> Result<Edge> {
        let instance = self.oags.get_oag(oag_id).await?;
        GraphQuery::new(&instance.data)
            .edge(edge_id)
            .cloned()
            .ok_or_else(|| OagError::not_found("edge", edge_id))
    }

    /// Incoming and outgoing relations of a node, labelled from the bound schema
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance or the node is absent
    pub async fn neighbors(&self, oag_id: &str, node_id: &str) -> Result<ObjectProperties> {
        let instance = self.oags.get_oag(oag_id).await?;
        if instance.data.node(node_id).is_none() {
            return Err(OagError::not_found("node", node_id));
        }
        let schema = self.bound_schema(&instance).await;
        let mut query = GraphQuery::new(&instance.data);
        if let Some(schema) = schema.as_deref() {
            query = query.with_schema(schema);
        }
        Ok(query.object_properties(node_id))
    }

    /// Nodes whose id or payload contains `keyword`, ignoring case
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance is absent
    pub async fn search(&self, oag_id: &str, keyword: &str) -> Result<Vec<Node>> {
        let instance = self.oags.get_oag(oag_id).await?;
        Ok(GraphQuery::new(&instance.data)
            .search(keyword)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Append a node
    ///
    /// # Errors
    /// [`OagError::RequiredFieldMissing`] without id or type,
    /// [`OagError::DuplicateResource`] if the id is taken
    #[tracing::instrument(skip(self, node), fields(node_id = %node.id))]
    pub async fn add_node(&self, oag_id: &str, node: Node) -> Result<Node> {
        self.edit(oag_id, |data| add_node(data, node)).await
    }

    /// Shallow-merge `patch` into a node; the id is kept
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the node is absent,
    /// [`OagError::Serialization`] if the patched node is malformed
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_node(&self, oag_id: &str, node_id: &str, patch: PropertyMap) -> Result<Node> {
        self.edit(oag_id, |data| {
            let slot = data
                .nodes
                .iter_mut()
                .find(|n| n.id == node_id)
                .ok_or_else(|| OagError::not_found("node", node_id))?;
            *slot = merge_fields(&*slot, patch, &NODE_PINNED, node_id)?;
            Ok(slot.clone())
        })
        .await
    }

    /// Remove a node and every edge touching it; returns the edges removed
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the node is absent
    #[tracing::instrument(skip(self))]
    pub async fn delete_node(&self, oag_id: &str, node_id: &str) -> Result<usize> {
        self.edit(oag_id, |data| delete_node(data, node_id)).await
    }

    /// Append an edge between existing nodes
    ///
    /// An edge without an id gets the content-derived id of its
    /// (source, type, target) triple.
    ///
    /// # Errors
    /// [`OagError::DanglingEdgeReference`] if an endpoint is absent,
    /// [`OagError::DuplicateResource`] if the id is taken
    #[tracing::instrument(skip(self, edge), fields(source = %edge.source, target = %edge.target))]
    pub async fn add_edge(&self, oag_id: &str, edge: Edge) -> Result<Edge> {
        self.edit(oag_id, |data| add_edge(data, edge)).await
    }

    /// Shallow-merge `patch` into an edge; id, endpoints and type are kept
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the edge is absent
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_edge(&self, oag_id: &str, edge_id: &str, patch: PropertyMap) -> Result<Edge> {
        self.edit(oag_id, |data| {
            let slot = data
                .edges
                .iter_mut()
                .find(|e| e.id == edge_id)
                .ok_or_else(|| OagError::not_found("edge", edge_id))?;
            *slot = merge_fields(&*slot, patch, &EDGE_PINNED, edge_id)?;
            Ok(slot.clone())
        })
        .await
    }

    /// Remove one edge
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the edge is absent
    #[tracing::instrument(skip(self))]
    pub async fn delete_edge(&self, oag_id: &str, edge_id: &str) -> Result<()> {
        self.edit(oag_id, |data| {
            let before = data.edges.len();
            data.edges.retain(|e| e.id != edge_id);
            if data.edges.len() == before {
                return Err(OagError::not_found("edge", edge_id));
            }
            Ok(())
        })
        .await
    }

    /// Merge a batch into an instance, skipping known node ids and edge triples
    ///
    /// The whole batch is checked before anything is added.
    ///
    /// # Errors
    /// [`OagError::RequiredFieldMissing`] if any node lacks id or type, or any
    /// edge lacks source, target or type
    #[tracing::instrument(skip(self, batch), fields(nodes = batch.nodes.len(), edges = batch.edges.len()))]
    pub async fn merge(&self, oag_id: &str, batch: GraphData) -> Result<MergeSummary> {
        let summary = self.edit(oag_id, |data| merge(data, batch)).await?;
        tracing::info!(
            oag = oag_id,
            added_nodes = summary.added_nodes,
            added_edges = summary.added_edges,
            "batch merged"
        );
        Ok(summary)
    }

    async fn edit<T>(&self, oag_id: &str, apply: impl FnOnce(&mut GraphData) -> Result<T>) -> Result<T> {
        let _guard = self.ctx.locks().acquire(ResourceType::Oag, oag_id).await;
        let mut instance = self.oags.get_oag(oag_id).await?;
        let out = apply(&mut instance.data)?;
        instance.data = std::mem::take(&mut instance.data).with_fresh_statistics();
        instance.updated_at = self.ctx.clock().now();
        self.ctx.write(ResourceKind::Oag, &instance.id, &instance).await?;
        Ok(out)
    }

    async fn bound_schema(&self, instance: &GraphInstance) -> Option<Arc<SchemaDefinition>> {
        match self.schemas.get(&instance.schema_id).await {
            Ok(schema) => Some(schema),
            Err(e) => {
                tracing::debug!(schema = %instance.schema_id, error = %e, "relation labels unavailable");
                None
            }
        }
    }
}

fn require(value: &str, what: impl FnOnce() -> String) -> Result<()> {
    if value.is_empty() {
        return Err(OagError::RequiredFieldMissing(what()));
    }
    Ok(())
}

fn check_node(node: &Node) -> Result<()> {
    require(&node.id, || "node id".to_string())?;
    require(&node.node_type, || format!("type of node {}", node.id))
}

fn check_edge(edge: &Edge) -> Result<()> {
    require(&edge.source, || "edge source".to_string())?;
    require(&edge.target, || "edge target".to_string())?;
    require(&edge.edge_type, || format!("type of edge {} -> {}", edge.source, edge.target))
}

fn add_node(data: &mut GraphData, node: Node) -> Result<Node> {
    check_node(&node)?;
    if data.node(&node.id).is_some() {
        return Err(OagError::duplicate("node", node.id));
    }
    data.nodes.push(node.clone());
    Ok(node)
}

fn delete_node(data: &mut GraphData, node_id: &str) -> Result<usize> {
    let before = data.nodes.len();
    data.nodes.retain(|n| n.id != node_id);
    if data.nodes.len() == before {
        return Err(OagError::not_found("node", node_id));
    }
    let edges = data.edges.len();
    data.edges.retain(|e| e.source != node_id && e.target != node_id);
    Ok(edges - data.edges.len())
}

fn add_edge(data: &mut GraphData, mut edge: Edge) -> Result<Edge> {
    check_edge(&edge)?;
    for end in [&edge.source, &edge.target] {
        if data.node(end).is_none() {
            return Err(OagError::DanglingEdgeReference(format!("node {end} not found")));
        }
    }
    if edge.id.is_empty() {
        edge.id = edge_id(&edge.source, &edge.edge_type, &edge.target);
    }
    if data.edges.iter().any(|e| e.id == edge.id) {
        return Err(OagError::duplicate("edge", edge.id));
    }
    data.edges.push(edge.clone());
    Ok(edge)
}

fn merge(data: &mut GraphData, batch: GraphData) -> Result<MergeSummary> {
    batch.nodes.iter().try_for_each(check_node)?;
    batch.edges.iter().try_for_each(check_edge)?;

    let mut node_ids: HashSet<String> = data.nodes.iter().map(|n| n.id.clone()).collect();
    let mut triples: HashSet<(String, String, String)> = data.edges.iter().map(triple).collect();

    let mut summary = MergeSummary::default();
    for node in batch.nodes {
        if node_ids.insert(node.id.clone()) {
            data.nodes.push(node);
            summary.added_nodes += 1;
        }
    }
    for mut edge in batch.edges {
        if triples.insert(triple(&edge)) {
            if edge.id.is_empty() {
                edge.id = edge_id(&edge.source, &edge.edge_type, &edge.target);
            }
            data.edges.push(edge);
            summary.added_edges += 1;
        }
    }
    summary.total_nodes = data.nodes.len();
    summary.total_edges = data.edges.len();
    Ok(summary)
}

fn triple(edge: &Edge) -> (String, String, String) {
    (edge.source.clone(), edge.edge_type.clone(), edge.target.clone())
}

/// Top-level shallow merge that keeps `pinned` fields from `current`
fn merge_fields<T>(current: &T, patch: PropertyMap, pinned: &[&str], id: &str) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = match serde_json::to_value(current) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(OagError::serialization(id.to_string(), "not an object")),
        Err(e) => return Err(OagError::serialization(id.to_string(), e)),
    };
    for (key, value) in patch {
        if !pinned.contains(&key.as_str()) {
            merged.insert(key, value);
        }
    }
    serde_json::from_value(Value::Object(merged))
        .map_err(|e| OagError::serialization(format!("patched {id}"), e))
}

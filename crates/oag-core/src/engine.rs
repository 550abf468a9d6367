//! Engine facade
//!
//! Wires the schema registry, graph instance service, node and edge editing,
//! tracing and version control over one shared [`EngineContext`].

use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::error::{OagError, Result};
use crate::graph::GraphService;
use crate::oag::OagService;
use crate::registry::SchemaRegistry;
use crate::trace::TraceService;
use crate::versioning::{RollbackOptions, SnapshotOptions, VersionControl};
use oag_model::{GraphData, PropertyMap, ResourceType, SchemaDefinition, VersionSnapshot};
use oag_pipeline::{AssembledGraph, AuthoritativeEdges, GraphAssembler};
use oag_validate::{GraphValidator, ValidationReport};
use std::sync::Arc;

/// Schema-governed graph engine
#[derive(Debug, Clone)]
pub struct Engine {
    ctx: Arc<EngineContext>,
    schemas: SchemaRegistry,
    oags: OagService,
    graphs: GraphService,
    traces: TraceService,
    versions: VersionControl,
}

impl Engine {
    /// Engine over an explicit context
    #[must_use]
    pub fn new(ctx: EngineContext) -> Self {
        let ctx = Arc::new(ctx);
        let schemas = SchemaRegistry::new(Arc::clone(&ctx));
        let versions = VersionControl::new(Arc::clone(&ctx));
        let oags = OagService::new(Arc::clone(&ctx), schemas.clone(), versions.clone());
        let graphs = GraphService::new(Arc::clone(&ctx), schemas.clone(), oags.clone());
        let traces = TraceService::new(Arc::clone(&ctx), oags.clone());
        Self {
            ctx,
            schemas,
            oags,
            graphs,
            traces,
            versions,
        }
    }

    /// Engine whose storage is chosen by `config`
    #[must_use]
    pub fn open(config: EngineConfig) -> Self {
        tracing::info!(backend = ?config.backend, data_dir = %config.data_dir.display(), "opening engine");
        Self::new(EngineContext::from_config(config))
    }

    /// Engine over process-local storage
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(EngineConfig::in_memory())
    }

    /// Shared collaborators
    #[inline]
    #[must_use]
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Schema registry
    #[inline]
    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Graph instance lifecycle
    #[inline]
    #[must_use]
    pub fn oags(&self) -> &OagService {
        &self.oags
    }

    /// Node and edge access inside instances
    #[inline]
    #[must_use]
    pub fn graphs(&self) -> &GraphService {
        &self.graphs
    }

    /// Traceability analyses
    #[inline]
    #[must_use]
    pub fn traces(&self) -> &TraceService {
        &self.traces
    }

    /// Version control
    #[inline]
    #[must_use]
    pub fn versions(&self) -> &VersionControl {
        &self.versions
    }

    /// Run the assembly pipeline without storing anything
    ///
    /// # Errors
    /// [`OagError::SchemaNotFound`] if the schema is not stored
    pub async fn assemble(
        &self,
        schema_id: &str,
        records: &[PropertyMap],
        authoritative: Option<&AuthoritativeEdges>,
        type_hint: Option<&str>,
    ) -> Result<AssembledGraph> {
        let schema = self.schemas.get(schema_id).await?;
        let assembler = GraphAssembler::new(self.ctx.clock().today());
        Ok(assembler.assemble(records, &schema, authoritative, type_hint))
    }

    /// Validate a graph against a stored schema
    ///
    /// # Errors
    /// [`OagError::SchemaNotFound`] if the schema is not stored
    pub async fn validate(&self, schema_id: &str, graph: &GraphData) -> Result<ValidationReport> {
        let schema = self.schemas.get(schema_id).await?;
        Ok(GraphValidator::new().validate_graph(graph, &schema))
    }

    /// Capture a stored schema as a version snapshot
    ///
    /// # Errors
    /// [`OagError::SchemaNotFound`] if the schema is not stored
    pub async fn snapshot_schema(&self, schema_id: &str, options: SnapshotOptions) -> Result<VersionSnapshot> {
        let schema = self.schemas.get(schema_id).await?;
        let data = serde_json::to_value(&*schema)
            .map_err(|e| OagError::serialization(format!("schema {schema_id}"), e))?;
        self.versions
            .create_snapshot(schema_id, ResourceType::Schema, data, options)
            .await
    }

    /// Restore a schema from a snapshot and record the restore as a new version
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the snapshot is absent,
    /// [`OagError::Serialization`] if its payload is not a schema
    pub async fn restore_schema(
        &self,
        schema_id: &str,
        version_id: &str,
        options: RollbackOptions,
    ) -> Result<VersionSnapshot> {
        // a payload that is not a schema must leave history untouched
        let target = self
            .versions
            .get_version(schema_id, ResourceType::Schema, version_id)
            .await?;
        let schema: SchemaDefinition = serde_json::from_value(target.data)
            .map_err(|e| OagError::serialization(format!("snapshot {version_id}"), e))?;

        let snapshot = self
            .versions
            .rollback(schema_id, ResourceType::Schema, version_id, options)
            .await?;
        self.schemas.put(schema_id, &schema).await?;
        Ok(snapshot)
    }
}

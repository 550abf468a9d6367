//! Graph instance (OAG) lifecycle
//!
//! Creation from a schema or template, record import through the assembly
//! pipeline, validation, export, listing, patching and deletion. Writes to one
//! instance are serialized through the shared per-resource lock.

use crate::context::EngineContext;
use crate::error::{OagError, Result};
use crate::registry::SchemaRegistry;
use crate::templates::TemplateCatalog;
use crate::versioning::{SnapshotOptions, VersionControl};
use futures::future::join_all;
use oag_model::{
    GraphData, GraphInstance, GraphStatistics, OagStatus, OagSummary, PropertyMap, ResourceType,
    SchemaDefinition, VersionSnapshot,
};
use oag_pipeline::{AssembledGraph, AuthoritativeEdges, GraphAssembler, SkippedRecord};
use oag_store::ResourceKind;
use oag_validate::{AcceptancePolicy, GraphValidator, ValidationReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Fields a patch may not change
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "createdAt"];

/// Caller-supplied instance attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateOptions {
    /// Display name; derived from the schema when absent
    pub name: Option<String>,
    /// Description; derived from the schema id when absent
    pub description: Option<String>,
    /// Creator; `system` when absent
    pub created_by: Option<String>,
    /// Initial status
    pub status: OagStatus,
}

impl CreateOptions {
    /// Options with a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With creator
    #[must_use]
    pub fn with_created_by(mut self, author: impl Into<String>) -> Self {
        self.created_by = Some(author.into());
        self
    }

    /// With status
    #[must_use]
    pub fn with_status(mut self, status: OagStatus) -> Self {
        self.status = status;
        self
    }
}

/// Listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only instances with this status
    pub status: Option<OagStatus>,
    /// Only instances bound to this schema
    pub schema_id: Option<String>,
    /// Page size; the configured default when absent
    pub limit: Option<usize>,
    /// Entries to skip
    pub offset: usize,
}

/// Export encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Indented JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = OagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(OagError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Validation of one stored instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OagValidation {
    /// Validated instance
    pub oag_id: String,
    /// Schema it was validated against
    pub schema_id: String,
    /// Findings
    #[serde(flatten)]
    pub report: ValidationReport,
}

impl OagValidation {
    /// No errors
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }
}

/// Input to [`OagService::import_graph`]
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    /// Raw records
    pub records: Vec<PropertyMap>,
    /// Known edge property values
    pub authoritative: Option<AuthoritativeEdges>,
    /// Type for records the prefix table cannot classify
    pub type_hint: Option<String>,
    /// Attributes of the created instance
    pub options: CreateOptions,
}

/// Result of [`OagService::import_graph`]
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Created instance holding the assembled graph
    pub instance: GraphInstance,
    /// Records that produced no node
    pub skipped: Vec<SkippedRecord>,
    /// Ids of edges referencing nodes outside the import
    pub unresolved: Vec<String>,
    /// Validation of the assembled graph
    pub report: ValidationReport,
}

/// Graph instance lifecycle
#[derive(Debug, Clone)]
pub struct OagService {
    ctx: Arc<EngineContext>,
    schemas: SchemaRegistry,
    versions: VersionControl,
    templates: TemplateCatalog,
    validator: GraphValidator,
}

impl OagService {
    /// Service over shared collaborators
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>, schemas: SchemaRegistry, versions: VersionControl) -> Self {
        Self {
            ctx,
            schemas,
            versions,
            templates: TemplateCatalog::builtin(),
            validator: GraphValidator::new(),
        }
    }

    /// Replace the template catalog
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateCatalog) -> Self {
        self.templates = templates;
        self
    }

    /// Empty instance pre-populated with the schema's type codes
    ///
    /// # Errors
    /// [`OagError::SchemaNotFound`] if the schema is not stored
    #[tracing::instrument(skip(self, options))]
    pub async fn create_from_schema(&self, schema_id: &str, options: CreateOptions) -> Result<GraphInstance> {
        let schema = self.schemas.get(schema_id).await?;
        self.instantiate(schema_id, &schema, options, GraphData::default()).await
    }

    /// Instance from a catalog template
    ///
    /// Caller options override the template's name and description.
    ///
    /// # Errors
    /// [`OagError::TemplateNotFound`] for unknown ids, otherwise as
    /// [`create_from_schema`](Self::create_from_schema)
    pub async fn generate_from_template(&self, template_id: &str, options: CreateOptions) -> Result<GraphInstance> {
        let template = self.templates.get(template_id)?;
        let options = CreateOptions {
            name: options.name.or_else(|| Some(template.name.to_string())),
            description: options.description.or_else(|| Some(template.description.to_string())),
            ..options
        };
        self.create_from_schema(template.schema_id, options).await
    }

    /// One instance per request; failures stay per item
    pub async fn batch_instantiate(
        &self,
        schema_id: &str,
        requests: Vec<CreateOptions>,
    ) -> Vec<Result<GraphInstance>> {
        let results = join_all(
            requests
                .into_iter()
                .map(|options| self.create_from_schema(schema_id, options)),
        )
        .await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(schema = schema_id, total = results.len(), failed, "batch instantiated");
        results
    }

    /// Assemble records into a graph and store it as a new instance
    ///
    /// # Errors
    /// [`OagError::SchemaNotFound`], or the first offending finding when the
    /// configured acceptance policy refuses the assembled graph
    #[tracing::instrument(skip(self, request), fields(records = request.records.len()))]
    pub async fn import_graph(&self, schema_id: &str, request: ImportRequest) -> Result<ImportOutcome> {
        let schema = self.schemas.get(schema_id).await?;
        let assembler = GraphAssembler::new(self.ctx.clock().today());
        let AssembledGraph {
            data,
            skipped,
            unresolved,
        } = assembler.assemble(
            &request.records,
            &schema,
            request.authoritative.as_ref(),
            request.type_hint.as_deref(),
        );

        let report = self.validator.validate_graph(&data, &schema);
        enforce(&report, self.ctx.config().acceptance)?;

        let instance = self
            .instantiate(schema_id, &schema, request.options, data.with_fresh_statistics())
            .await?;
        Ok(ImportOutcome {
            instance,
            skipped,
            unresolved,
            report,
        })
    }

    /// Replace an instance's graph after validating it
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if absent, or the first offending finding
    /// when the acceptance policy refuses the graph
    #[tracing::instrument(skip(self, data), fields(nodes = data.nodes.len(), edges = data.edges.len()))]
    pub async fn replace_graph(&self, oag_id: &str, data: GraphData) -> Result<(GraphInstance, ValidationReport)> {
        let _guard = self.ctx.locks().acquire(ResourceType::Oag, oag_id).await;
        let mut instance = self.get_oag(oag_id).await?;
        let schema = self.schemas.get(&instance.schema_id).await?;

        let report = self.validator.validate_graph(&data, &schema);
        enforce(&report, self.ctx.config().acceptance)?;

        instance.data = data.with_fresh_statistics();
        instance.updated_at = self.ctx.clock().now();
        self.save(&instance).await?;
        Ok((instance, report))
    }

    /// Validate a stored instance against its bound schema
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] or [`OagError::SchemaNotFound`]
    pub async fn validate_oag(&self, oag_id: &str) -> Result<OagValidation> {
        let instance = self.get_oag(oag_id).await?;
        let schema = self.schemas.get(&instance.schema_id).await?;
        let report = self.validator.validate_graph(&instance.data, &schema);
        tracing::info!(
            oag = oag_id,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "instance validated"
        );
        Ok(OagValidation {
            oag_id: instance.id,
            schema_id: instance.schema_id,
            report,
        })
    }

    /// Serialize a full instance, with statistics recomputed
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if absent
    pub async fn export_oag(&self, oag_id: &str, format: ExportFormat) -> Result<String> {
        let mut instance = self.get_oag(oag_id).await?;
        instance.data = std::mem::take(&mut instance.data).with_fresh_statistics();
        let what = || format!("{format} export of {oag_id}");
        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(&instance).map_err(|e| OagError::serialization(what(), e))
            }
            ExportFormat::Yaml => {
                serde_yaml::to_string(&instance).map_err(|e| OagError::serialization(what(), e))
            }
        }
    }

    /// Instance summaries, newest first
    ///
    /// Unreadable entries are logged and left out.
    ///
    /// # Errors
    /// [`OagError::IoFailure`] if the listing itself fails
    pub async fn list_oags(&self, filter: &ListFilter) -> Result<Vec<OagSummary>> {
        let ids = self.ctx.storage().list(ResourceKind::Oag).await?;
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            match self.ctx.read::<GraphInstance>(ResourceKind::Oag, &id).await {
                Ok(Some(instance)) => {
                    let wanted = filter.status.map_or(true, |s| s == instance.status)
                        && filter
                            .schema_id
                            .as_deref()
                            .map_or(true, |s| s == instance.schema_id);
                    if wanted {
                        summaries.push(instance.summary());
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(oag = %id, error = %e, "skipping unreadable instance"),
            }
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let limit = filter.limit.unwrap_or(self.ctx.config().list_limit);
        Ok(summaries.into_iter().skip(filter.offset).take(limit).collect())
    }

    /// Instance by id
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if absent
    pub async fn get_oag(&self, oag_id: &str) -> Result<GraphInstance> {
        self.ctx
            .read(ResourceKind::Oag, oag_id)
            .await?
            .ok_or_else(|| OagError::not_found("oag", oag_id))
    }

    /// Shallow-merge `patch` into an instance
    ///
    /// `id` and `createdAt` are kept; `updatedAt` is always refreshed.
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if absent, [`OagError::Serialization`]
    /// if the patched instance is malformed
    #[tracing::instrument(skip(self, patch), fields(keys = patch.len()))]
    pub async fn update_oag(&self, oag_id: &str, patch: PropertyMap) -> Result<GraphInstance> {
        let _guard = self.ctx.locks().acquire(ResourceType::Oag, oag_id).await;
        let current = self.get_oag(oag_id).await?;

        let mut merged = match serde_json::to_value(&current) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(OagError::serialization(format!("oag {oag_id}"), "not an object")),
            Err(e) => return Err(OagError::serialization(format!("oag {oag_id}"), e)),
        };
        for (key, value) in patch {
            if IMMUTABLE_FIELDS.contains(&key.as_str()) {
                tracing::debug!(field = %key, "ignoring patch of immutable field");
                continue;
            }
            merged.insert(key, value);
        }

        let mut updated: GraphInstance = serde_json::from_value(Value::Object(merged))
            .map_err(|e| OagError::serialization(format!("patched oag {oag_id}"), e))?;
        updated.updated_at = self.ctx.clock().now();
        self.save(&updated).await?;
        Ok(updated)
    }

    /// Copy an instance under a new id
    ///
    /// The copy keeps the source's description, schema binding, creator and
    /// graph; it is named `new_name`, or after the source with a ` (copy)`
    /// suffix, and starts with the default status and fresh timestamps.
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the source is absent
    #[tracing::instrument(skip(self))]
    pub async fn duplicate_oag(&self, oag_id: &str, new_name: Option<&str>) -> Result<GraphInstance> {
        let source = self.get_oag(oag_id).await?;
        let now = self.ctx.clock().now();
        let copy = GraphInstance {
            id: self.ctx.ids().oag_id(),
            name: new_name.map_or_else(|| format!("{} (copy)", source.name), ToString::to_string),
            status: OagStatus::default(),
            created_at: now,
            updated_at: now,
            ..source
        };
        if self.ctx.storage().exists(ResourceKind::Oag, &copy.id).await? {
            return Err(OagError::duplicate("oag", copy.id));
        }
        self.save(&copy).await?;
        tracing::info!(source = oag_id, oag = %copy.id, "instance duplicated");
        Ok(copy)
    }

    /// Delete an instance
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if absent
    #[tracing::instrument(skip(self))]
    pub async fn delete_oag(&self, oag_id: &str) -> Result<()> {
        let _guard = self.ctx.locks().acquire(ResourceType::Oag, oag_id).await;
        self.ctx
            .storage()
            .delete(ResourceKind::Oag, oag_id)
            .await
            .map_err(|e| OagError::from_store(e, || OagError::not_found("oag", oag_id)))?;
        tracing::info!(oag = oag_id, "instance deleted");
        Ok(())
    }

    /// Capture the stored instance as a version snapshot
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if absent
    pub async fn snapshot(&self, oag_id: &str, options: SnapshotOptions) -> Result<VersionSnapshot> {
        let instance = self.get_oag(oag_id).await?;
        let data = serde_json::to_value(&instance)
            .map_err(|e| OagError::serialization(format!("oag {oag_id}"), e))?;
        self.versions
            .create_snapshot(oag_id, ResourceType::Oag, data, options)
            .await
    }

    /// Counts recomputed from the stored graph
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if absent
    pub async fn statistics(&self, oag_id: &str) -> Result<GraphStatistics> {
        Ok(self.get_oag(oag_id).await?.data.statistics())
    }

    async fn instantiate(
        &self,
        schema_id: &str,
        schema: &SchemaDefinition,
        options: CreateOptions,
        data: GraphData,
    ) -> Result<GraphInstance> {
        let now = self.ctx.clock().now();
        let instance = GraphInstance {
            id: self.ctx.ids().oag_id(),
            name: options.name.unwrap_or_else(|| {
                format!("{} Instance", schema.name.as_deref().unwrap_or("OAG"))
            }),
            description: options
                .description
                .unwrap_or_else(|| format!("Instance created from {schema_id}")),
            schema_id: schema_id.to_string(),
            schema_version: schema.version.clone(),
            status: options.status,
            created_by: options.created_by.unwrap_or_else(|| "system".to_string()),
            created_at: now,
            updated_at: now,
            data,
            entity_types: schema.entity_codes(),
            relation_types: schema.relation_codes(),
        };
        if self.ctx.storage().exists(ResourceKind::Oag, &instance.id).await? {
            return Err(OagError::duplicate("oag", instance.id));
        }
        self.save(&instance).await?;
        tracing::info!(oag = %instance.id, schema = schema_id, nodes = instance.data.nodes.len(), "instance created");
        Ok(instance)
    }

    async fn save(&self, instance: &GraphInstance) -> Result<()> {
        self.ctx.write(ResourceKind::Oag, &instance.id, instance).await
    }
}

/// Refuse a graph the policy does not accept, naming the first offending finding
fn enforce(report: &ValidationReport, policy: AcceptancePolicy) -> Result<()> {
    if report.accepts(policy) {
        return Ok(());
    }
    let first = report.errors.first().or_else(|| report.warnings.first());
    tracing::warn!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        ?policy,
        "graph rejected"
    );
    Err(first.map_or_else(
        || OagError::Rejected("graph not accepted".to_string()),
        OagError::from_issue,
    ))
}

//! Schema registry
//!
//! Stored schema definitions by id, fronted by a moka cache. Writes go to
//! storage first and then invalidate the cache entry.

use crate::context::EngineContext;
use crate::error::{OagError, Result};
use moka::future::Cache;
use oag_model::SchemaDefinition;
use oag_store::ResourceKind;
use oag_validate::{analyze_change, lint_schema, ChangeImpact, ValidationReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Listing projection of a stored schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    /// Schema id
    pub id: String,
    /// Declared version
    pub version: String,
    /// Display name
    pub name: Option<String>,
    /// Number of entity types
    pub entity_types: usize,
    /// Number of relation types
    pub relation_types: usize,
}

/// Stored schema definitions
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    ctx: Arc<EngineContext>,
    cache: Cache<String, Arc<SchemaDefinition>>,
}

impl SchemaRegistry {
    /// Registry over the context's storage
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        let cache = Cache::new(ctx.config().schema_cache_capacity);
        Self { ctx, cache }
    }

    /// Schema by id, if stored
    ///
    /// # Errors
    /// [`OagError::IoFailure`] or [`OagError::Serialization`]
    pub async fn find(&self, id: &str) -> Result<Option<Arc<SchemaDefinition>>> {
        if let Some(hit) = self.cache.get(id).await {
            return Ok(Some(hit));
        }
        let Some(schema) = self.ctx.read::<SchemaDefinition>(ResourceKind::Schema, id).await? else {
            return Ok(None);
        };
        let schema = Arc::new(schema);
        self.cache.insert(id.to_string(), Arc::clone(&schema)).await;
        Ok(Some(schema))
    }

    /// Schema by id
    ///
    /// # Errors
    /// [`OagError::SchemaNotFound`] if not stored
    pub async fn get(&self, id: &str) -> Result<Arc<SchemaDefinition>> {
        self.find(id)
            .await?
            .ok_or_else(|| OagError::SchemaNotFound(id.to_string()))
    }

    /// Store a new schema
    ///
    /// # Errors
    /// [`OagError::DuplicateResource`] if `id` is taken
    #[tracing::instrument(skip(self, schema))]
    pub async fn register(&self, id: &str, schema: &SchemaDefinition) -> Result<()> {
        if self.ctx.storage().exists(ResourceKind::Schema, id).await? {
            return Err(OagError::duplicate("schema", id));
        }
        self.store(id, schema).await
    }

    /// Store or replace a schema
    ///
    /// Returns the impact of the change when a previous definition existed.
    ///
    /// # Errors
    /// [`OagError::IoFailure`] or [`OagError::Serialization`]
    #[tracing::instrument(skip(self, schema))]
    pub async fn put(&self, id: &str, schema: &SchemaDefinition) -> Result<Option<ChangeImpact>> {
        let impact = self
            .find(id)
            .await?
            .map(|previous| analyze_change(&previous, schema, None));
        if let Some(impact) = impact.as_ref().filter(|i| !i.is_compatible()) {
            tracing::warn!(schema = id, breaking = impact.breaking.len(), "breaking schema change");
        }
        self.store(id, schema).await?;
        Ok(impact)
    }

    /// Every stored schema, by id
    ///
    /// Unreadable entries are logged and left out.
    ///
    /// # Errors
    /// [`OagError::IoFailure`] if the listing itself fails
    pub async fn list(&self) -> Result<Vec<SchemaSummary>> {
        let ids = self.ctx.storage().list(ResourceKind::Schema).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.find(&id).await {
                Ok(Some(schema)) => out.push(SchemaSummary {
                    version: schema.version.clone(),
                    name: schema.name.clone(),
                    entity_types: schema.entity_types.len(),
                    relation_types: schema.relation_types.len(),
                    id,
                }),
                Ok(None) => {}
                Err(e) => tracing::warn!(schema = %id, error = %e, "skipping unreadable schema"),
            }
        }
        Ok(out)
    }

    /// Delete a schema
    ///
    /// # Errors
    /// [`OagError::SchemaNotFound`] if not stored
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.ctx
            .storage()
            .delete(ResourceKind::Schema, id)
            .await
            .map_err(|e| OagError::from_store(e, || OagError::SchemaNotFound(id.to_string())))?;
        self.cache.invalidate(id).await;
        Ok(())
    }

    /// Lint a stored schema
    ///
    /// # Errors
    /// [`OagError::SchemaNotFound`] if not stored
    pub async fn lint(&self, id: &str) -> Result<ValidationReport> {
        Ok(lint_schema(&*self.get(id).await?))
    }

    async fn store(&self, id: &str, schema: &SchemaDefinition) -> Result<()> {
        self.ctx.write(ResourceKind::Schema, id, schema).await?;
        self.cache.invalidate(id).await;
        tracing::info!(
            schema = id,
            version = %schema.version,
            entity_types = schema.entity_types.len(),
            relation_types = schema.relation_types.len(),
            "schema stored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use oag_model::{EntityTypeDef, PropertyDef, PropertyType};
    use oag_store::MemoryStore;

    fn registry() -> SchemaRegistry {
        let ctx = EngineContext::new(Arc::new(MemoryStore::new()), EngineConfig::in_memory());
        SchemaRegistry::new(Arc::new(ctx))
    }

    fn schema(version: &str) -> SchemaDefinition {
        SchemaDefinition::new(version).with_entity(
            EntityTypeDef::new("Vehicle").with_property("vin", PropertyDef::of(PropertyType::String)),
        )
    }

    #[tokio::test]
    async fn register_then_get() {
        let registry = registry();
        registry.register("core", &schema("1.0.0")).await.unwrap();
        assert_eq!(registry.get("core").await.unwrap().version, "1.0.0");

        let dup = registry.register("core", &schema("1.0.1")).await.unwrap_err();
        assert!(matches!(dup, OagError::DuplicateResource { kind: "schema", .. }));
    }

    #[tokio::test]
    async fn missing_schema() {
        let err = registry().get("nope").await.unwrap_err();
        assert!(matches!(err, OagError::SchemaNotFound(ref id) if id == "nope"));
        let err = registry().remove("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn put_invalidates_cache_and_reports_impact() {
        let registry = registry();
        assert!(registry.put("core", &schema("1.0.0")).await.unwrap().is_none());
        registry.get("core").await.unwrap();

        let impact = registry
            .put("core", &SchemaDefinition::new("2.0.0").with_entity(EntityTypeDef::new("Vehicle")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(impact.breaking.len(), 1);
        assert_eq!(registry.get("core").await.unwrap().version, "2.0.0");
    }

    #[tokio::test]
    async fn list_and_remove() {
        let registry = registry();
        registry.put("b", &schema("1.0.0")).await.unwrap();
        registry.put("a", &schema("1.0.0")).await.unwrap();
        let ids: Vec<_> = registry.list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["a", "b"]);

        registry.remove("a").await.unwrap();
        assert!(registry.find("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lint_stored_schema() {
        let registry = registry();
        registry.put("core", &schema("1.0.0")).await.unwrap();
        assert!(registry.lint("core").await.unwrap().is_valid());
    }
}

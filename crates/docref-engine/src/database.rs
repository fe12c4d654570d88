//! Database wrapper combining the document engine, the catalog, and the
//! reference registry.

use std::sync::Arc;

use async_trait::async_trait;
use docref_core::storage::{DocumentEngine, Record};
use docref_core::{
    Catalog, DeletePolicy, ModelDef, PolicySource, ReferenceDescriptor, ReferenceRegistry,
    SchemaBundle, UpdatePathBuilder,
};
use docref_proto::{DocumentId, Selector};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cascade::{
    CascadeResult, DeletionContext, DeletionMode, DeletionPolicyEngine, DocumentLifecycle,
};
use crate::config::{DatabaseConfig, EngineConfig};
use crate::error::Error;
use crate::store::{DocumentHandle, DocumentStore, SledStore};

/// Database providing documents, models, and reference-aware deletion.
pub struct Database {
    engine: Arc<DocumentEngine>,
    store: Arc<dyn DocumentStore>,
    catalog: Catalog,
    registry: ReferenceRegistry,
    config: EngineConfig,
}

impl Database {
    /// Open a database with the given configuration.
    ///
    /// Models already in the catalog are compiled back into the reference
    /// registry.
    pub fn open(config: DatabaseConfig) -> Result<Self, Error> {
        if !config.is_temporary() {
            std::fs::create_dir_all(&config.data_path)?;
        }

        let engine = Arc::new(DocumentEngine::open(config.storage)?);
        let catalog = Catalog::open(engine.db())?;

        let mut registry = ReferenceRegistry::new();
        for model in catalog.list_models() {
            registry.register(&model);
        }
        info!(
            models = catalog.list_models().len(),
            references = registry.len(),
            "database opened"
        );

        Ok(Self {
            store: Arc::new(SledStore::new(Arc::clone(&engine))),
            engine,
            catalog,
            registry,
            config: config.engine,
        })
    }

    /// Open an in-memory database.
    pub fn open_temporary() -> Result<Self, Error> {
        Self::open(DatabaseConfig::temporary())
    }

    /// Register (or re-declare) a model and compile its references.
    ///
    /// Returns the number of references the model holds.
    pub fn register_model(&mut self, model: ModelDef) -> Result<usize, Error> {
        self.catalog.register(model.clone())?;
        let count = self.registry.register(&model);
        info!(model = %model.name, references = count, "registered model");
        Ok(count)
    }

    /// Register every model of a schema bundle.
    pub fn register_schema(&mut self, bundle: SchemaBundle) -> Result<usize, Error> {
        bundle.validate()?;
        let mut count = 0;
        for model in bundle.models {
            count += self.register_model(model)?;
        }
        Ok(count)
    }

    /// Change the required/cascade flags of a reference field.
    ///
    /// Takes effect for the next deletion; the registry is untouched.
    pub fn set_reference_policy(
        &self,
        model: &str,
        path: &str,
        required: bool,
        cascade: bool,
    ) -> Result<(), Error> {
        Ok(self.catalog.set_reference_flags(model, path, required, cascade)?)
    }

    /// Live policy of a descriptor, if its field still resolves.
    pub fn policy_for(&self, descriptor: &ReferenceDescriptor) -> Option<DeletePolicy> {
        self.catalog.policy_for(descriptor)
    }

    /// Insert a document with a generated identity.
    pub async fn insert(&self, model: &str, data: Value) -> Result<DocumentId, Error> {
        let id = DocumentEngine::generate_id();
        self.insert_with_id(model, id.clone(), data).await?;
        Ok(id)
    }

    /// Insert a document with the given identity.
    pub async fn insert_with_id(
        &self,
        model: &str,
        id: DocumentId,
        data: Value,
    ) -> Result<(), Error> {
        self.require_model(model)?;
        self.store.insert(model, &id, data).await?;
        debug!(model, id = %id, "inserted document");
        Ok(())
    }

    /// Get a document, soft-deleted or not.
    pub async fn get(&self, model: &str, id: &DocumentId) -> Result<Option<Record>, Error> {
        self.store.get(model, id).await
    }

    /// Find documents of a model matching a selector.
    pub async fn find(&self, model: &str, selector: &Selector) -> Result<Vec<DocumentHandle>, Error> {
        self.store.find(model, selector).await
    }

    /// Hard-delete a document, enforcing every inbound reference first.
    pub async fn delete(&self, model: &str, id: &DocumentId) -> Result<CascadeResult, Error> {
        self.require_document(model, id).await?;
        self.delete_document(model, id, &DeletionContext::hard()).await
    }

    /// Move a document into the soft-deleted state.
    pub async fn soft_delete(&self, model: &str, id: &DocumentId) -> Result<CascadeResult, Error> {
        self.transition(model, id, true).await
    }

    /// Move a soft-deleted document back to the live state.
    pub async fn restore(&self, model: &str, id: &DocumentId) -> Result<CascadeResult, Error> {
        self.transition(model, id, false).await
    }

    /// The compiled reference registry.
    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.catalog.flush()?;
        self.engine.flush()?;
        Ok(())
    }

    async fn transition(
        &self,
        model: &str,
        id: &DocumentId,
        target_state: bool,
    ) -> Result<CascadeResult, Error> {
        if !self.catalog.has_soft_delete(model)? {
            return Err(Error::SoftDeleteUnsupported(model.to_string()));
        }
        self.require_document(model, id).await?;
        self.delete_document(model, id, &DeletionContext::soft(target_state))
            .await
    }

    fn require_model(&self, model: &str) -> Result<(), Error> {
        if self.catalog.contains(model) {
            Ok(())
        } else {
            Err(docref_core::Error::UnknownModel(model.to_string()).into())
        }
    }

    async fn require_document(&self, model: &str, id: &DocumentId) -> Result<(), Error> {
        match self.store.get(model, id).await? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound {
                model: model.to_string(),
                id: id.clone(),
            }),
        }
    }

    fn policy_engine(&self) -> DeletionPolicyEngine<'_> {
        DeletionPolicyEngine::new(&self.registry, &self.catalog, self.store.as_ref())
            .with_builder(UpdatePathBuilder::with_style(self.config.query_style))
            .with_max_depth(self.config.max_cascade_depth)
    }

    async fn hard_delete(
        &self,
        model: &str,
        id: &DocumentId,
        ctx: &DeletionContext,
    ) -> Result<CascadeResult, Error> {
        if !ctx.visit(model, id) {
            return Ok(CascadeResult::new());
        }
        if self.store.get(model, id).await?.is_none() {
            debug!(model, id = %id, "document already gone");
            return Ok(CascadeResult::new());
        }

        let mut result = self.policy_engine().on_delete(model, id, ctx, self).await?;

        if self.store.remove(model, id).await? {
            result.deleted.push((model.to_string(), id.clone()));
            info!(model, id = %id, depth = ctx.depth(), "deleted document");
        }
        Ok(result)
    }

    /// Two-phase soft transition: enforce references against the target
    /// state, then commit the flag only if that succeeded.
    async fn soft_transition(
        &self,
        model: &str,
        id: &DocumentId,
        target_state: bool,
        ctx: &DeletionContext,
    ) -> Result<CascadeResult, Error> {
        if !self.catalog.has_soft_delete(model)? {
            warn!(model, id = %id, "model has no soft delete, skipping cascade");
            return Ok(CascadeResult::new());
        }
        // Marked only once the transition can happen; skipped documents stay
        // subject to Block checks.
        if !ctx.visit(model, id) {
            return Ok(CascadeResult::new());
        }

        let Some(record) = self.store.get(model, id).await? else {
            return Ok(CascadeResult::new());
        };
        if record.deleted == target_state {
            debug!(model, id = %id, deleted = target_state, "already in target state");
            return Ok(CascadeResult::new());
        }

        let mut result = self.policy_engine().on_delete(model, id, ctx, self).await?;

        if self.store.set_soft_deleted(model, id, target_state).await? == Some(true) {
            let entry = (model.to_string(), id.clone());
            if target_state {
                result.soft_deleted.push(entry);
            } else {
                result.restored.push(entry);
            }
            info!(
                model,
                id = %id,
                deleted = target_state,
                depth = ctx.depth(),
                "changed soft-delete state"
            );
        }
        Ok(result)
    }
}

#[async_trait]
impl DocumentLifecycle for Database {
    async fn delete_document(
        &self,
        model: &str,
        id: &DocumentId,
        ctx: &DeletionContext,
    ) -> Result<CascadeResult, Error> {
        match ctx.mode() {
            DeletionMode::Hard => self.hard_delete(model, id, ctx).await,
            DeletionMode::Soft { target_state } => {
                self.soft_transition(model, id, target_state, ctx).await
            }
        }
    }
}

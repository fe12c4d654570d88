//! Catalog manager for storing and retrieving model schemas.

use std::collections::HashMap;

use parking_lot::RwLock;
use sled::{Db, Tree};
use tracing::{debug, info};

use super::{FieldDef, ModelDef};
use crate::error::Error;
use crate::reference::{DeletePolicy, PolicySource, ReferenceDescriptor};

/// Tree name for model definitions.
const MODEL_TREE: &str = "catalog:models";

/// The catalog of registered models.
///
/// Definitions are persisted in sled and cached in memory. The cache is the
/// live schema state that deletion policies are read from, so flag changes
/// made through [`Catalog::set_reference_flags`] apply to the next deletion.
pub struct Catalog {
    /// Model definitions tree.
    model_tree: Tree,
    /// Cached model definitions keyed by name.
    models: RwLock<HashMap<String, ModelDef>>,
}

impl Catalog {
    /// Open or create a catalog using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let model_tree = db.open_tree(MODEL_TREE)?;

        let mut models = HashMap::new();
        for entry in model_tree.iter() {
            let (_, bytes) = entry?;
            let model = decode_model(&bytes)?;
            models.insert(model.name.clone(), model);
        }

        if !models.is_empty() {
            info!(models = models.len(), "loaded catalog");
        }

        Ok(Self {
            model_tree,
            models: RwLock::new(models),
        })
    }

    /// Register (or re-declare) a model.
    ///
    /// The definition is validated, persisted, and replaces any previous
    /// definition with the same name.
    pub fn register(&self, model: ModelDef) -> Result<(), Error> {
        model.validate()?;
        self.model_tree
            .insert(model.name.as_bytes(), encode_model(&model)?)?;
        debug!(model = %model.name, fields = model.fields.len(), "stored model definition");
        self.models.write().insert(model.name.clone(), model);
        Ok(())
    }

    /// Get a model definition by name.
    pub fn get_model(&self, name: &str) -> Option<ModelDef> {
        self.models.read().get(name).cloned()
    }

    /// Check if a model is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.read().contains_key(name)
    }

    /// Check if a model has the soft-delete capability.
    pub fn has_soft_delete(&self, name: &str) -> Result<bool, Error> {
        self.models
            .read()
            .get(name)
            .map(ModelDef::has_soft_delete)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// List all model definitions, sorted by name.
    pub fn list_models(&self) -> Vec<ModelDef> {
        let mut models: Vec<ModelDef> = self.models.read().values().cloned().collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }

    /// Resolve the field at a structural path of a model.
    pub fn resolve_field<'a, I>(&self, model: &str, names: I) -> Option<FieldDef>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.models.read().get(model)?.resolve(names).cloned()
    }

    /// Change the required/cascade flags of a reference field in place.
    ///
    /// `path` is the dotted field path (`floors.rooms.house`). The change is
    /// persisted and takes effect for the next deletion without recompiling
    /// the reference graph.
    pub fn set_reference_flags(
        &self,
        model: &str,
        path: &str,
        required: bool,
        cascade: bool,
    ) -> Result<(), Error> {
        let mut models = self.models.write();
        let def = models
            .get_mut(model)
            .ok_or_else(|| Error::UnknownModel(model.to_string()))?;

        let field = def
            .resolve_mut(path.split('.'))
            .filter(|f| f.is_reference())
            .ok_or_else(|| {
                Error::InvalidSchema(format!("no reference field '{}' on '{}'", path, model))
            })?;
        field.required = required;
        field.cascade = cascade;

        self.model_tree.insert(model.as_bytes(), encode_model(def)?)?;
        info!(
            model,
            path,
            policy = %DeletePolicy::from_flags(required, cascade),
            "updated reference policy"
        );
        Ok(())
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.model_tree.flush()?;
        Ok(())
    }
}

impl PolicySource for Catalog {
    fn policy_for(&self, descriptor: &ReferenceDescriptor) -> Option<DeletePolicy> {
        let field = self.resolve_field(&descriptor.source_model, descriptor.path.names())?;
        if field.field_type.reference_target() != Some(descriptor.target_model.as_str()) {
            return None;
        }
        Some(DeletePolicy::from_flags(field.required, field.cascade))
    }
}

fn encode_model(model: &ModelDef) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(model).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode_model(bytes: &[u8]) -> Result<ModelDef, Error> {
    serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
}

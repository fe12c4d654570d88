//! Schema bundle - a set of model definitions loaded together.

use serde::{Deserialize, Serialize};

use super::ModelDef;
use crate::error::Error;

/// A set of model definitions, typically read from a schema file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Model definitions in registration order.
    pub models: Vec<ModelDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model to the bundle.
    pub fn with_model(mut self, model: ModelDef) -> Self {
        self.models.push(model);
        self
    }

    /// Get a model by name.
    pub fn get_model(&self, name: &str) -> Option<&ModelDef> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Validate every model in the bundle.
    pub fn validate(&self) -> Result<(), Error> {
        for model in &self.models {
            model.validate()?;
        }
        Ok(())
    }

    /// Parse and validate a bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let bundle: Self =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        bundle.validate()?;
        Ok(bundle)
    }
}

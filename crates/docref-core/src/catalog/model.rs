//! Model definitions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::field::FieldDef;
use crate::error::Error;

/// A model definition (collection schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    /// Model name (unique within the catalog).
    pub name: String,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
    /// Lifecycle rules.
    #[serde(default)]
    pub lifecycle: LifecycleRules,
}

/// Lifecycle rules for a model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifecycleRules {
    /// Enable soft delete (documents are flagged deleted and can be restored).
    #[serde(default)]
    pub soft_delete: bool,
}

impl ModelDef {
    /// Create a new model definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            lifecycle: LifecycleRules::default(),
        }
    }

    /// Add a field to the model.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Enable soft delete.
    pub fn with_soft_delete(mut self) -> Self {
        self.lifecycle.soft_delete = true;
        self
    }

    /// Get a top-level field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check if this model has soft delete enabled.
    pub fn has_soft_delete(&self) -> bool {
        self.lifecycle.soft_delete
    }

    /// Resolve a field by the names along its structural path.
    ///
    /// Array segments are transparent here: `rooms` followed by `house`
    /// resolves `house` inside the element schema of the `rooms` array.
    pub fn resolve<'a, I>(&self, names: I) -> Option<&FieldDef>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names = names.into_iter();
        let mut current = self.get_field(names.next()?)?;
        for name in names {
            current = current.get_sub_field(name)?;
        }
        Some(current)
    }

    /// Mutable counterpart of [`ModelDef::resolve`].
    pub(crate) fn resolve_mut<'a, I>(&mut self, names: I) -> Option<&mut FieldDef>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names = names.into_iter();
        let first = names.next()?;
        let mut current = self.fields.iter_mut().find(|f| f.name == first)?;
        for name in names {
            current = current.get_sub_field_mut(name)?;
        }
        Some(current)
    }

    /// Validate the schema description.
    ///
    /// Rejects empty names, duplicate field names within one level, and
    /// references without a target.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::InvalidSchema("model name must not be empty".into()));
        }
        validate_fields(&self.name, &self.fields)
    }
}

fn validate_fields(scope: &str, fields: &[FieldDef]) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "empty field name in '{}'",
                scope
            )));
        }
        if field.name.contains('.') {
            return Err(Error::InvalidSchema(format!(
                "field name '{}' in '{}' must not contain '.'",
                field.name, scope
            )));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate field '{}' in '{}'",
                field.name, scope
            )));
        }
        if field.field_type.reference_target() == Some("") {
            return Err(Error::InvalidSchema(format!(
                "reference field '{}' in '{}' has no target model",
                field.name, scope
            )));
        }
        if let Some(sub_fields) = field.field_type.sub_fields() {
            validate_fields(&format!("{}.{}", scope, field.name), sub_fields)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, ScalarType};

    fn building() -> ModelDef {
        ModelDef::new("Building")
            .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::object_array(
                "floors",
                vec![FieldDef::object(
                    "lobby",
                    vec![FieldDef::reference("house", "House")],
                )],
            ))
            .with_soft_delete()
    }

    #[test]
    fn test_model_builder() {
        let model = building();

        assert_eq!(model.name, "Building");
        assert_eq!(model.fields.len(), 2);
        assert!(model.has_soft_delete());
    }

    #[test]
    fn test_resolve_nested() {
        let model = building();

        let house = model.resolve(["floors", "lobby", "house"]).unwrap();
        assert_eq!(house.field_type.reference_target(), Some("House"));

        assert!(model.resolve(["floors", "missing"]).is_none());
        assert!(model.resolve(std::iter::empty::<&str>()).is_none());
    }

    #[test]
    fn test_resolve_mut() {
        let mut model = building();
        model
            .resolve_mut(["floors", "lobby", "house"])
            .unwrap()
            .required = false;

        assert!(!model.resolve(["floors", "lobby", "house"]).unwrap().required);
    }

    #[test]
    fn test_validate_duplicates() {
        let model = ModelDef::new("Room")
            .with_field(FieldDef::reference("house", "House"))
            .with_field(FieldDef::reference("house", "House"));

        assert!(matches!(model.validate(), Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_validate_nested_empty_target() {
        let model = ModelDef::new("Room").with_field(FieldDef::object(
            "meta",
            vec![FieldDef::reference("owner", "")],
        ));

        assert!(model.validate().is_err());
        assert!(building().validate().is_ok());
    }
}

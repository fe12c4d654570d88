//! Field definitions for models.

use serde::{Deserialize, Serialize};

use super::types::FieldType;

fn default_required() -> bool {
    true
}

/// A field definition within a model or a nested sub-schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Whether the field is required. For references this decides between
    /// blocking (or cascading) and nullifying when the target is deleted.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Whether deleting the referenced document deletes this document too.
    /// Only meaningful together with `required`.
    #[serde(default)]
    pub cascade: bool,
}

impl FieldDef {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            cascade: false,
        }
    }

    /// Create an optional field (required = false).
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::new(name, field_type)
        }
    }

    /// Create a required reference to `target`.
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldType::reference(target))
    }

    /// Create a required array of references to `target`.
    pub fn reference_array(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldType::reference_array(target))
    }

    /// Create a nested object field.
    pub fn object(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self::new(name, FieldType::object(fields))
    }

    /// Create an array of objects field.
    pub fn object_array(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self::new(name, FieldType::object_array(fields))
    }

    /// Set the required flag.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Enable cascading deletes from the referenced document.
    pub fn with_cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    /// Check if this field refers to another model.
    pub fn is_reference(&self) -> bool {
        self.field_type.reference_target().is_some()
    }

    /// Look up a direct child of a nested object or array of objects.
    pub fn get_sub_field(&self, name: &str) -> Option<&FieldDef> {
        self.field_type
            .sub_fields()
            .and_then(|fields| fields.iter().find(|f| f.name == name))
    }

    pub(crate) fn get_sub_field_mut(&mut self, name: &str) -> Option<&mut FieldDef> {
        self.field_type
            .sub_fields_mut()
            .and_then(|fields| fields.iter_mut().find(|f| f.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::ScalarType;

    #[test]
    fn test_field_def_builder() {
        let field = FieldDef::reference("house", "House").with_cascade();

        assert_eq!(field.name, "house");
        assert!(field.required);
        assert!(field.cascade);
        assert!(field.is_reference());
    }

    #[test]
    fn test_optional_field() {
        let field = FieldDef::optional("description", FieldType::scalar(ScalarType::String));

        assert!(!field.required);
        assert!(!field.cascade);
        assert!(!field.is_reference());
    }

    #[test]
    fn test_sub_field_lookup() {
        let field = FieldDef::object_array(
            "rooms",
            vec![
                FieldDef::reference("house", "House"),
                FieldDef::new("label", FieldType::scalar(ScalarType::String)),
            ],
        );

        assert!(field.get_sub_field("house").is_some());
        assert!(field.get_sub_field("missing").is_none());
    }

    #[test]
    fn test_serde_defaults() {
        let json = serde_json::json!({
            "name": "house",
            "field_type": {"scalar": {"reference": {"target": "House"}}}
        });
        let field: FieldDef = serde_json::from_value(json).unwrap();

        assert!(field.required);
        assert!(!field.cascade);
    }
}

//! Core type definitions for the catalog.

use serde::{Deserialize, Serialize};

use super::field::FieldDef;

/// Scalar data types a field can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// UTF-8 string.
    String,
    /// Timestamp.
    Timestamp,
    /// Opaque document identity that refers to nothing.
    Id,
    /// Identity of a document of another model.
    Reference {
        /// Name of the referenced model.
        target: String,
    },
}

/// Element type of an array field.
///
/// Arrays of arrays are not representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Array of scalar values.
    Scalar(ScalarType),
    /// Array of structured elements with their own sub-schema.
    Object(Vec<FieldDef>),
}

/// Field types as a closed tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A scalar value.
    Scalar(ScalarType),
    /// A nested object with its own sub-schema.
    Object(Vec<FieldDef>),
    /// An array of scalars or objects.
    Array(ElementType),
}

impl ScalarType {
    /// Create a reference scalar type.
    pub fn reference(target: impl Into<String>) -> Self {
        ScalarType::Reference {
            target: target.into(),
        }
    }

    /// Name of the referenced model, if this is a reference.
    pub fn reference_target(&self) -> Option<&str> {
        match self {
            ScalarType::Reference { target } => Some(target),
            _ => None,
        }
    }
}

impl FieldType {
    /// Create a scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create a single reference field type.
    pub fn reference(target: impl Into<String>) -> Self {
        FieldType::Scalar(ScalarType::reference(target))
    }

    /// Create an array of references field type.
    pub fn reference_array(target: impl Into<String>) -> Self {
        FieldType::Array(ElementType::Scalar(ScalarType::reference(target)))
    }

    /// Create a nested object field type.
    pub fn object(fields: Vec<FieldDef>) -> Self {
        FieldType::Object(fields)
    }

    /// Create an array of objects field type.
    pub fn object_array(fields: Vec<FieldDef>) -> Self {
        FieldType::Array(ElementType::Object(fields))
    }

    /// Check if this type is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array(_))
    }

    /// Referenced model name for a scalar reference or an array of references.
    pub fn reference_target(&self) -> Option<&str> {
        match self {
            FieldType::Scalar(s) | FieldType::Array(ElementType::Scalar(s)) => s.reference_target(),
            _ => None,
        }
    }

    /// Sub-schema for nested objects and arrays of objects.
    pub fn sub_fields(&self) -> Option<&[FieldDef]> {
        match self {
            FieldType::Object(fields) | FieldType::Array(ElementType::Object(fields)) => {
                Some(fields)
            }
            _ => None,
        }
    }

    /// Mutable sub-schema for nested objects and arrays of objects.
    pub(crate) fn sub_fields_mut(&mut self) -> Option<&mut Vec<FieldDef>> {
        match self {
            FieldType::Object(fields) | FieldType::Array(ElementType::Object(fields)) => {
                Some(fields)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_targets() {
        assert_eq!(FieldType::reference("House").reference_target(), Some("House"));
        assert_eq!(
            FieldType::reference_array("House").reference_target(),
            Some("House")
        );
        assert_eq!(FieldType::scalar(ScalarType::String).reference_target(), None);
        assert_eq!(FieldType::object(vec![]).reference_target(), None);
    }

    #[test]
    fn test_array_checks() {
        assert!(FieldType::reference_array("House").is_array());
        assert!(FieldType::object_array(vec![]).is_array());
        assert!(!FieldType::reference("House").is_array());
    }

    #[test]
    fn test_sub_fields() {
        let nested = FieldType::object(vec![FieldDef::reference("house", "House")]);
        assert_eq!(nested.sub_fields().map(|f| f.len()), Some(1));
        assert!(FieldType::reference("House").sub_fields().is_none());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(FieldType::reference_array("House")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"array": {"scalar": {"reference": {"target": "House"}}}})
        );

        let decoded: FieldType = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, FieldType::reference_array("House"));
    }
}

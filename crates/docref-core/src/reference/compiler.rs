//! Reference graph compiler.

use crate::catalog::{ElementType, FieldDef, FieldType, ModelDef};

use super::descriptor::{Cardinality, ReferenceDescriptor};
use super::path::{FieldPath, SegmentKind};

/// Walks a model's schema tree and emits one descriptor per reference field.
pub struct ReferenceCompiler;

impl ReferenceCompiler {
    /// Compile every reference field of `model`, in field declaration order.
    ///
    /// Nested objects extend the path with a scalar segment and arrays of
    /// objects with an array segment; there is no depth limit.
    pub fn compile(model: &ModelDef) -> Vec<ReferenceDescriptor> {
        let mut descriptors = Vec::new();
        Self::visit(&model.name, &model.fields, &FieldPath::root(), &mut descriptors);
        descriptors
    }

    fn visit(
        source: &str,
        fields: &[FieldDef],
        prefix: &FieldPath,
        descriptors: &mut Vec<ReferenceDescriptor>,
    ) {
        for field in fields {
            match &field.field_type {
                FieldType::Scalar(scalar) => {
                    if let Some(target) = scalar.reference_target() {
                        descriptors.push(ReferenceDescriptor::new(
                            source,
                            target,
                            prefix.child(&field.name, SegmentKind::Scalar),
                            Cardinality::Single,
                        ));
                    }
                }
                FieldType::Array(ElementType::Scalar(scalar)) => {
                    if let Some(target) = scalar.reference_target() {
                        descriptors.push(ReferenceDescriptor::new(
                            source,
                            target,
                            prefix.child(&field.name, SegmentKind::ArrayElement),
                            Cardinality::Array,
                        ));
                    }
                }
                FieldType::Array(ElementType::Object(sub_fields)) => {
                    let path = prefix.child(&field.name, SegmentKind::ArrayElement);
                    Self::visit(source, sub_fields, &path, descriptors);
                }
                FieldType::Object(sub_fields) => {
                    let path = prefix.child(&field.name, SegmentKind::Scalar);
                    Self::visit(source, sub_fields, &path, descriptors);
                }
            }
        }
    }
}

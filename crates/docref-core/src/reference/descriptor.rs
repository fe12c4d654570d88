//! Reference descriptors and deletion policies.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::path::FieldPath;

/// Shape of the value at the end of a reference path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// The field holds one identity.
    Single,
    /// The field is an array of bare identities.
    Array,
}

/// What happens to referencing documents when the target is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeletePolicy {
    /// Refuse the deletion while referencing documents exist.
    Block,
    /// Delete (or soft-delete) the referencing documents too.
    Cascade,
    /// Detach the reference from the referencing documents.
    Nullify,
}

impl DeletePolicy {
    /// Derive the policy from a field's required/cascade flags.
    pub fn from_flags(required: bool, cascade: bool) -> Self {
        match (required, cascade) {
            (true, false) => DeletePolicy::Block,
            (true, true) => DeletePolicy::Cascade,
            (false, _) => DeletePolicy::Nullify,
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeletePolicy::Block => "block",
            DeletePolicy::Cascade => "cascade",
            DeletePolicy::Nullify => "nullify",
        };
        f.write_str(name)
    }
}

/// A compiled reference from one model's field to another model.
///
/// The policy is intentionally absent: it is looked up through a
/// [`PolicySource`] each time a deletion is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    /// Model holding the reference.
    pub source_model: String,
    /// Model being referenced.
    pub target_model: String,
    /// Structural path to the reference field.
    pub path: FieldPath,
    /// Single identity or array of identities.
    pub cardinality: Cardinality,
}

impl ReferenceDescriptor {
    /// Create a descriptor.
    pub fn new(
        source_model: impl Into<String>,
        target_model: impl Into<String>,
        path: FieldPath,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            source_model: source_model.into(),
            target_model: target_model.into(),
            path,
            cardinality,
        }
    }

    /// Identity under which re-registration replaces a descriptor.
    pub fn identity(&self) -> (&str, &FieldPath) {
        (&self.source_model, &self.path)
    }
}

impl fmt::Display for ReferenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.source_model, self.path, self.target_model)
    }
}

/// Resolves the live deletion policy of a descriptor.
///
/// Returns `None` when the field no longer exists or no longer refers to the
/// descriptor's target, in which case the descriptor is ignored.
pub trait PolicySource: Send + Sync {
    /// Current policy for `descriptor`.
    fn policy_for(&self, descriptor: &ReferenceDescriptor) -> Option<DeletePolicy>;
}

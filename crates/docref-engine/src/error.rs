//! Engine error types.

use docref_proto::DocumentId;
use thiserror::Error;

/// A deletion refused because a live document still holds a required,
/// non-cascading reference to the target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "cannot delete {target_model}/{target_id}: {source_model}/{blocking_document_id} \
     references it through '{path}'"
)]
pub struct RefConstraintError {
    /// Model holding the blocking reference.
    pub source_model: String,
    /// Structural path of the reference field (`rooms[].house`).
    pub path: String,
    /// Identity of the blocking document.
    pub blocking_document_id: DocumentId,
    /// Model of the document whose deletion was refused.
    pub target_model: String,
    /// Identity of the document whose deletion was refused.
    pub target_id: DocumentId,
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Deletion refused by a blocking reference.
    #[error(transparent)]
    Constraint(#[from] RefConstraintError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] docref_core::Error),

    /// Document does not exist.
    #[error("document not found: {model}/{id}")]
    NotFound {
        /// Model name.
        model: String,
        /// Document identity.
        id: DocumentId,
    },

    /// Soft delete or restore requested on a model without the capability.
    #[error("model '{0}' does not support soft delete")]
    SoftDeleteUnsupported(String),

    /// Cascade recursion went deeper than the configured limit.
    #[error("cascade depth {depth} exceeds limit {limit}")]
    CascadeDepthExceeded {
        /// Depth reached.
        depth: usize,
        /// Configured limit.
        limit: usize,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The blocking reference, if this is a constraint violation.
    pub fn as_constraint(&self) -> Option<&RefConstraintError> {
        match self {
            Error::Constraint(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this error is a constraint violation.
    pub fn is_constraint(&self) -> bool {
        self.as_constraint().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_message() {
        let err = Error::from(RefConstraintError {
            source_model: "Room".into(),
            path: "house".into(),
            blocking_document_id: DocumentId::new("r1"),
            target_model: "House".into(),
            target_id: DocumentId::new("h1"),
        });

        assert!(err.is_constraint());
        assert_eq!(
            err.to_string(),
            "cannot delete House/h1: Room/r1 references it through 'house'"
        );
    }
}

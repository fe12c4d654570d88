//! Deletion policy engine.
//!
//! For a document being deleted (hard) or moved between the live and
//! soft-deleted states, this module walks every reference that points at the
//! document's model and applies the reference's live policy:
//! - Block: refuse while a live referencing document exists
//! - Cascade: re-run the same deletion on every referencing document
//! - Nullify: detach the reference from every referencing document

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use docref_core::{
    DeletePolicy, PolicySource, ReferenceDescriptor, ReferenceRegistry, UpdatePathBuilder,
};
use docref_proto::DocumentId;
use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::error::{Error, RefConstraintError};
use crate::store::DocumentStore;

/// Default maximum cascade depth.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 100;

/// What kind of deletion is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionMode {
    /// The document is removed.
    Hard,
    /// The document's soft-delete flag moves to `target_state`
    /// (`true` = deleted, `false` = restored).
    Soft {
        /// State being entered.
        target_state: bool,
    },
}

/// Per-call deletion state, shared by every cascade the call triggers.
#[derive(Debug, Clone)]
pub struct DeletionContext {
    mode: DeletionMode,
    depth: usize,
    visited: Arc<DashSet<(String, DocumentId)>>,
}

impl DeletionContext {
    /// Context for a hard delete.
    pub fn hard() -> Self {
        Self::new(DeletionMode::Hard)
    }

    /// Context for a soft-delete transition into `target_state`.
    pub fn soft(target_state: bool) -> Self {
        Self::new(DeletionMode::Soft { target_state })
    }

    fn new(mode: DeletionMode) -> Self {
        Self {
            mode,
            depth: 0,
            visited: Arc::new(DashSet::new()),
        }
    }

    /// The deletion mode.
    pub fn mode(&self) -> DeletionMode {
        self.mode
    }

    /// Check if this is a soft-delete transition (either direction).
    pub fn is_soft_delete(&self) -> bool {
        matches!(self.mode, DeletionMode::Soft { .. })
    }

    /// The soft-delete state being entered; `false` for hard deletes.
    pub fn target_soft_state(&self) -> bool {
        matches!(self.mode, DeletionMode::Soft { target_state: true })
    }

    /// Cascade depth of this context (0 for the document the caller named).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for documents reached through a cascade from this one.
    pub fn descend(&self) -> Self {
        Self {
            mode: self.mode,
            depth: self.depth + 1,
            visited: Arc::clone(&self.visited),
        }
    }

    /// Mark a document as deleted or transitioned by this call. Returns
    /// `false` if it was already marked.
    ///
    /// Only documents that will actually change may be marked; marked
    /// documents are exempt from Block checks for the rest of the call.
    pub fn visit(&self, model: &str, id: &DocumentId) -> bool {
        self.visited.insert((model.to_string(), id.clone()))
    }

    /// Check if a document is already being handled by this call.
    pub fn is_visited(&self, model: &str, id: &DocumentId) -> bool {
        self.visited.contains(&(model.to_string(), id.clone()))
    }

    /// Block is enforced on hard deletes and on soft deletes, never on restores.
    fn enforces_block(&self) -> bool {
        match self.mode {
            DeletionMode::Hard => true,
            DeletionMode::Soft { target_state } => target_state,
        }
    }
}

/// A nullified reference field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullifiedPath {
    /// Model holding the reference.
    pub source_model: String,
    /// Structural path of the reference field.
    pub path: String,
    /// Documents modified.
    pub modified: u64,
}

/// Result of a deletion and everything it cascaded into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeResult {
    /// Documents that were removed.
    pub deleted: Vec<(String, DocumentId)>,
    /// Documents moved into the soft-deleted state.
    pub soft_deleted: Vec<(String, DocumentId)>,
    /// Documents moved back to the live state.
    pub restored: Vec<(String, DocumentId)>,
    /// Reference fields that were set to null or pulled.
    pub nullified: Vec<NullifiedPath>,
}

impl CascadeResult {
    /// Create an empty cascade result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: CascadeResult) {
        self.deleted.extend(other.deleted);
        self.soft_deleted.extend(other.soft_deleted);
        self.restored.extend(other.restored);
        self.nullified.extend(other.nullified);
    }

    /// Get the total number of affected documents.
    pub fn affected_count(&self) -> u64 {
        (self.deleted.len() + self.soft_deleted.len() + self.restored.len()) as u64
            + self.nullified.iter().map(|n| n.modified).sum::<u64>()
    }

    /// Check if the document was removed by this deletion.
    pub fn was_deleted(&self, model: &str, id: &DocumentId) -> bool {
        self.deleted.iter().any(|(m, i)| m == model && i == id)
    }
}

/// The deletion entry point cascades re-enter.
///
/// Cascaded documents go through the same path as documents named by a
/// caller, so their own inbound references are policy-checked in turn.
#[async_trait]
pub trait DocumentLifecycle: Send + Sync {
    /// Delete (or transition) one document according to `ctx`.
    async fn delete_document(
        &self,
        model: &str,
        id: &DocumentId,
        ctx: &DeletionContext,
    ) -> Result<CascadeResult, Error>;
}

/// Applies reference policies for one deletion.
pub struct DeletionPolicyEngine<'a> {
    registry: &'a ReferenceRegistry,
    policies: &'a dyn PolicySource,
    store: &'a dyn DocumentStore,
    builder: UpdatePathBuilder,
    max_depth: usize,
}

impl<'a> DeletionPolicyEngine<'a> {
    /// Create a new deletion policy engine.
    pub fn new(
        registry: &'a ReferenceRegistry,
        policies: &'a dyn PolicySource,
        store: &'a dyn DocumentStore,
    ) -> Self {
        Self {
            registry,
            policies,
            store,
            builder: UpdatePathBuilder::new(),
            max_depth: DEFAULT_MAX_CASCADE_DEPTH,
        }
    }

    /// Use the given builder for selectors and mutations.
    pub fn with_builder(mut self, builder: UpdatePathBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Set the maximum cascade depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enforce every inbound reference of `model` for the deletion of `id`.
    ///
    /// Must run before the document itself is removed or its soft-delete
    /// state is committed; an error means nothing should be committed for
    /// this document. Every Block reference is checked before any Cascade or
    /// Nullify side effect of this call. Cascades already completed when a
    /// deeper cascade fails are not undone.
    pub async fn on_delete(
        &self,
        model: &str,
        id: &DocumentId,
        ctx: &DeletionContext,
        lifecycle: &dyn DocumentLifecycle,
    ) -> Result<CascadeResult, Error> {
        if ctx.depth() > self.max_depth {
            return Err(Error::CascadeDepthExceeded {
                depth: ctx.depth(),
                limit: self.max_depth,
            });
        }

        // Read policies from the live schema; dropped or re-targeted fields
        // resolve to None.
        let resolved: Vec<(&ReferenceDescriptor, DeletePolicy)> = self
            .registry
            .references_to(model)
            .iter()
            .filter_map(|d| self.policies.policy_for(d).map(|p| (d, p)))
            .collect();

        if ctx.enforces_block() {
            for (descriptor, _) in resolved.iter().filter(|(_, p)| *p == DeletePolicy::Block) {
                self.check_block(descriptor, id, ctx).await?;
            }
        }

        let mut result = CascadeResult::new();
        for (descriptor, policy) in resolved {
            debug!(
                target_model = model,
                id = %id,
                reference = %descriptor,
                policy = %policy,
                mode = ?ctx.mode(),
                "evaluating reference"
            );
            match policy {
                DeletePolicy::Block => {}
                DeletePolicy::Cascade => {
                    result.merge(self.cascade(descriptor, id, ctx, lifecycle).await?);
                }
                DeletePolicy::Nullify if !ctx.is_soft_delete() => {
                    result.nullified.push(self.nullify(descriptor, id).await?);
                }
                DeletePolicy::Nullify => {}
            }
        }

        Ok(result)
    }

    async fn check_block(
        &self,
        descriptor: &ReferenceDescriptor,
        id: &DocumentId,
        ctx: &DeletionContext,
    ) -> Result<(), Error> {
        let selector = self.builder.build_query(descriptor, id);
        let handles = self.store.find(&descriptor.source_model, &selector).await?;

        // Documents this call is already deleting never block. Soft-deleted
        // referrers are ignored by soft deletes only; a hard delete would leave
        // them dangling once restored.
        let blocker = handles.into_iter().find(|h| {
            !(ctx.is_soft_delete() && h.soft_deleted) && !ctx.is_visited(&h.model, &h.id)
        });

        match blocker {
            Some(handle) => {
                warn!(
                    target_model = %descriptor.target_model,
                    id = %id,
                    blocked_by = %descriptor.source_model,
                    blocking_id = %handle.id,
                    path = %descriptor.path,
                    "deletion blocked by reference"
                );
                Err(RefConstraintError {
                    source_model: descriptor.source_model.clone(),
                    path: descriptor.path.to_string(),
                    blocking_document_id: handle.id,
                    target_model: descriptor.target_model.clone(),
                    target_id: id.clone(),
                }
                .into())
            }
            None => Ok(()),
        }
    }

    async fn cascade(
        &self,
        descriptor: &ReferenceDescriptor,
        id: &DocumentId,
        ctx: &DeletionContext,
        lifecycle: &dyn DocumentLifecycle,
    ) -> Result<CascadeResult, Error> {
        let selector = self.builder.build_query(descriptor, id);
        let handles = self.store.find(&descriptor.source_model, &selector).await?;
        if handles.is_empty() {
            return Ok(CascadeResult::new());
        }

        debug!(
            reference = %descriptor,
            id = %id,
            documents = handles.len(),
            "cascading"
        );

        let child = ctx.descend();
        let results = try_join_all(
            handles
                .iter()
                .map(|h| lifecycle.delete_document(&h.model, &h.id, &child)),
        )
        .await?;

        let mut result = CascadeResult::new();
        for r in results {
            result.merge(r);
        }
        Ok(result)
    }

    async fn nullify(
        &self,
        descriptor: &ReferenceDescriptor,
        id: &DocumentId,
    ) -> Result<NullifiedPath, Error> {
        let selector = self.builder.build_query(descriptor, id);
        let mutation = self.builder.build_mutation(descriptor, id);
        let modified = self
            .store
            .update_many(&descriptor.source_model, &selector, &mutation)
            .await?;

        debug!(reference = %descriptor, id = %id, modified, "nullified references");
        Ok(NullifiedPath {
            source_model: descriptor.source_model.clone(),
            path: descriptor.path.to_string(),
            modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_modes() {
        let hard = DeletionContext::hard();
        assert!(!hard.is_soft_delete());
        assert!(!hard.target_soft_state());
        assert!(hard.enforces_block());

        let soft = DeletionContext::soft(true);
        assert!(soft.is_soft_delete());
        assert!(soft.target_soft_state());
        assert!(soft.enforces_block());

        let restore = DeletionContext::soft(false);
        assert!(restore.is_soft_delete());
        assert!(!restore.target_soft_state());
        assert!(!restore.enforces_block());
    }

    #[test]
    fn test_descend_shares_visited() {
        let ctx = DeletionContext::hard();
        let h1 = DocumentId::new("h1");
        assert!(ctx.visit("House", &h1));

        let child = ctx.descend().descend();
        assert_eq!(child.depth(), 2);
        assert_eq!(child.mode(), DeletionMode::Hard);
        assert!(child.is_visited("House", &h1));
        assert!(!child.visit("House", &h1));
        assert!(child.visit("Room", &h1));
        assert!(ctx.is_visited("Room", &h1));
    }

    #[test]
    fn test_cascade_result_merge() {
        let mut result = CascadeResult::new();
        result.deleted.push(("House".into(), DocumentId::new("h1")));

        let mut child = CascadeResult::new();
        child.deleted.push(("Room".into(), DocumentId::new("r1")));
        child.nullified.push(NullifiedPath {
            source_model: "Street".into(),
            path: "houses[]".into(),
            modified: 3,
        });
        result.merge(child);

        assert_eq!(result.affected_count(), 5);
        assert!(result.was_deleted("Room", &DocumentId::new("r1")));
        assert!(!result.was_deleted("Room", &DocumentId::new("h1")));
    }
}

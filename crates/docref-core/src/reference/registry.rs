//! Reverse index from target model to inbound references.

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::ModelDef;

use super::compiler::ReferenceCompiler;
use super::descriptor::ReferenceDescriptor;

/// Reverse index of compiled references, keyed by target model name.
///
/// Built once while models are registered, then shared read-only with the
/// deletion engine. Registration is idempotent under the descriptor identity
/// `(source_model, path)` and never prunes descriptors.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistry {
    by_target: HashMap<String, Vec<ReferenceDescriptor>>,
}

impl ReferenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `model` and register its references.
    ///
    /// Returns the number of descriptors the model contributed.
    pub fn register(&mut self, model: &ModelDef) -> usize {
        let descriptors = ReferenceCompiler::compile(model);
        let count = descriptors.len();
        for descriptor in descriptors {
            self.insert(descriptor);
        }
        debug!(model = %model.name, references = count, "registered model references");
        count
    }

    /// Insert one descriptor, replacing any descriptor with the same identity.
    ///
    /// Returns `true` if no descriptor with that identity existed.
    pub fn insert(&mut self, descriptor: ReferenceDescriptor) -> bool {
        if let Some(bucket) = self.by_target.get_mut(&descriptor.target_model) {
            if let Some(existing) = bucket
                .iter_mut()
                .find(|d| d.identity() == descriptor.identity())
            {
                *existing = descriptor;
                return false;
            }
        }

        // The field may have been re-declared against a different target.
        let mut moved = false;
        for (target, bucket) in self.by_target.iter_mut() {
            if *target == descriptor.target_model {
                continue;
            }
            let before = bucket.len();
            bucket.retain(|d| d.identity() != descriptor.identity());
            moved |= bucket.len() != before;
        }

        self.by_target
            .entry(descriptor.target_model.clone())
            .or_default()
            .push(descriptor);
        !moved
    }

    /// All descriptors whose target is `model`, in registration order.
    pub fn references_to(&self, model: &str) -> &[ReferenceDescriptor] {
        self.by_target
            .get(model)
            .map(|bucket| bucket.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over every registered descriptor.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDescriptor> {
        self.by_target.values().flatten()
    }

    /// Names of models that are referenced by at least one descriptor.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self
            .by_target
            .iter()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(target, _)| target.as_str())
            .collect();
        targets.sort_unstable();
        targets
    }

    /// Total number of descriptors.
    pub fn len(&self) -> usize {
        self.by_target.values().map(Vec::len).sum()
    }

    /// Check if no descriptors are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

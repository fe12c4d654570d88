//! Document store collaborator.
//!
//! The deletion policy engine only talks to the store through
//! [`DocumentStore`]; [`SledStore`] is the binding to the sled-backed
//! [`DocumentEngine`].

use std::sync::Arc;

use async_trait::async_trait;
use docref_core::storage::{DocumentEngine, Record};
use docref_proto::{DocumentId, MutationInstruction, Selector};
use serde_json::Value;
use tracing::debug;

use crate::error::Error;

/// A document located by a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    /// Model the document belongs to.
    pub model: String,
    /// Document identity.
    pub id: DocumentId,
    /// Whether the document is currently soft-deleted.
    pub soft_deleted: bool,
}

/// Operations the deletion engine needs from a document store.
///
/// Each single-document operation must be atomic; nothing here spans
/// documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find every document of `model` matching `selector`.
    async fn find(&self, model: &str, selector: &Selector) -> Result<Vec<DocumentHandle>, Error>;

    /// Apply `mutation` to every document of `model` matching `selector`.
    ///
    /// Returns the number of documents modified.
    async fn update_many(
        &self,
        model: &str,
        selector: &Selector,
        mutation: &MutationInstruction,
    ) -> Result<u64, Error>;

    /// Fetch a document, soft-deleted or not.
    async fn get(&self, model: &str, id: &DocumentId) -> Result<Option<Record>, Error>;

    /// Insert a new document.
    async fn insert(&self, model: &str, id: &DocumentId, data: Value) -> Result<(), Error>;

    /// Remove a document. Returns `false` if it did not exist.
    async fn remove(&self, model: &str, id: &DocumentId) -> Result<bool, Error>;

    /// Commit a soft-delete state.
    ///
    /// Returns `None` if the document does not exist, otherwise whether the
    /// state changed.
    async fn set_soft_deleted(
        &self,
        model: &str,
        id: &DocumentId,
        deleted: bool,
    ) -> Result<Option<bool>, Error>;
}

/// [`DocumentStore`] over the sled document engine.
#[derive(Clone)]
pub struct SledStore {
    engine: Arc<DocumentEngine>,
}

impl SledStore {
    /// Wrap a document engine.
    pub fn new(engine: Arc<DocumentEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn find(&self, model: &str, selector: &Selector) -> Result<Vec<DocumentHandle>, Error> {
        let found = self.engine.find(model, selector)?;
        Ok(found
            .into_iter()
            .map(|(id, record)| DocumentHandle {
                model: model.to_string(),
                id,
                soft_deleted: record.deleted,
            })
            .collect())
    }

    async fn update_many(
        &self,
        model: &str,
        selector: &Selector,
        mutation: &MutationInstruction,
    ) -> Result<u64, Error> {
        let modified = self.engine.update_many(model, selector, mutation)?;
        debug!(model, %mutation, modified, "applied bulk update");
        Ok(modified as u64)
    }

    async fn get(&self, model: &str, id: &DocumentId) -> Result<Option<Record>, Error> {
        Ok(self.engine.get(model, id)?)
    }

    async fn insert(&self, model: &str, id: &DocumentId, data: Value) -> Result<(), Error> {
        Ok(self.engine.insert(model, id, data)?)
    }

    async fn remove(&self, model: &str, id: &DocumentId) -> Result<bool, Error> {
        Ok(self.engine.remove(model, id)?.is_some())
    }

    async fn set_soft_deleted(
        &self,
        model: &str,
        id: &DocumentId,
        deleted: bool,
    ) -> Result<Option<bool>, Error> {
        Ok(self.engine.set_deleted(model, id, deleted)?)
    }
}

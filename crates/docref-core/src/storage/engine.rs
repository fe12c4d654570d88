//! Document engine implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use docref_proto::{DocumentId, MutationInstruction, Selector};
use serde_json::Value;
use sled::{Db, IVec, Tree};
use tracing::trace;

use super::{MutationApplier, Record, StorageConfig};
use crate::error::Error;
use crate::query::SelectorEvaluator;

/// Tree name prefix for per-model document trees.
const DOCS_PREFIX: &str = "docs:";

/// The document engine wrapping sled.
///
/// Documents of a model live in the tree `docs:<model>`, keyed by the UTF-8
/// bytes of their identity. Partial updates are applied with compare-and-swap
/// and retried on conflict, so each document is updated atomically.
pub struct DocumentEngine {
    /// The underlying sled database.
    db: Db,
}

impl DocumentEngine {
    /// Open or create a document engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        Ok(Self { db })
    }

    /// Insert a new document.
    ///
    /// Fails with [`Error::InvalidData`] if a document with this identity
    /// already exists in the model.
    pub fn insert(&self, model: &str, id: &DocumentId, data: Value) -> Result<(), Error> {
        let record = Record::new(data);
        let swapped = self.tree(model)?.compare_and_swap(
            id.as_bytes(),
            None as Option<&[u8]>,
            Some(record.to_bytes()?),
        )?;
        if swapped.is_err() {
            return Err(Error::InvalidData(format!(
                "document {}/{} already exists",
                model, id
            )));
        }
        trace!(model, id = %id, "inserted document");
        Ok(())
    }

    /// Get a record, including soft-deleted ones.
    pub fn get(&self, model: &str, id: &DocumentId) -> Result<Option<Record>, Error> {
        match self.tree(model)?.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Physically remove a document, returning the removed record.
    pub fn remove(&self, model: &str, id: &DocumentId) -> Result<Option<Record>, Error> {
        match self.tree(model)?.remove(id.as_bytes())? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Move a document to the given soft-delete state.
    ///
    /// Returns `Ok(None)` if the document does not exist, otherwise whether
    /// its state changed.
    pub fn set_deleted(
        &self,
        model: &str,
        id: &DocumentId,
        deleted: bool,
    ) -> Result<Option<bool>, Error> {
        let tree = self.tree(model)?;
        loop {
            let Some(current) = tree.get(id.as_bytes())? else {
                return Ok(None);
            };
            let mut record = Record::from_bytes(&current)?;
            if !record.set_deleted(deleted) {
                return Ok(Some(false));
            }
            if swap(&tree, id.as_bytes(), &current, &record)? {
                return Ok(Some(true));
            }
        }
    }

    /// Find every document of a model matching `selector`, soft-deleted ones
    /// included.
    pub fn find(&self, model: &str, selector: &Selector) -> Result<Vec<(DocumentId, Record)>, Error> {
        let mut found = Vec::new();
        for entry in self.tree(model)?.iter() {
            let (key, bytes) = entry?;
            let record = Record::from_bytes(&bytes)?;
            if SelectorEvaluator::matches(selector, &record.data) {
                found.push((decode_id(&key)?, record));
            }
        }
        Ok(found)
    }

    /// Apply `instruction` to every document of a model matching `selector`.
    ///
    /// Each document is updated atomically; the batch as a whole is not.
    /// Returns the number of documents that changed.
    pub fn update_many(
        &self,
        model: &str,
        selector: &Selector,
        instruction: &MutationInstruction,
    ) -> Result<usize, Error> {
        let tree = self.tree(model)?;
        let mut modified = 0;

        for entry in tree.iter() {
            let (key, _) = entry?;
            loop {
                let Some(current) = tree.get(&key)? else {
                    break;
                };
                let mut record = Record::from_bytes(&current)?;
                if !SelectorEvaluator::matches(selector, &record.data) {
                    break;
                }
                if !MutationApplier::apply(instruction, &mut record.data)? {
                    break;
                }
                if swap(&tree, &key, &current, &record)? {
                    modified += 1;
                    break;
                }
                trace!(model, "update conflict, retrying");
            }
        }

        Ok(modified)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Generate a new document identity (32 hex characters).
    ///
    /// Identities are time-ordered with a process-wide counter so that two
    /// calls in the same nanosecond still differ.
    pub fn generate_id() -> DocumentId {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&now.to_be_bytes());
        id[8..].copy_from_slice(&counter.to_be_bytes());

        DocumentId::new(hex::encode(id))
    }

    /// Get the underlying sled database (for opening new trees).
    pub fn db(&self) -> &Db {
        &self.db
    }

    fn tree(&self, model: &str) -> Result<Tree, Error> {
        Ok(self.db.open_tree(format!("{}{}", DOCS_PREFIX, model))?)
    }
}

/// Replace `current` with `record`; `false` means another writer got there first.
fn swap(tree: &Tree, key: &[u8], current: &IVec, record: &Record) -> Result<bool, Error> {
    Ok(tree
        .compare_and_swap(key, Some(current), Some(record.to_bytes()?))?
        .is_ok())
}

fn decode_id(key: &[u8]) -> Result<DocumentId, Error> {
    String::from_utf8(key.to_vec())
        .map(DocumentId::new)
        .map_err(|e| Error::InvalidData(format!("document key is not UTF-8: {}", e)))
}

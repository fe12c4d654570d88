//! Record type for stored documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A stored document with lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Document body.
    pub data: Value,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Whether the document is soft-deleted.
    #[serde(default)]
    pub deleted: bool,

    /// When the document was soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Create a live record stamped with the current time.
    pub fn new(data: Value) -> Self {
        Self {
            data,
            created_at: Utc::now(),
            deleted: false,
            deleted_at: None,
        }
    }

    /// Move the record to the given soft-delete state.
    ///
    /// Returns `false` if it was already in that state.
    pub fn set_deleted(&mut self, deleted: bool) -> bool {
        if self.deleted == deleted {
            return false;
        }
        self.deleted = deleted;
        self.deleted_at = deleted.then(Utc::now);
        true
    }

    /// Serialize the record to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

//! Document identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a stored document.
///
/// References inside documents hold the identity as a plain JSON string, so
/// the identity converts losslessly to and from `serde_json::Value::String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create an identity from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The JSON value a referencing field holds for this identity.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::String(self.0.clone())
    }

    /// Read an identity back from a JSON value.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        value.as_str().map(Self::new)
    }

    /// Raw key bytes used by storage trees.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Query selectors for locating referencing documents.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A predicate over a document.
///
/// Paths are dotted field paths relative to the document (or, inside an
/// [`Selector::ElemMatch`], relative to the array element). An empty path
/// addresses the value itself, which is how an element of an array of bare
/// values is matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Selector {
    /// The value at `path` equals `value`.
    ///
    /// Arrays met along the path are traversed implicitly: the predicate holds
    /// if any element along the way leads to an equal value, and a terminal
    /// array holds if any of its elements is equal.
    Eq {
        /// Dotted field path.
        path: String,
        /// Expected value.
        value: serde_json::Value,
    },
    /// The value at `path` is an array with at least one element matching
    /// `inner`. Used for stores without implicit element-wise matching.
    ElemMatch {
        /// Dotted field path to the array.
        path: String,
        /// Predicate evaluated against each element.
        inner: Box<Selector>,
    },
    /// All selectors match.
    And {
        /// Conjuncts.
        selectors: Vec<Selector>,
    },
}

impl Selector {
    /// Create an equality selector.
    pub fn eq(path: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Selector::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create an explicit element-wise existence selector.
    pub fn elem_match(path: impl Into<String>, inner: Selector) -> Self {
        Selector::ElemMatch {
            path: path.into(),
            inner: Box::new(inner),
        }
    }

    /// Create a conjunction.
    pub fn and(selectors: Vec<Selector>) -> Self {
        Selector::And { selectors }
    }

    /// Collect every top-level field path this selector touches.
    ///
    /// Paths nested inside an `ElemMatch` are reported joined onto the array
    /// path, so `floors` + `house` is reported as `floors.house`.
    pub fn fields(&self) -> HashSet<String> {
        let mut fields = HashSet::new();
        collect_fields(self, "", &mut fields);
        fields
    }
}

fn collect_fields(selector: &Selector, prefix: &str, fields: &mut HashSet<String>) {
    match selector {
        Selector::Eq { path, .. } => {
            fields.insert(join_path(prefix, path));
        }
        Selector::ElemMatch { path, inner } => {
            collect_fields(inner, &join_path(prefix, path), fields);
        }
        Selector::And { selectors } => {
            for s in selectors {
                collect_fields(s, prefix, fields);
            }
        }
    }
}

/// Join two dotted paths, ignoring empty parts.
pub fn join_path(prefix: &str, path: &str) -> String {
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}.{}", prefix, path),
    }
}

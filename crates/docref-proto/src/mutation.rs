//! Partial-update instructions for detaching references.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One step of an update path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum UpdateSegment {
    /// Descend into an object field.
    Field(String),
    /// Apply to every element of the current array (`$[]`).
    AllElements,
    /// Apply only to elements accepted by the named array filter (`$[name]`).
    Filtered(String),
}

/// A positional update path such as `floors.$[].rooms.$[elem].house`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdatePath {
    segments: Vec<UpdateSegment>,
}

impl UpdatePath {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field segment.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.segments.push(UpdateSegment::Field(name.into()));
        self
    }

    /// Append an all-elements segment.
    pub fn all_elements(mut self) -> Self {
        self.segments.push(UpdateSegment::AllElements);
        self
    }

    /// Append a filtered-elements segment bound to `identifier`.
    pub fn filtered(mut self, identifier: impl Into<String>) -> Self {
        self.segments.push(UpdateSegment::Filtered(identifier.into()));
        self
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: UpdateSegment) {
        self.segments.push(segment);
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[UpdateSegment] {
        &self.segments
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of filtered segments on this path.
    pub fn filtered_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, UpdateSegment::Filtered(_)))
            .count()
    }
}

impl fmt::Display for UpdatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                UpdateSegment::Field(name) => f.write_str(name)?,
                UpdateSegment::AllElements => f.write_str("$[]")?,
                UpdateSegment::Filtered(id) => write!(f, "$[{}]", id)?,
            }
        }
        Ok(())
    }
}

/// Condition that selects which elements a `$[identifier]` segment touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayFilter {
    /// Identifier referenced by a [`UpdateSegment::Filtered`] segment.
    pub identifier: String,
    /// Dotted path inside the element; empty when the element is the value.
    pub path: String,
    /// Value the element must hold at `path`.
    pub value: serde_json::Value,
}

impl ArrayFilter {
    /// Create an equality array filter.
    pub fn new(
        identifier: impl Into<String>,
        path: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            path: path.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ArrayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} == {}", self.identifier, self.value)
        } else {
            write!(f, "{}.{} == {}", self.identifier, self.path, self.value)
        }
    }
}

/// The operator applied at the end of an update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOp {
    /// Set the addressed field to null.
    SetNull {
        /// Field to null out.
        path: UpdatePath,
    },
    /// Remove every element equal to `value` from the addressed array.
    Pull {
        /// Array to pull from.
        path: UpdatePath,
        /// Value to remove.
        value: serde_json::Value,
    },
}

/// A partial-update instruction applied to every document a selector matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationInstruction {
    /// Operator and target path.
    pub op: MutationOp,
    /// Filters bound by `$[identifier]` segments. At most one.
    pub array_filters: Vec<ArrayFilter>,
}

impl MutationInstruction {
    /// Null out the field at `path`.
    pub fn set_null(path: UpdatePath) -> Self {
        Self {
            op: MutationOp::SetNull { path },
            array_filters: vec![],
        }
    }

    /// Pull `value` out of the array at `path`.
    pub fn pull(path: UpdatePath, value: impl Into<serde_json::Value>) -> Self {
        Self {
            op: MutationOp::Pull {
                path,
                value: value.into(),
            },
            array_filters: vec![],
        }
    }

    /// Attach the terminal-array filter.
    ///
    /// Only one filter may exist per instruction, and its identifier must be
    /// bound by a filtered segment of the path.
    pub fn with_array_filter(mut self, filter: ArrayFilter) -> Result<Self, Error> {
        if !self.array_filters.is_empty() {
            return Err(Error::InvalidInstruction(
                "only one terminal array filter is supported".into(),
            ));
        }
        let bound = self.path().segments().iter().any(|s| {
            matches!(s, UpdateSegment::Filtered(id) if *id == filter.identifier)
        });
        if !bound {
            return Err(Error::InvalidInstruction(format!(
                "array filter '{}' is not bound by the update path '{}'",
                filter.identifier,
                self.path()
            )));
        }
        self.array_filters.push(filter);
        Ok(self)
    }

    /// The update path of the operator.
    pub fn path(&self) -> &UpdatePath {
        match &self.op {
            MutationOp::SetNull { path } | MutationOp::Pull { path, .. } => path,
        }
    }

    /// The terminal-array filter, if the path has one.
    pub fn array_filter(&self) -> Option<&ArrayFilter> {
        self.array_filters.first()
    }

    /// Look up a filter by identifier.
    pub fn filter_for(&self, identifier: &str) -> Option<&ArrayFilter> {
        self.array_filters
            .iter()
            .find(|f| f.identifier == identifier)
    }
}

impl fmt::Display for MutationInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            MutationOp::SetNull { path } => write!(f, "set {} = null", path)?,
            MutationOp::Pull { path, value } => write!(f, "pull {} from {}", value, path)?,
        }
        for filter in &self.array_filters {
            write!(f, " where {}", filter)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_path_display() {
        let path = UpdatePath::new()
            .field("floors")
            .all_elements()
            .field("rooms")
            .filtered("elem")
            .field("house");

        assert_eq!(path.to_string(), "floors.$[].rooms.$[elem].house");
        assert_eq!(path.filtered_count(), 1);
    }

    #[test]
    fn test_set_null_without_filter() {
        let instruction = MutationInstruction::set_null(UpdatePath::new().field("house"));
        assert!(instruction.array_filter().is_none());
        assert_eq!(instruction.to_string(), "set house = null");
    }

    #[test]
    fn test_pull_display() {
        let instruction = MutationInstruction::pull(UpdatePath::new().field("houses"), "h1");
        assert_eq!(instruction.to_string(), "pull \"h1\" from houses");
    }

    #[test]
    fn test_second_filter_rejected() {
        let path = UpdatePath::new().field("rooms").filtered("elem").field("house");
        let instruction = MutationInstruction::set_null(path)
            .with_array_filter(ArrayFilter::new("elem", "house", "h1"))
            .unwrap();

        let result = instruction.with_array_filter(ArrayFilter::new("elem", "house", "h2"));
        assert!(matches!(result, Err(Error::InvalidInstruction(_))));
    }

    #[test]
    fn test_unbound_filter_rejected() {
        let instruction = MutationInstruction::set_null(UpdatePath::new().field("house"));
        let result = instruction.with_array_filter(ArrayFilter::new("elem", "house", "h1"));
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_lookup() {
        let path = UpdatePath::new().field("rooms").filtered("elem").field("house");
        let instruction = MutationInstruction::set_null(path)
            .with_array_filter(ArrayFilter::new("elem", "house", "h1"))
            .unwrap();

        assert!(instruction.filter_for("elem").is_some());
        assert!(instruction.filter_for("other").is_none());
        assert_eq!(
            instruction.to_string(),
            "set rooms.$[elem].house = null where elem.house == \"h1\""
        );
    }
}

//! Structural paths from a document root to a reference field.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a path segment is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    /// A plain field (scalar value or nested object).
    Scalar,
    /// An array field whose elements are visited.
    ArrayElement,
}

/// One step of a structural path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    /// Field name at this level.
    pub name: String,
    /// Traversal kind.
    pub kind: SegmentKind,
}

impl PathSegment {
    /// Create a scalar segment.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SegmentKind::Scalar,
        }
    }

    /// Create an array-element segment.
    pub fn array(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SegmentKind::ArrayElement,
        }
    }

    /// Check if this segment traverses an array.
    pub fn is_array(&self) -> bool {
        self.kind == SegmentKind::ArrayElement
    }
}

/// Ordered sequence of segments from the document root.
///
/// Paths are append-only while the compiler builds them and never change
/// afterwards; descriptors only ever hold non-empty paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path at the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Return a new path extended by one segment.
    pub fn child(&self, name: impl Into<String>, kind: SegmentKind) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(PathSegment {
            name: name.into(),
            kind,
        });
        Self { segments }
    }

    /// The segments in traversal order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Field names in traversal order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().map(|s| s.name.as_str())
    }

    /// Dotted field path, e.g. `floors.rooms.house`.
    pub fn dotted(&self) -> String {
        self.names().collect::<Vec<_>>().join(".")
    }

    /// Index of the last array segment, if any.
    pub fn terminal_array_index(&self) -> Option<usize> {
        self.segments.iter().rposition(PathSegment::is_array)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            if segment.is_array() {
                f.write_str("[]")?;
            }
        }
        Ok(())
    }
}

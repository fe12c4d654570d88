//! Selector and mutation synthesis for reference descriptors.

use docref_proto::{
    ArrayFilter, DocumentId, MutationInstruction, MutationOp, Selector, UpdatePath,
    UpdateSegment, TERMINAL_FILTER_IDENTIFIER,
};
use serde::{Deserialize, Serialize};

use crate::reference::{Cardinality, PathSegment, ReferenceDescriptor};

/// How array segments are expressed in generated selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryStyle {
    /// Plain dotted equality; the store matches through arrays element-wise.
    #[default]
    Implicit,
    /// One explicit element-wise existence predicate per array segment.
    Explicit,
}

/// Builds the selector and the partial update for one descriptor and one
/// referenced identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdatePathBuilder {
    style: QueryStyle,
}

impl UpdatePathBuilder {
    /// Create a builder emitting implicit selectors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with the given selector style.
    pub fn with_style(style: QueryStyle) -> Self {
        Self { style }
    }

    /// The selector style in use.
    pub fn style(&self) -> QueryStyle {
        self.style
    }

    /// Selector matching documents whose value at the descriptor path is `id`.
    pub fn build_query(&self, descriptor: &ReferenceDescriptor, id: &DocumentId) -> Selector {
        match self.style {
            QueryStyle::Implicit => Selector::eq(descriptor.path.dotted(), id.to_value()),
            QueryStyle::Explicit => explicit_selector(descriptor.path.segments(), id.to_value()),
        }
    }

    /// Partial update that detaches `id` from matching documents.
    ///
    /// Every array before the terminal one is addressed as a whole (`$[]`).
    /// The terminal array is addressed through a single equality filter over
    /// the segments that follow it, so sibling elements holding other
    /// identities are left alone. Arrays of bare identities pull the value
    /// instead of nulling a field.
    pub fn build_mutation(
        &self,
        descriptor: &ReferenceDescriptor,
        id: &DocumentId,
    ) -> MutationInstruction {
        let segments = descriptor.path.segments();
        let pull = descriptor.cardinality == Cardinality::Array;
        let last = segments.len().saturating_sub(1);
        let terminal = if pull {
            None
        } else {
            descriptor.path.terminal_array_index()
        };

        let mut path = UpdatePath::new();
        for (i, segment) in segments.iter().enumerate() {
            path.push(UpdateSegment::Field(segment.name.clone()));
            if !segment.is_array() || (pull && i == last) {
                continue;
            }
            if Some(i) == terminal {
                path.push(UpdateSegment::Filtered(TERMINAL_FILTER_IDENTIFIER.to_string()));
            } else {
                path.push(UpdateSegment::AllElements);
            }
        }

        if pull {
            return MutationInstruction::pull(path, id.to_value());
        }

        let array_filters = match terminal {
            Some(t) => vec![ArrayFilter::new(
                TERMINAL_FILTER_IDENTIFIER,
                joined_names(&segments[t + 1..]),
                id.to_value(),
            )],
            None => vec![],
        };

        MutationInstruction {
            op: MutationOp::SetNull { path },
            array_filters,
        }
    }
}

fn joined_names(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn explicit_selector(segments: &[PathSegment], value: serde_json::Value) -> Selector {
    match segments.iter().position(PathSegment::is_array) {
        None => Selector::eq(joined_names(segments), value),
        Some(i) => {
            let rest = &segments[i + 1..];
            let inner = if rest.is_empty() {
                Selector::eq("", value)
            } else {
                explicit_selector(rest, value)
            };
            Selector::elem_match(joined_names(&segments[..=i]), inner)
        }
    }
}

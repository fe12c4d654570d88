//! In-memory application of partial updates to document bodies.

use docref_proto::{ArrayFilter, MutationInstruction, MutationOp, Selector, UpdateSegment};
use serde_json::Value;

use crate::error::Error;
use crate::query::SelectorEvaluator;

/// Applies a [`MutationInstruction`] to a document body.
pub struct MutationApplier;

impl MutationApplier {
    /// Apply `instruction` to `document` in place.
    ///
    /// Returns `true` if anything changed. Fields that do not exist are never
    /// created: a path that runs into a missing field or a value of the wrong
    /// shape is simply skipped for that branch.
    pub fn apply(instruction: &MutationInstruction, document: &mut Value) -> Result<bool, Error> {
        let path = instruction.path();
        for segment in path.segments() {
            if let UpdateSegment::Filtered(identifier) = segment {
                if instruction.filter_for(identifier).is_none() {
                    return Err(docref_proto::Error::InvalidInstruction(format!(
                        "no array filter bound to '{}' in {}",
                        identifier, path
                    ))
                    .into());
                }
            }
        }

        Ok(apply_at(document, path.segments(), instruction))
    }
}

fn apply_at(slot: &mut Value, segments: &[UpdateSegment], instruction: &MutationInstruction) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return apply_op(slot, &instruction.op);
    };

    match segment {
        UpdateSegment::Field(name) => match slot {
            Value::Object(map) => map
                .get_mut(name)
                .is_some_and(|child| apply_at(child, rest, instruction)),
            _ => false,
        },
        UpdateSegment::AllElements => match slot {
            Value::Array(items) => items
                .iter_mut()
                .fold(false, |changed, item| apply_at(item, rest, instruction) | changed),
            _ => false,
        },
        UpdateSegment::Filtered(identifier) => {
            let (Value::Array(items), Some(filter)) = (slot, instruction.filter_for(identifier))
            else {
                return false;
            };
            let predicate = element_predicate(filter);
            items
                .iter_mut()
                .filter(|item| SelectorEvaluator::matches(&predicate, item))
                .fold(false, |changed, item| apply_at(item, rest, instruction) | changed)
        }
    }
}

fn element_predicate(filter: &ArrayFilter) -> Selector {
    Selector::eq(filter.path.clone(), filter.value.clone())
}

fn apply_op(slot: &mut Value, op: &MutationOp) -> bool {
    match op {
        MutationOp::SetNull { .. } => {
            if slot.is_null() {
                return false;
            }
            *slot = Value::Null;
            true
        }
        MutationOp::Pull { value, .. } => match slot {
            Value::Array(items) => {
                let before = items.len();
                items.retain(|item| item != value);
                items.len() != before
            }
            _ => false,
        },
    }
}

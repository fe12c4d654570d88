//! Selector evaluation for document matching.
//!
//! This module provides the `SelectorEvaluator` that decides whether a JSON
//! document satisfies a [`Selector`].

use docref_proto::Selector;
use serde_json::Value;

/// Evaluates selectors against document bodies.
pub struct SelectorEvaluator;

impl SelectorEvaluator {
    /// Evaluate a selector against a document.
    ///
    /// Returns `true` if the document matches, `false` otherwise. Missing
    /// fields and type mismatches never match.
    pub fn matches(selector: &Selector, document: &Value) -> bool {
        match selector {
            Selector::Eq { path, value } => Self::equals_at(document, &split_path(path), value),
            Selector::ElemMatch { path, inner } => {
                let mut reached = Vec::new();
                collect_values(document, &split_path(path), &mut reached);
                reached.into_iter().any(|v| match v {
                    Value::Array(items) => items.iter().any(|item| Self::matches(inner, item)),
                    _ => false,
                })
            }
            Selector::And { selectors } => selectors.iter().all(|s| Self::matches(s, document)),
        }
    }

    /// Equality with implicit array traversal.
    ///
    /// Arrays met before the end of the path are searched element-wise; an
    /// array at the end of the path matches if any element is equal.
    fn equals_at(value: &Value, names: &[&str], expected: &Value) -> bool {
        match names.split_first() {
            None => match value {
                Value::Array(items) if !expected.is_array() => items.contains(expected),
                _ => value == expected,
            },
            Some((name, rest)) => match value {
                Value::Object(map) => map
                    .get(*name)
                    .is_some_and(|child| Self::equals_at(child, rest, expected)),
                Value::Array(items) => items
                    .iter()
                    .any(|item| Self::equals_at(item, names, expected)),
                _ => false,
            },
        }
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Collect every value reached by following `names`, descending through any
/// array met before the end of the path.
fn collect_values<'a>(value: &'a Value, names: &[&str], out: &mut Vec<&'a Value>) {
    match names.split_first() {
        None => out.push(value),
        Some((name, rest)) => match value {
            Value::Object(map) => {
                if let Some(child) = map.get(*name) {
                    collect_values(child, rest, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    collect_values(item, names, out);
                }
            }
            _ => {}
        },
    }
}

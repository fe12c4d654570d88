//! Selector evaluation against stored documents.

mod filter;

pub use filter::SelectorEvaluator;

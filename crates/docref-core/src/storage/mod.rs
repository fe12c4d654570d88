//! Storage layer for docref.
//!
//! This module provides a sled-based document engine. Each model's documents
//! live in their own tree, keyed by document identity, and are updated in
//! place with compare-and-swap so concurrent partial updates never lose
//! writes.

mod apply;
mod config;
mod engine;
mod record;

pub use apply::MutationApplier;
pub use config::StorageConfig;
pub use engine::DocumentEngine;
pub use record::Record;

//! docref core - schema catalog, reference graph, and document engine.
//!
//! This crate provides the building blocks the deletion policy engine runs
//! on: the catalog of model schemas, the compiled reverse index of references
//! between models, the builder that turns a reference into a selector and a
//! partial update, and a sled-backed document engine that understands both.

pub mod catalog;
pub mod error;
pub mod query;
pub mod reference;
pub mod storage;
pub mod update;

pub use catalog::{
    Catalog, ElementType, FieldDef, FieldType, LifecycleRules, ModelDef, ScalarType, SchemaBundle,
};
pub use error::Error;
pub use query::SelectorEvaluator;
pub use reference::{
    Cardinality, DeletePolicy, FieldPath, PathSegment, PolicySource, ReferenceCompiler,
    ReferenceDescriptor, ReferenceRegistry, SegmentKind,
};
pub use storage::{DocumentEngine, MutationApplier, Record, StorageConfig};
pub use update::{QueryStyle, UpdatePathBuilder};

/// Re-export protocol types.
pub use docref_proto as proto;

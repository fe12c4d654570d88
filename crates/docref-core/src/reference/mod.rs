//! Reference graph: structural paths, compiled descriptors, and the reverse
//! index the deletion engine consults.

mod compiler;
mod descriptor;
mod path;
mod registry;

pub use compiler::ReferenceCompiler;
pub use descriptor::{Cardinality, DeletePolicy, PolicySource, ReferenceDescriptor};
pub use path::{FieldPath, PathSegment, SegmentKind};
pub use registry::ReferenceRegistry;

//! Model catalog for docref.
//!
//! The catalog stores the schema description of every registered model and
//! is the live source of the required/cascade flags that decide deletion
//! policy.

mod catalog;
mod field;
mod model;
mod schema;
mod types;

pub use catalog::Catalog;
pub use field::FieldDef;
pub use model::{LifecycleRules, ModelDef};
pub use schema::SchemaBundle;
pub use types::{ElementType, FieldType, ScalarType};

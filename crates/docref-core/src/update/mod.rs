//! Update path builder.
//!
//! Turns a reference descriptor plus a deleted identity into the selector
//! that finds referencing documents and the partial update that detaches the
//! identity from them.

mod builder;

pub use builder::{QueryStyle, UpdatePathBuilder};

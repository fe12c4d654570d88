//! docref protocol types.
//!
//! This crate defines the instructions exchanged between the referential
//! integrity core and a document store: document identities, selectors that
//! find referencing documents, and partial-update instructions that detach
//! references from them.
//!
//! # Modules
//!
//! - [`id`] - Document identities
//! - [`selector`] - Query selectors with implicit and explicit array matching
//! - [`mutation`] - Partial-update instructions with positional array operators
//! - [`error`] - Protocol error types
//!
//! All types derive `serde::Serialize` and `serde::Deserialize`, so they can be
//! logged, persisted, or handed to a store binding that speaks JSON.

pub mod error;
pub mod id;
pub mod mutation;
pub mod selector;

pub use error::Error;

pub use id::DocumentId;
pub use mutation::{ArrayFilter, MutationInstruction, MutationOp, UpdatePath, UpdateSegment};
pub use selector::Selector;

/// Identifier bound to the terminal-array filter of a mutation instruction.
pub const TERMINAL_FILTER_IDENTIFIER: &str = "elem";

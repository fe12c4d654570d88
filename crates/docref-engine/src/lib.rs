//! docref engine - reference-aware deletion for document stores.
//!
//! A deletion (hard, soft, or restore) of a document consults the compiled
//! reverse index for every reference pointing at the document's model and
//! applies the reference's live policy: block, cascade, or nullify.

pub mod cascade;
pub mod config;
pub mod database;
pub mod error;
pub mod store;

pub use cascade::{
    CascadeResult, DeletionContext, DeletionMode, DeletionPolicyEngine, DocumentLifecycle,
    NullifiedPath, DEFAULT_MAX_CASCADE_DEPTH,
};
pub use config::{Args, Command, DatabaseConfig, EngineConfig};
pub use database::Database;
pub use error::{Error, RefConstraintError};
pub use store::{DocumentHandle, DocumentStore, SledStore};

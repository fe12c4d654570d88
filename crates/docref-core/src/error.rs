//! Core error types.

use thiserror::Error;

/// Core errors.
///
/// Every failure surfaced by the document engine is one of these; callers
/// above the core treat them as store operation failures and do not classify
/// them further.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] docref_proto::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Model is not registered in the catalog.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// A schema description could not be accepted.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

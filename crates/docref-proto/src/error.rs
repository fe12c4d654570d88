//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A mutation instruction was assembled in an unsupported shape.
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),
}

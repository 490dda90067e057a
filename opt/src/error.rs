//! Error types for the mutation/extraction crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OptError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptError {
    #[error("cannot vary a theory with no other theories, routines, or instructions available")]
    NoMutationPossible,

    #[error("theory index {index} out of range (0..{len})")]
    TheoryIndexOutOfRange { index: usize, len: usize },
}

//! Error types for the bytecode language crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LangError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LangError {
    #[error("opcode {opcode} takes {expected} argument(s), found {found}")]
    ArityMismatch {
        opcode: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("argument {position} of {opcode} must be non-negative, found {value}")]
    NegativeArgument {
        opcode: &'static str,
        position: usize,
        value: i64,
    },

    #[error("theory index {index} out of range (0..{len})")]
    TheoryIndexOutOfRange { index: usize, len: usize },

    #[error("routine index {index} out of range (0..{len})")]
    RoutineIndexOutOfRange { index: usize, len: usize },
}

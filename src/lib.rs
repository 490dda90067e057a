//! Mindlab: a mind holding theories, routines, and claims, built on the
//! `mindlab-lang` bytecode interpreter and the `mindlab-opt` mutation and
//! extraction passes.

pub mod mind;

pub use mind::{ClaimRecord, ClaimTrace, Mind, Problem};

pub use mindlab_lang as lang;
pub use mindlab_opt as opt;

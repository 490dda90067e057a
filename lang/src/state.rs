//! Core value types: claims, instructions, programs, and the interpreter's
//! working state. Everything here is plain owned data — under Rust's
//! ownership model, `clone()` on any of these types is already a full deep
//! copy, so unlike the system this language was modeled on, no bespoke
//! deep-copy routine is needed to keep forked branches independent.

use smallvec::SmallVec;

use crate::error::{LangError, Result};
use crate::instruction::{validate_args, ArgKind, Opcode};

/// The integer type every int-stack slot and claim-payload element holds.
pub type Int = i64;

/// A single structured fact: a polarity and an ordered list of integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Claim {
    pub polarity: bool,
    pub payload: Vec<Int>,
}

impl Claim {
    pub fn new(polarity: bool, payload: Vec<Int>) -> Self {
        Claim { polarity, payload }
    }
}

/// An entry on the claim-stack: either a single claim or a set of claims
/// awaiting a fork the next time a claim-accessing instruction runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStackEntry {
    Single(Claim),
    Set(Vec<Claim>),
}

impl ClaimStackEntry {
    pub fn single(claim: Claim) -> Self {
        ClaimStackEntry::Single(claim)
    }

    pub fn set(claims: Vec<Claim>) -> Self {
        ClaimStackEntry::Set(claims)
    }
}

/// One instruction: an opcode plus its (already arity/sign validated)
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub args: SmallVec<[Int; 1]>,
}

impl Instruction {
    /// Builds an instruction, rejecting wrong arity or a negative argument
    /// where the opcode requires a non-negative one.
    pub fn new(opcode: Opcode, args: SmallVec<[Int; 1]>) -> Result<Self> {
        validate_args(opcode, &args)?;
        Ok(Instruction { opcode, args })
    }

    pub fn nullary(opcode: Opcode) -> Result<Self> {
        Self::new(opcode, SmallVec::new())
    }

    pub fn with_arg(opcode: Opcode, arg: Int) -> Result<Self> {
        let mut args = SmallVec::new();
        args.push(arg);
        Self::new(opcode, args)
    }
}

/// A sequence of instructions: a theory body or a routine body.
pub type Program = Vec<Instruction>;

/// An `exec` argument, sign-encoded: non-negative selects a routine by
/// index, negative selects a theory by index via `-(1 + theory_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecReference {
    Routine(usize),
    Theory(usize),
}

impl ExecReference {
    pub fn decode(raw: Int) -> Self {
        if raw >= 0 {
            ExecReference::Routine(raw as usize)
        } else {
            ExecReference::Theory((-(raw + 1)) as usize)
        }
    }

    pub fn encode(self) -> Int {
        match self {
            ExecReference::Routine(index) => index as Int,
            ExecReference::Theory(index) => -(index as Int) - 1,
        }
    }
}

/// A single branch's output once it runs off the end of its program: the
/// claim left on top of the claim-stack, plus which input claims (by index
/// in the original claim set) the branch's forks selected, in fork order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub touched_input_indices: Vec<u32>,
    pub result_claim: Claim,
}

/// The full mutable state threaded through one execution branch: program
/// counter, the two typed stacks, and the nested `for`-loop counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterState {
    pub pointer: usize,
    pub int_stack: Vec<Int>,
    pub claim_stack: Vec<ClaimStackEntry>,
    pub for_counters: Vec<Int>,
}

impl InterpreterState {
    pub fn new(claim_stack: Vec<ClaimStackEntry>) -> Self {
        InterpreterState {
            pointer: 0,
            int_stack: Vec::new(),
            claim_stack,
            for_counters: Vec::new(),
        }
    }
}

/// Resolves a (possibly negative, Python-slice-style) claim-payload index
/// against a payload of the given length. Returns `None` out of range.
pub fn resolve_index(index: Int, len: usize) -> Option<usize> {
    if index >= 0 {
        let i = index as usize;
        if i < len {
            Some(i)
        } else {
            None
        }
    } else {
        let offset = (-index) as usize;
        if offset <= len {
            Some(len - offset)
        } else {
            None
        }
    }
}

pub fn arg_kind_of(opcode: Opcode) -> ArgKind {
    opcode.arg_kind()
}

/// Re-exported for callers that just need the error type alongside state.
pub use crate::error::LangError as StateError;

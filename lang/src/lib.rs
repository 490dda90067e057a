//! The bytecode language: opcode table, program validity, and the forking
//! stack-machine interpreter.

pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod printer;
pub mod state;
pub mod validator;

pub use error::{LangError, Result};
pub use instruction::{ArgKind, Opcode, OPCODE_COUNT};
pub use interpreter::{inline_execs, inline_routine_execs_only, run};
pub use printer::program_string;
pub use state::{
    resolve_index, Claim, ClaimStackEntry, ExecReference, ExecutionOutput, InterpreterState, Int,
    Instruction, Program,
};
pub use validator::is_valid;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_build_run_and_print() {
        let theory = vec![
            Instruction::nullary(Opcode::ClaimBool).unwrap(),
        ];
        assert!(is_valid(&theory));
        let printed = program_string(&theory);
        assert!(printed.contains("claim_bool"));

        let outputs = run(0, &[theory], &[], vec![Claim::new(true, vec![])], 100);
        assert_eq!(outputs.len(), 1);
    }
}

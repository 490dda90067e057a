//! The stack-machine interpreter: control-flow resolution, the exec-inlining
//! pre-pass, and forking execution.

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::instruction::Opcode;
use crate::state::{
    resolve_index, Claim, ClaimStackEntry, ExecReference, ExecutionOutput, InterpreterState, Int,
    Program,
};

/// An instruction trapped: the branch it happened on produces no output.
/// Traps are not errors — a theory that traps on some inputs and not others
/// is an ordinary, expected shape for this language, so this type never
/// crosses the crate boundary.
struct Trap;

/// Maps every block opener (`if`/`while`/`for`/`else`) to the position that
/// closes it, and every closer (`else`/`end`) back to the opener it closes
/// (position and opcode), built with a single left-to-right scan.
struct ControlMap {
    closer_of: HashMap<usize, usize>,
    opener_of: HashMap<usize, (usize, Opcode)>,
}

impl ControlMap {
    fn build(program: &Program) -> Self {
        let mut stack: Vec<usize> = Vec::new();
        let mut closer_of = HashMap::new();
        let mut opener_of = HashMap::new();

        for (index, instruction) in program.iter().enumerate() {
            if matches!(instruction.opcode, Opcode::Else | Opcode::End) {
                if let Some(opener_pos) = stack.pop() {
                    let opener_opcode = program[opener_pos].opcode;
                    closer_of.insert(opener_pos, index);
                    opener_of.insert(index, (opener_pos, opener_opcode));
                }
            }
            if instruction.opcode.is_block_starter() || instruction.opcode == Opcode::Else {
                stack.push(index);
            }
        }

        ControlMap {
            closer_of,
            opener_of,
        }
    }

    fn closer_of(&self, opener_pos: usize) -> Option<usize> {
        self.closer_of.get(&opener_pos).copied()
    }

    fn opener_of(&self, closer_pos: usize) -> Option<(usize, Opcode)> {
        self.opener_of.get(&closer_pos).copied()
    }
}

/// Runs `inline_execs` with theory-reference expansion enabled: the
/// pre-pass the interpreter applies before every `run`.
pub fn inline_execs(theory_index: usize, theories: &[Program], routines: &[Program]) -> Program {
    inline_execs_impl(theory_index, theories, routines, true)
}

/// Inlines only routine references, leaving theory references (including
/// self-references) untouched. Used when routines are being retired from a
/// mind but theory structure should otherwise survive.
pub fn inline_routine_execs_only(
    theory_index: usize,
    theories: &[Program],
    routines: &[Program],
) -> Program {
    inline_execs_impl(theory_index, theories, routines, false)
}

fn inline_execs_impl(
    theory_index: usize,
    theories: &[Program],
    routines: &[Program],
    inline_theories: bool,
) -> Program {
    let mut theory = theories[theory_index].clone();
    let mut index = 0;

    loop {
        if index >= theory.len() {
            break;
        }

        if theory[index].opcode != Opcode::Exec {
            index += 1;
            continue;
        }

        let reference = ExecReference::decode(theory[index].args[0]);
        match reference {
            ExecReference::Routine(r) => {
                let body = routines[r].clone();
                theory.splice(index..=index, body);
            }
            ExecReference::Theory(t) => {
                if !inline_theories {
                    index += 1;
                    continue;
                }
                if t == theory_index {
                    trace!("deleting self-referencing exec in theory {theory_index} at {index}");
                    theory.remove(index);
                } else {
                    let body = theories[t].clone();
                    theory.splice(index..=index, body);
                }
            }
        }
    }

    theory
}

/// Runs theory `theory_index` against `input_claims`, returning one
/// `ExecutionOutput` per surviving execution branch. `step_limit` bounds the
/// number of non-control-flow steps any single branch may take before it is
/// abandoned (an unbounded `while`/`for` would otherwise hang forever).
pub fn run(
    theory_index: usize,
    theories: &[Program],
    routines: &[Program],
    input_claims: Vec<Claim>,
    step_limit: u32,
) -> Vec<ExecutionOutput> {
    let program = inline_execs(theory_index, theories, routines);
    let control_map = ControlMap::build(&program);
    let initial_state = InterpreterState::new(vec![ClaimStackEntry::Set(input_claims)]);

    run_branch(&program, initial_state, &control_map, Vec::new(), step_limit, 0)
}

fn run_branch(
    program: &Program,
    mut state: InterpreterState,
    control_map: &ControlMap,
    touched_inputs: Vec<u32>,
    step_limit: u32,
    mut step_count: u32,
) -> Vec<ExecutionOutput> {
    loop {
        if state.pointer >= program.len() {
            return match state.claim_stack.last() {
                Some(ClaimStackEntry::Single(claim)) => vec![ExecutionOutput {
                    touched_input_indices: touched_inputs,
                    result_claim: claim.clone(),
                }],
                _ => Vec::new(),
            };
        }

        let instruction = &program[state.pointer];

        if instruction.opcode.is_forking() {
            if let Some(ClaimStackEntry::Set(members)) = state.claim_stack.last() {
                let members = members.clone();
                let mut outputs = Vec::new();
                for (member_index, claim) in members.into_iter().enumerate() {
                    let mut branch_state = state.clone();
                    *branch_state.claim_stack.last_mut().expect("checked above") =
                        ClaimStackEntry::Single(claim);
                    let mut branch_touched = touched_inputs.clone();
                    branch_touched.push(member_index as u32);
                    outputs.extend(run_branch(
                        program,
                        branch_state,
                        control_map,
                        branch_touched,
                        step_limit,
                        step_count,
                    ));
                }
                return outputs;
            }
        }

        let pointer = state.pointer;
        match step(instruction, &mut state, control_map) {
            Ok(()) => {}
            Err(Trap) => {
                trace!("branch trapped on {} at pointer {pointer}", instruction.opcode.name());
                return Vec::new();
            }
        }

        step_count += 1;
        if step_count >= step_limit {
            debug!("branch abandoned after reaching step limit of {step_limit}");
            return Vec::new();
        }
    }
}

fn step(
    instruction: &crate::state::Instruction,
    state: &mut InterpreterState,
    control_map: &ControlMap,
) -> Result<(), Trap> {
    let pointer = state.pointer;
    let mut next_pointer = pointer + 1;

    match instruction.opcode {
        Opcode::If | Opcode::While => {
            let condition = *state.int_stack.last().ok_or(Trap)?;
            if condition == 0 {
                next_pointer = control_map.closer_of(pointer).ok_or(Trap)? + 1;
            }
        }
        Opcode::Else => {
            next_pointer = control_map.closer_of(pointer).ok_or(Trap)? + 1;
        }
        Opcode::For => {
            let count = *state.int_stack.last().ok_or(Trap)?;
            if count > 0 {
                state.for_counters.push(count);
            } else {
                next_pointer = control_map.closer_of(pointer).ok_or(Trap)? + 1;
            }
        }
        Opcode::End => {
            let (opener_pos, opener_opcode) = control_map.opener_of(pointer).ok_or(Trap)?;
            match opener_opcode {
                Opcode::If | Opcode::Else => {}
                Opcode::While => next_pointer = opener_pos,
                Opcode::For => {
                    let counter = state.for_counters.last_mut().ok_or(Trap)?;
                    *counter -= 1;
                    if *counter <= 0 {
                        state.for_counters.pop();
                    } else {
                        next_pointer = opener_pos + 1;
                    }
                }
                _ => return Err(Trap),
            }
        }
        other => execute_stack_effect(other, &instruction.args, state)?,
    }

    state.pointer = next_pointer;
    Ok(())
}

fn nonneg_arg(args: &[Int]) -> Result<usize, Trap> {
    let value = *args.first().ok_or(Trap)?;
    if value < 0 {
        return Err(Trap);
    }
    Ok(value as usize)
}

fn forward<T>(stack: &mut Vec<T>, depth: usize) -> Result<(), Trap> {
    let len = stack.len();
    if depth + 2 > len {
        return Err(Trap);
    }
    let value = stack.remove(len - (depth + 2));
    stack.push(value);
    Ok(())
}

fn swap<T>(stack: &mut [T], depth: usize) -> Result<(), Trap> {
    let len = stack.len();
    if depth + 2 > len {
        return Err(Trap);
    }
    stack.swap(len - (depth + 2), len - 1);
    Ok(())
}

fn duplicate<T: Clone>(stack: &mut Vec<T>, depth: usize) -> Result<(), Trap> {
    let len = stack.len();
    if depth >= len {
        return Err(Trap);
    }
    let value = stack[len - 1 - depth].clone();
    stack.push(value);
    Ok(())
}

fn remove<T>(stack: &mut Vec<T>, depth: usize) -> Result<(), Trap> {
    let len = stack.len();
    if depth >= len {
        return Err(Trap);
    }
    stack.remove(len - 1 - depth);
    Ok(())
}

fn binary_int_op(state: &mut InterpreterState, f: impl FnOnce(Int, Int) -> Int) -> Result<(), Trap> {
    let len = state.int_stack.len();
    if len < 2 {
        return Err(Trap);
    }
    let top = state.int_stack[len - 1];
    let second = state.int_stack[len - 2];
    state.int_stack.push(f(top, second));
    Ok(())
}

fn unary_int_op(state: &mut InterpreterState, f: impl FnOnce(Int) -> Int) -> Result<(), Trap> {
    let top = *state.int_stack.last().ok_or(Trap)?;
    state.int_stack.push(f(top));
    Ok(())
}

fn top_claim(claim_stack: &[ClaimStackEntry]) -> Result<&Claim, Trap> {
    match claim_stack.last() {
        Some(ClaimStackEntry::Single(claim)) => Ok(claim),
        _ => Err(Trap),
    }
}

fn top_claim_mut(claim_stack: &mut [ClaimStackEntry]) -> Result<&mut Claim, Trap> {
    match claim_stack.last_mut() {
        Some(ClaimStackEntry::Single(claim)) => Ok(claim),
        _ => Err(Trap),
    }
}

fn execute_stack_effect(
    opcode: Opcode,
    args: &[Int],
    state: &mut InterpreterState,
) -> Result<(), Trap> {
    match opcode {
        Opcode::ForwardInt => forward(&mut state.int_stack, nonneg_arg(args)?)?,
        Opcode::SwapInt => swap(&mut state.int_stack, nonneg_arg(args)?)?,
        Opcode::DuplicateInt => duplicate(&mut state.int_stack, nonneg_arg(args)?)?,
        Opcode::RemoveInt => remove(&mut state.int_stack, nonneg_arg(args)?)?,

        Opcode::ForwardClaimSet => forward(&mut state.claim_stack, nonneg_arg(args)?)?,
        Opcode::SwapClaimSet => swap(&mut state.claim_stack, nonneg_arg(args)?)?,
        Opcode::DuplicateClaimSet => duplicate(&mut state.claim_stack, nonneg_arg(args)?)?,
        Opcode::RemoveClaimSet => remove(&mut state.claim_stack, nonneg_arg(args)?)?,

        Opcode::PushConst => {
            let value = *args.first().ok_or(Trap)?;
            state.int_stack.push(value);
        }
        Opcode::Add => binary_int_op(state, |top, second| top + second)?,
        Opcode::Equal => binary_int_op(state, |top, second| (top == second) as Int)?,
        Opcode::Less => binary_int_op(state, |top, second| (top < second) as Int)?,
        Opcode::Negate => unary_int_op(state, |top| -top)?,
        Opcode::Not => unary_int_op(state, |top| (top == 0) as Int)?,
        Opcode::And => binary_int_op(state, |top, second| (top != 0 && second != 0) as Int)?,
        Opcode::Or => binary_int_op(state, |top, second| (top != 0 || second != 0) as Int)?,
        Opcode::Xor => binary_int_op(state, |top, second| (top != 0 && second != 0) as Int)?,

        Opcode::IntCount => state.int_stack.push(state.int_stack.len() as Int),
        Opcode::ClaimSetCount => state.int_stack.push(state.claim_stack.len() as Int),
        Opcode::ClaimIntCount => {
            let count = top_claim(&state.claim_stack)?.payload.len() as Int;
            state.int_stack.push(count);
        }
        Opcode::ClaimBool => {
            let polarity = top_claim(&state.claim_stack)?.polarity as Int;
            state.int_stack.push(polarity);
        }
        Opcode::ClaimInt => {
            let index_arg = *args.first().ok_or(Trap)?;
            let claim = top_claim(&state.claim_stack)?;
            let index = resolve_index(index_arg, claim.payload.len()).ok_or(Trap)?;
            let value = claim.payload[index];
            state.int_stack.push(value);
        }
        Opcode::NewClaim => state
            .claim_stack
            .push(ClaimStackEntry::Single(Claim::new(true, Vec::new()))),
        Opcode::SetClaimBool => {
            let top = *state.int_stack.last().ok_or(Trap)?;
            top_claim_mut(&mut state.claim_stack)?.polarity = top != 0;
        }
        Opcode::SetClaimInt => {
            let index_arg = *args.first().ok_or(Trap)?;
            let top = *state.int_stack.last().ok_or(Trap)?;
            let claim = top_claim_mut(&mut state.claim_stack)?;
            let index = resolve_index(index_arg, claim.payload.len()).ok_or(Trap)?;
            claim.payload[index] = top;
        }
        Opcode::PushClaimInt => {
            let top = *state.int_stack.last().ok_or(Trap)?;
            top_claim_mut(&mut state.claim_stack)?.payload.push(top);
        }
        Opcode::RemoveClaimInt => {
            let index_arg = *args.first().ok_or(Trap)?;
            let claim = top_claim_mut(&mut state.claim_stack)?;
            let index = resolve_index(index_arg, claim.payload.len()).ok_or(Trap)?;
            claim.payload.remove(index);
        }
        Opcode::Assert => {
            let top = *state.int_stack.last().ok_or(Trap)?;
            if top == 0 {
                return Err(Trap);
            }
        }
        Opcode::Exec => return Err(Trap),
        Opcode::If | Opcode::Else | Opcode::While | Opcode::For | Opcode::End => {
            unreachable!("control-flow opcodes are handled in step()")
        }
    }
    Ok(())
}

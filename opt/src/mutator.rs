//! The mutation engine: produces a validity-preserving random variant of a
//! theory by repeatedly drawing a candidate edit and keeping it only if the
//! result is still a valid program. Rejected candidates are resampled and do
//! not count against the requested number of steps.

use rand::Rng;
use smallvec::SmallVec;
use tracing::{debug, trace};

use mindlab_lang::{is_valid, ExecReference, Instruction, Int, Opcode, Program, OPCODE_COUNT};

use crate::random::{choose_from_distribution, geometric_trials, random_int, random_nonneg_int, uniform_index};

const MUTATION_TYPE_DISTRIBUTION: [f64; 3] = [0.4, 0.4, 0.2];
const INSERTION_TYPE_DISTRIBUTION: [f64; 3] = [0.9, 0.05, 0.05];

/// Produces a variant of `theories[theory_index]` by applying `steps`
/// accepted mutations in sequence. Each step draws insertion (90% basic
/// instruction, 5% theory reference, 5% routine reference), deletion, or
/// inline-expansion with overall weights 0.4/0.4/0.2, retrying until a
/// structurally valid candidate is produced.
pub fn vary(
    theories: &[Program],
    theory_index: usize,
    routines: &[Program],
    mut steps: u32,
    rng: &mut impl Rng,
) -> Program {
    let mut theory = theories[theory_index].clone();

    while steps > 0 {
        let candidate = match choose_from_distribution(rng, &MUTATION_TYPE_DISTRIBUTION) {
            0 => try_insertion(&theory, theories, theory_index, routines, rng),
            1 => try_deletion(&theory, rng),
            _ => try_inline(&theory, theories, theory_index, routines, rng),
        };

        let Some(candidate) = candidate else {
            trace!("mutation candidate unavailable, resampling");
            continue;
        };

        if is_valid(&candidate) {
            theory = candidate;
            steps -= 1;
            debug!("mutation accepted, {steps} step(s) remaining");
        } else {
            trace!("mutation candidate rejected, invalid program");
        }
    }

    theory
}

fn try_insertion(
    theory: &Program,
    theories: &[Program],
    theory_index: usize,
    routines: &[Program],
    rng: &mut impl Rng,
) -> Option<Program> {
    let insertion_index = uniform_index(rng, theory.len() + 1);

    match choose_from_distribution(rng, &INSERTION_TYPE_DISTRIBUTION) {
        0 => {
            let opcode_index = uniform_index(rng, OPCODE_COUNT - 1) as u8;
            let opcode = Opcode::from_index(opcode_index).expect("index in range");
            let args = random_args_for(opcode, rng);
            let instruction = Instruction::new(opcode, args).expect("args constructed to match");

            let mut new_theory = theory.clone();
            new_theory.insert(insertion_index, instruction);

            if opcode.is_block_starter() {
                let offset = 1 + geometric_trials(rng) as usize;
                let end_index = (insertion_index + offset).min(new_theory.len());
                new_theory.insert(end_index, Instruction::nullary(Opcode::End).unwrap());
            }

            Some(new_theory)
        }
        1 => {
            if theories.len() == 1 {
                return None;
            }
            let chosen = uniform_other_index(rng, theories.len(), theory_index);
            let instruction =
                Instruction::with_arg(Opcode::Exec, ExecReference::Theory(chosen).encode())
                    .expect("exec takes one arg");
            let mut new_theory = theory.clone();
            new_theory.insert(insertion_index, instruction);
            Some(new_theory)
        }
        _ => {
            if routines.is_empty() {
                return None;
            }
            let chosen = uniform_index(rng, routines.len());
            let instruction =
                Instruction::with_arg(Opcode::Exec, ExecReference::Routine(chosen).encode())
                    .expect("exec takes one arg");
            let mut new_theory = theory.clone();
            new_theory.insert(insertion_index, instruction);
            Some(new_theory)
        }
    }
}

fn try_deletion(theory: &Program, rng: &mut impl Rng) -> Option<Program> {
    if theory.is_empty() {
        return None;
    }

    let deletion_index = uniform_index(rng, theory.len());
    let deleted_opcode = theory[deletion_index].opcode;

    let mut new_theory = theory.clone();
    new_theory.remove(deletion_index);

    if deleted_opcode.is_block_starter() {
        if let Some(closer) = find_forward_match(&new_theory, deletion_index) {
            new_theory.remove(closer);
        }
    }

    if deleted_opcode == Opcode::End {
        if let Some(opener) = find_backward_match(&new_theory, deletion_index) {
            new_theory.remove(opener);
        }
    }

    Some(new_theory)
}

/// Starting just after a removed block-starter, scans forward counting
/// nested starters/ends to find the `end` that used to close it.
fn find_forward_match(theory: &Program, start: usize) -> Option<usize> {
    let mut depth = 1i32;
    for i in start..theory.len() {
        let opcode = theory[i].opcode;
        if opcode.is_block_starter() {
            depth += 1;
        }
        if opcode == Opcode::End {
            depth -= 1;
        }
        if depth == 0 {
            return Some(i);
        }
    }
    None
}

/// Starting just before a removed `end`, scans backward counting nested
/// ends/starters to find the opener that used to be closed by it.
fn find_backward_match(theory: &Program, before: usize) -> Option<usize> {
    let mut depth = 1i32;
    for i in (0..before).rev() {
        let opcode = theory[i].opcode;
        if opcode.is_block_starter() {
            depth -= 1;
        }
        if opcode == Opcode::End {
            depth += 1;
        }
        if depth == 0 {
            return Some(i);
        }
    }
    None
}

fn try_inline(
    theory: &Program,
    theories: &[Program],
    _theory_index: usize,
    routines: &[Program],
    rng: &mut impl Rng,
) -> Option<Program> {
    let exec_indices: Vec<usize> = theory
        .iter()
        .enumerate()
        .filter(|(_, instruction)| instruction.opcode == Opcode::Exec)
        .map(|(index, _)| index)
        .collect();

    if exec_indices.is_empty() {
        return None;
    }

    let exec_index = exec_indices[uniform_index(rng, exec_indices.len())];
    let reference = ExecReference::decode(theory[exec_index].args[0]);

    let body = match reference {
        ExecReference::Routine(r) => routines[r].clone(),
        ExecReference::Theory(t) => theories[t].clone(),
    };

    let mut new_theory = theory.clone();
    new_theory.splice(exec_index..=exec_index, body);
    Some(new_theory)
}

fn random_args_for(opcode: Opcode, rng: &mut impl Rng) -> SmallVec<[Int; 1]> {
    use mindlab_lang::ArgKind;
    let mut args = SmallVec::new();
    match opcode.arg_kind() {
        ArgKind::None => {}
        ArgKind::NonNegInt => args.push(random_nonneg_int(rng)),
        ArgKind::AnyInt => args.push(random_int(rng)),
    }
    args
}

/// Uniformly picks an index in `0..count`, excluding `exclude`.
fn uniform_other_index(rng: &mut impl Rng, count: usize, exclude: usize) -> usize {
    let pick = uniform_index(rng, count - 1);
    if pick >= exclude {
        pick + 1
    } else {
        pick
    }
}

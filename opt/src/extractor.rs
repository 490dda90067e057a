//! Routine extraction: finds the longest instruction sequence repeated
//! (without overlap) across a set of theories and routines, and factors it
//! out into a new shared routine referenced by `exec`.

use hashbrown::HashMap;

use mindlab_lang::{is_valid, ExecReference, Instruction, Program};

/// Assigns each distinct instruction a dense integer id, in first-seen
/// order, so the longest-repeated-substring search can work over a plain
/// integer alphabet instead of comparing `Instruction` values directly.
struct InstructionAlphabet {
    ids: HashMap<Instruction, u32>,
}

impl InstructionAlphabet {
    fn build<'a>(programs: impl Iterator<Item = &'a Instruction>) -> Self {
        let mut ids = HashMap::new();
        let mut next_id = 0u32;
        for instruction in programs {
            ids.entry(instruction.clone()).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
        }
        InstructionAlphabet { ids }
    }

    fn symbol_of(&self, instruction: &Instruction) -> u32 {
        self.ids[instruction]
    }

    fn len(&self) -> u32 {
        self.ids.len() as u32
    }
}

/// Concatenates `programs` with a unique separator symbol after each one,
/// so a repeated run can never span a program boundary. Returns the flat
/// symbol stream and a parallel stream of the originating instructions
/// (`None` at separator positions).
fn concat_with_separators(
    programs: &[Program],
    alphabet: &InstructionAlphabet,
) -> (Vec<u32>, Vec<Option<Instruction>>) {
    let separator_base = alphabet.len();
    let mut symbols = Vec::new();
    let mut instructions = Vec::new();

    for (program_index, program) in programs.iter().enumerate() {
        for instruction in program {
            symbols.push(alphabet.symbol_of(instruction));
            instructions.push(Some(instruction.clone()));
        }
        symbols.push(separator_base + program_index as u32);
        instructions.push(None);
    }

    (symbols, instructions)
}

/// Classic O(n^2) longest-repeated-nonoverlapping-substring DP. Validity is
/// checked only when a new best length is found, since that is the
/// expensive operation.
fn longest_valid_repeated_nonoverlapping_run(
    symbols: &[u32],
    instructions: &[Option<Instruction>],
) -> Vec<Instruction> {
    let n = symbols.len();
    let mut table = vec![vec![0usize; n + 1]; n + 1];

    let mut best_len = 0usize;
    let mut best: Vec<Instruction> = Vec::new();

    for i in 1..=n {
        for i2 in (i + 1)..=n {
            if symbols[i - 1] == symbols[i2 - 1] && table[i - 1][i2 - 1] < (i2 - i) {
                table[i][i2] = table[i - 1][i2 - 1] + 1;
                if table[i][i2] > best_len {
                    let start = i - table[i][i2];
                    let candidate: Vec<Instruction> = instructions[start..i]
                        .iter()
                        .map(|slot| slot.clone().expect("repeated run cannot cross a separator"))
                        .collect();
                    if is_valid(&candidate) {
                        best_len = table[i][i2];
                        best = candidate;
                    }
                }
            }
        }
    }

    best
}

/// Replaces every non-overlapping, left-to-right occurrence of `pattern` in
/// `program` with a single `replacement` instruction.
pub fn replace_instance(program: &Program, pattern: &[Instruction], replacement: &Instruction) -> Program {
    if pattern.is_empty() {
        return program.clone();
    }

    let mut result: Vec<Instruction> = Vec::with_capacity(program.len());
    let mut matched = 0usize;

    for item in program {
        result.push(item.clone());
        if *item == pattern[matched] {
            matched += 1;
            if matched >= pattern.len() {
                result.truncate(result.len() - matched);
                result.push(replacement.clone());
                matched = 0;
            }
        } else {
            matched = 0;
        }
    }

    result
}

/// Attempts to extract a new shared routine from `theories` and `routines`.
/// On success, returns the rewritten theories and the full new routine list
/// (existing routines, each with occurrences of the extracted pattern
/// replaced by a reference to it, plus the extracted routine itself
/// appended at the end). Returns `None` if no repeated run of at least two
/// instructions could be found.
pub fn extract_new_routine(
    theories: &[Program],
    routines: &[Program],
) -> Option<(Vec<Program>, Vec<Program>)> {
    let all_programs: Vec<Program> = theories.iter().chain(routines.iter()).cloned().collect();

    let alphabet = InstructionAlphabet::build(all_programs.iter().flat_map(|p| p.iter()));
    let (symbols, instructions) = concat_with_separators(&all_programs, &alphabet);
    let function = longest_valid_repeated_nonoverlapping_run(&symbols, &instructions);

    if function.len() < 2 {
        return None;
    }

    let new_routine_index = routines.len();
    let replacement =
        Instruction::with_arg(mindlab_lang::Opcode::Exec, ExecReference::Routine(new_routine_index).encode())
            .expect("exec takes one arg");

    let rewritten: Vec<Program> = all_programs
        .iter()
        .map(|program| replace_instance(program, &function, &replacement))
        .collect();

    let (rewritten_theories, rewritten_routines) = rewritten.split_at(theories.len());
    let mut new_routines = rewritten_routines.to_vec();
    new_routines.push(function);

    Some((rewritten_theories.to_vec(), new_routines))
}

/// Rewrites `theories` so that any literal occurrence of an existing
/// routine's body is replaced by a reference to that routine, checking
/// routines in index order so later replacements see the effect of earlier
/// ones.
pub fn extract_routine_instances(theories: &[Program], routines: &[Program]) -> Vec<Program> {
    theories
        .iter()
        .map(|theory| {
            let mut theory = theory.clone();
            for (routine_index, routine) in routines.iter().enumerate() {
                let replacement = Instruction::with_arg(
                    mindlab_lang::Opcode::Exec,
                    ExecReference::Routine(routine_index).encode(),
                )
                .expect("exec takes one arg");
                theory = replace_instance(&theory, routine, &replacement);
            }
            theory
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindlab_lang::Opcode;

    fn op(opcode: Opcode) -> Instruction {
        Instruction::nullary(opcode).unwrap()
    }

    fn with_arg(opcode: Opcode, arg: i64) -> Instruction {
        Instruction::with_arg(opcode, arg).unwrap()
    }

    #[test]
    fn extracts_shared_tail_across_two_theories() {
        let shared = vec![
            with_arg(Opcode::PushConst, 1),
            op(Opcode::IntCount),
            op(Opcode::Add),
        ];
        let mut theory_a = vec![with_arg(Opcode::PushConst, 7)];
        theory_a.extend(shared.clone());
        let mut theory_b = vec![with_arg(Opcode::PushConst, 9)];
        theory_b.extend(shared.clone());

        let theories = vec![theory_a, theory_b];
        let (new_theories, new_routines) =
            extract_new_routine(&theories, &[]).expect("expected a shared routine to be found");

        assert_eq!(new_routines.last().unwrap(), &shared);
        for theory in &new_theories {
            assert!(theory.iter().any(|i| i.opcode == Opcode::Exec));
        }
    }

    #[test]
    fn no_shared_code_returns_none() {
        let theories = vec![
            vec![with_arg(Opcode::PushConst, 1)],
            vec![op(Opcode::NewClaim)],
        ];
        assert!(extract_new_routine(&theories, &[]).is_none());
    }

    #[test]
    fn replace_instance_handles_back_to_back_matches() {
        let pattern = vec![op(Opcode::NewClaim), op(Opcode::ClaimBool)];
        let program = vec![
            op(Opcode::NewClaim),
            op(Opcode::ClaimBool),
            op(Opcode::NewClaim),
            op(Opcode::ClaimBool),
        ];
        let replacement = with_arg(Opcode::Exec, 0);
        let result = replace_instance(&program, &pattern, &replacement);
        assert_eq!(result, vec![replacement.clone(), replacement]);
    }

    #[test]
    fn extract_routine_instances_rewrites_in_index_order() {
        let routine = vec![op(Opcode::NewClaim), op(Opcode::ClaimBool)];
        let theory = vec![
            with_arg(Opcode::PushConst, 1),
            op(Opcode::NewClaim),
            op(Opcode::ClaimBool),
        ];
        let rewritten = extract_routine_instances(&[theory], &[routine]);
        assert_eq!(rewritten[0].last().unwrap().opcode, Opcode::Exec);
    }
}

//! Property-based coverage for the mutation engine: validity preservation
//! should hold over any starting theory and any seed, not just the fixed
//! cases in `src/mutator.rs`'s unit tests.

use mindlab_lang::{is_valid, Instruction, Opcode, Program};
use mindlab_opt::vary;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn arb_opcode() -> impl Strategy<Value = Opcode> {
    (0u8..mindlab_lang::OPCODE_COUNT as u8 - 1).prop_map(|i| Opcode::from_index(i).unwrap())
}

/// Builds a small, already-valid theory: a flat run of non-block opcodes
/// with zero or matching args, so every generated starting point is valid
/// before a single mutation is applied.
fn arb_flat_theory() -> impl Strategy<Value = Program> {
    prop::collection::vec(arb_opcode(), 0..12).prop_map(|opcodes| {
        opcodes
            .into_iter()
            .filter(|op| !op.is_block_starter() && *op != Opcode::Else && *op != Opcode::End)
            .map(|op| match op.arg_kind() {
                mindlab_lang::ArgKind::None => Instruction::nullary(op).unwrap(),
                mindlab_lang::ArgKind::NonNegInt => Instruction::with_arg(op, 0).unwrap(),
                mindlab_lang::ArgKind::AnyInt => Instruction::with_arg(op, -1).unwrap(),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn vary_always_returns_a_valid_theory(theory in arb_flat_theory(), seed: u64, steps in 0u32..10) {
        prop_assume!(is_valid(&theory));
        let theories = vec![theory];
        let mut rng = StdRng::seed_from_u64(seed);
        let varied = vary(&theories, 0, &[], steps, &mut rng);
        prop_assert!(is_valid(&varied));
    }

    #[test]
    fn vary_with_zero_steps_is_the_identity(theory in arb_flat_theory(), seed: u64) {
        prop_assume!(is_valid(&theory));
        let theories = vec![theory.clone()];
        let mut rng = StdRng::seed_from_u64(seed);
        let varied = vary(&theories, 0, &[], 0, &mut rng);
        prop_assert_eq!(varied, theory);
    }
}

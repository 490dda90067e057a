//! Command-line driver: runs a small built-in demo mind through rounds of
//! claim generation, mutation, and routine extraction, then prints a report.
//! There is no persisted state or config file — every run starts fresh from
//! the built-in seed theories.

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use mindlab::mind::Mind;
use mindlab_lang::{Claim, Instruction, Opcode};

#[derive(Parser)]
#[command(name = "mindlab", about = "Run the bytecode-theory demo mind")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Seed for the pseudo-random generator driving mutation and claim
    /// generation. Fixed by default so runs are reproducible.
    #[arg(long, global = true, default_value_t = 0)]
    seed: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Run claim generation for a number of rounds and print the mind.
    Generate {
        #[arg(long, default_value_t = 10)]
        rounds: u32,
    },
    /// Produce a mutated variant of the seed "increment" theory.
    Vary {
        #[arg(long, default_value_t = 3)]
        steps: u32,
    },
    /// Run extraction on the seed theories and print what was found.
    Extract,
}

fn seed_mind() -> Mind {
    let increment_theory = vec![
        Instruction::with_arg(Opcode::ClaimInt, -1).unwrap(),
        Instruction::with_arg(Opcode::PushConst, 1).unwrap(),
        Instruction::nullary(Opcode::Add).unwrap(),
        Instruction::with_arg(Opcode::RemoveClaimInt, -1).unwrap(),
        Instruction::nullary(Opcode::PushClaimInt).unwrap(),
        Instruction::with_arg(Opcode::RemoveInt, 0).unwrap(),
        Instruction::with_arg(Opcode::RemoveInt, 0).unwrap(),
        Instruction::with_arg(Opcode::RemoveInt, 0).unwrap(),
    ];
    let seed_claims = vec![Claim::new(true, vec![0, 0])];
    Mind::new(vec![increment_theory], vec![], seed_claims)
}

fn main() {
    let cli = Cli::parse();

    #[cfg(feature = "verbose")]
    {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut mind = seed_mind();

    match cli.command {
        Command::Generate { rounds } => {
            for _ in 0..rounds {
                mind.generate_claims(&mut rng);
            }
            print!("{}", mind.to_string_report(true, true, true, true));
        }
        Command::Vary { steps } => {
            mind.add_varied_theory(0, steps, &mut rng);
            print!("{}", mind.to_string_report(true, false, false, false));
        }
        Command::Extract => {
            mind.theories.push(mind.theories[0].clone());
            mind.extract_new_routines(None);
            print!("{}", mind.to_string_report(true, true, false, false));
        }
    }
}

//! The mind container: the population of theories, routines, and claims a
//! session accumulates, plus the bookkeeping (claim dedup, contradiction
//! detection, provenance traces) that turns raw interpreter output into a
//! growing, queryable body of claims.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use hashbrown::HashMap;
use rand::Rng;

use mindlab_lang::{inline_routine_execs_only, program_string, Claim, Int, Program};
use mindlab_opt::{extract_new_routine, extract_routine_instances, vary};

const DEFAULT_HASH_TABLE_SIZE: usize = 1000;
const DEFAULT_STEP_LIMIT: u32 = 10_000;

/// How a claim entered the mind: seeded directly (`Axiom`), or produced by
/// running a theory against some subset of the existing population
/// (`Derived`), recording which input claims (by index into the claim set
/// passed to that run) its forks selected along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRecord {
    Axiom,
    Derived {
        theory_index: usize,
        touched_input_indices: Vec<u32>,
    },
}

/// A claim's recursively-unfolded lineage: either the index of an axiom
/// claim, or the theory that derived it plus a trace for each input claim
/// it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimTrace {
    Axiom(usize),
    Derived(usize, Vec<ClaimTrace>),
}

/// Two claims that share a payload but disagree on polarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub new_claim_trace: ClaimTrace,
    pub existing_claim_trace: ClaimTrace,
}

pub struct Mind {
    pub theories: Vec<Program>,
    pub routines: Vec<Program>,
    pub claims: Vec<Claim>,
    pub claim_records: Vec<ClaimRecord>,
    pub problems: Vec<Problem>,
    claim_hash_table: HashMap<usize, Vec<usize>>,
    hash_table_size: usize,
    pub step_limit: u32,
}

impl Mind {
    pub fn new(theories: Vec<Program>, routines: Vec<Program>, claims: Vec<Claim>) -> Self {
        Self::with_hash_table_size(theories, routines, claims, DEFAULT_HASH_TABLE_SIZE)
    }

    pub fn with_hash_table_size(
        theories: Vec<Program>,
        routines: Vec<Program>,
        claims: Vec<Claim>,
        hash_table_size: usize,
    ) -> Self {
        let claim_records = claims.iter().map(|_| ClaimRecord::Axiom).collect();
        Mind {
            theories,
            routines,
            claims,
            claim_records,
            problems: Vec::new(),
            claim_hash_table: HashMap::new(),
            hash_table_size: hash_table_size.max(1),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Picks a random theory and runs it against the mind's entire current
    /// claim population, adding whatever claims the run produces.
    pub fn generate_claims(&mut self, rng: &mut impl Rng) {
        if self.theories.is_empty() {
            return;
        }
        let theory_index = rng.gen_range(0..self.theories.len());
        let outputs = mindlab_lang::run(
            theory_index,
            &self.theories,
            &self.routines,
            self.claims.clone(),
            self.step_limit,
        );

        for output in outputs {
            self.add_claim(
                output.result_claim,
                ClaimRecord::Derived {
                    theory_index,
                    touched_input_indices: output.touched_input_indices,
                },
            );
        }
    }

    /// Adds `claim` with provenance `record`, skipping it if an identical
    /// (claim, record) pair is already present, and recording a `Problem`
    /// against every same-payload, opposite-polarity claim it finds along
    /// the way. The scan is abandoned — and no problems are recorded — the
    /// moment an exact duplicate is found, mirroring the original
    /// bucket-scan's early exit.
    pub fn add_claim(&mut self, claim: Claim, record: ClaimRecord) {
        let claim_index = self.claims.len();
        let bucket_index = self.bucket_for(&claim.payload);

        let mut contradicting: Vec<usize> = Vec::new();
        let mut is_unique = true;

        for &old_index in self.claim_hash_table.get(&bucket_index).into_iter().flatten() {
            let existing = &self.claims[old_index];
            if existing.payload != claim.payload {
                continue;
            }
            if existing.polarity == claim.polarity {
                if self.claim_records[old_index] == record {
                    is_unique = false;
                    break;
                }
            } else {
                contradicting.push(old_index);
            }
        }

        if !is_unique {
            return;
        }

        self.claims.push(claim);
        self.claim_records.push(record);

        for old_index in contradicting {
            self.add_problem(claim_index, old_index);
        }

        self.claim_hash_table
            .entry(bucket_index)
            .or_insert_with(Vec::new)
            .push(claim_index);
    }

    fn bucket_for(&self, payload: &[Int]) -> usize {
        let mut hasher = DefaultHasher::new();
        payload.hash(&mut hasher);
        (hasher.finish() % self.hash_table_size as u64) as usize
    }

    fn add_problem(&mut self, new_claim_index: usize, existing_claim_index: usize) {
        self.problems.push(Problem {
            new_claim_trace: self.claim_trace(new_claim_index),
            existing_claim_trace: self.claim_trace(existing_claim_index),
        });
    }

    pub fn claim_trace(&self, claim_index: usize) -> ClaimTrace {
        match &self.claim_records[claim_index] {
            ClaimRecord::Axiom => ClaimTrace::Axiom(claim_index),
            ClaimRecord::Derived {
                theory_index,
                touched_input_indices,
            } => ClaimTrace::Derived(
                *theory_index,
                touched_input_indices
                    .iter()
                    .map(|&index| self.claim_trace(index as usize))
                    .collect(),
            ),
        }
    }

    /// Generates a random variant of theory `theory_index` and appends it
    /// as a new theory.
    pub fn add_varied_theory(&mut self, theory_index: usize, steps: u32, rng: &mut impl Rng) {
        let varied = vary(&self.theories, theory_index, &self.routines, steps, rng);
        self.theories.push(varied);
    }

    /// Iteratively extracts shared routines from the current theories and
    /// routines until no repeated run of at least two instructions remains,
    /// or `max_to_extract` extractions have been made.
    pub fn extract_new_routines(&mut self, max_to_extract: Option<u32>) {
        let mut extracted = 0u32;
        loop {
            if let Some(max) = max_to_extract {
                if extracted >= max {
                    break;
                }
            }
            match extract_new_routine(&self.theories, &self.routines) {
                Some((theories, routines)) => {
                    self.theories = theories;
                    self.routines = routines;
                    extracted += 1;
                }
                None => break,
            }
        }
    }

    /// Replaces any literal occurrence of an existing routine's body inside
    /// a theory with a reference to that routine.
    pub fn replace_routine_instances(&mut self) {
        self.theories = extract_routine_instances(&self.theories, &self.routines);
    }

    /// Erases every routine, inlining each reference to one in place.
    /// Theory-to-theory references are left untouched.
    pub fn inline_and_delete_all_routines(&mut self) {
        self.theories = (0..self.theories.len())
            .map(|i| inline_routine_execs_only(i, &self.theories, &self.routines))
            .collect();
        self.routines.clear();
    }

    pub fn to_string_report(
        &self,
        show_theories: bool,
        show_routines: bool,
        show_claims: bool,
        show_problems: bool,
    ) -> String {
        let mut out = String::new();

        if show_theories {
            out.push_str("THEORIES:\n");
            for (i, theory) in self.theories.iter().enumerate() {
                out.push_str(&format!("{i}:\n{}\n", program_string(theory)));
            }
        }
        if show_routines {
            out.push_str("\nROUTINES:\n");
            for (i, routine) in self.routines.iter().enumerate() {
                out.push_str(&format!("{i}:\n{}\n", program_string(routine)));
            }
        }
        if show_claims {
            out.push_str("\nCLAIMS:\n");
            for (i, claim) in self.claims.iter().enumerate() {
                out.push_str(&format!(
                    "{i}:\n{claim:?}\nfrom:{:?}\n\n",
                    self.claim_records[i]
                ));
            }
        }
        if show_problems {
            out.push_str("\nPROBLEMS:\n");
            for (i, problem) in self.problems.iter().enumerate() {
                out.push_str(&format!("{i}:\n{problem:?}\n\n"));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindlab_lang::{Instruction, Opcode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn add_claim_deduplicates_identical_claim_and_record() {
        let mut mind = Mind::new(vec![], vec![], vec![]);
        let claim = Claim::new(true, vec![1, 2]);
        let record = ClaimRecord::Derived {
            theory_index: 0,
            touched_input_indices: vec![0],
        };
        mind.add_claim(claim.clone(), record.clone());
        mind.add_claim(claim, record);
        assert_eq!(mind.claims.len(), 1);
    }

    #[test]
    fn add_claim_flags_contradiction_on_opposite_polarity() {
        let mut mind = Mind::new(vec![], vec![], vec![]);
        mind.add_claim(Claim::new(true, vec![1, 2]), ClaimRecord::Axiom);
        mind.add_claim(Claim::new(false, vec![1, 2]), ClaimRecord::Axiom);
        assert_eq!(mind.claims.len(), 2);
        assert_eq!(mind.problems.len(), 1);
    }

    #[test]
    fn same_payload_different_record_is_kept_as_distinct_claim() {
        let mut mind = Mind::new(vec![], vec![], vec![]);
        mind.add_claim(
            Claim::new(true, vec![1]),
            ClaimRecord::Derived {
                theory_index: 0,
                touched_input_indices: vec![0],
            },
        );
        mind.add_claim(
            Claim::new(true, vec![1]),
            ClaimRecord::Derived {
                theory_index: 1,
                touched_input_indices: vec![0],
            },
        );
        assert_eq!(mind.claims.len(), 2);
        assert!(mind.problems.is_empty());
    }

    #[test]
    fn claim_trace_unfolds_lineage_recursively() {
        let mut mind = Mind::new(vec![], vec![], vec![]);
        mind.add_claim(Claim::new(true, vec![0]), ClaimRecord::Axiom);
        mind.add_claim(
            Claim::new(true, vec![1]),
            ClaimRecord::Derived {
                theory_index: 3,
                touched_input_indices: vec![0],
            },
        );
        let trace = mind.claim_trace(1);
        assert_eq!(
            trace,
            ClaimTrace::Derived(3, vec![ClaimTrace::Axiom(0)])
        );
    }

    #[test]
    fn generate_claims_on_empty_mind_does_nothing() {
        let mut mind = Mind::new(vec![], vec![], vec![]);
        let mut rng = StdRng::seed_from_u64(0);
        mind.generate_claims(&mut rng);
        assert!(mind.claims.is_empty());
    }

    #[test]
    fn inline_and_delete_all_routines_clears_routines() {
        let theory = vec![Instruction::with_arg(
            Opcode::Exec,
            mindlab_lang::ExecReference::Routine(0).encode(),
        )
        .unwrap()];
        let routine = vec![Instruction::nullary(Opcode::NewClaim).unwrap()];
        let mut mind = Mind::new(vec![theory], vec![routine], vec![]);
        mind.inline_and_delete_all_routines();
        assert!(mind.routines.is_empty());
        assert_eq!(mind.theories[0][0].opcode, Opcode::NewClaim);
    }
}

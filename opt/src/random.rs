//! Random sampling primitives shared by the mutator: a categorical chooser
//! and the Geometric(0.5) distribution the original algorithm leans on for
//! every "how big/far/negative should this be" decision.

use rand::Rng;

/// Counts coin flips until the first success, p=0.5. Support is {1, 2, 3,
/// ...} — this is `rand_distr::Geometric`'s definition without the extra
/// dependency, since p is fixed.
pub fn geometric_trials(rng: &mut impl Rng) -> u64 {
    let mut trials = 1u64;
    while !rng.gen_bool(0.5) {
        trials += 1;
    }
    trials
}

/// A non-negative integer argument: always >= 1 (Geometric(0.5) never
/// produces 0), mirroring the distribution the mutator was built around.
pub fn random_nonneg_int(rng: &mut impl Rng) -> i64 {
    geometric_trials(rng) as i64
}

/// A signed integer argument: positive with probability 1/2 (Geometric(0.5)
/// again), negative with probability 1/2 (`-(1 + Geometric(0.5))`).
pub fn random_int(rng: &mut impl Rng) -> i64 {
    if rng.gen_bool(0.5) {
        geometric_trials(rng) as i64
    } else {
        -(1 + geometric_trials(rng) as i64)
    }
}

/// Picks an index into `distribution` (non-negative weights, assumed to sum
/// to ~1) via a single uniform draw and a cumulative scan.
pub fn choose_from_distribution(rng: &mut impl Rng, distribution: &[f64]) -> usize {
    let mut remaining: f64 = rng.gen_range(0.0..1.0);
    for (index, weight) in distribution.iter().enumerate() {
        remaining -= weight;
        if remaining <= 0.0 {
            return index;
        }
    }
    distribution.len() - 1
}

/// A uniform index in `0..len`, inclusive of neither endpoint oddity: same
/// `floor(random() * len)` shape as the source algorithm.
pub fn uniform_index(rng: &mut impl Rng, len: usize) -> usize {
    rng.gen_range(0..len)
}

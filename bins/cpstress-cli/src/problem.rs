//! The problem definition under stress.
//!
//! Edit the three trait impls below to describe your problem: how a random
//! test is built, what makes it valid, and what counts as a correct answer.
//! The shipped example is "read two integers, print their sum".

use cpstress_common::strategy::{Checker, Generator, Validator};

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Counter-based splitmix64 stream. Deterministic for a given seed, so a
/// failing case replays exactly from the seed the harness printed.
pub struct DeterministicRng {
    seed: u64,
    counter: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, counter: 0 }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(1);
        splitmix64(self.seed.wrapping_add(self.counter.wrapping_mul(GOLDEN_GAMMA)))
    }

    /// Uniform draw in `[lo, hi]`, inclusive on both ends.
    pub fn next_in(&mut self, lo: i64, hi: i64) -> i64 {
        debug_assert!(lo <= hi);
        let span = (hi - lo) as u64 + 1;
        lo + (self.next_u64() % span) as i64
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Inclusive bound on either operand of the example problem.
const OPERAND_BOUND: i64 = 1_000_000_000;

/// Example problem: the input is two integers `a b`, the answer is `a + b`.
pub struct SumOfTwo;

impl Generator for SumOfTwo {
    fn generate(&self, seed: u64) -> String {
        let mut rng = DeterministicRng::new(seed);
        let a = rng.next_in(-OPERAND_BOUND, OPERAND_BOUND);
        let b = rng.next_in(-OPERAND_BOUND, OPERAND_BOUND);
        format!("{a} {b}\n")
    }
}

impl Validator for SumOfTwo {
    fn validate(&self, input: &str) -> bool {
        let mut fields = input.split_whitespace();
        let in_range = |field: Option<&str>| {
            field
                .and_then(|t| t.parse::<i64>().ok())
                .is_some_and(|v| v.abs() <= OPERAND_BOUND)
        };
        // Exactly two bounded integers; anything after them fails the input.
        in_range(fields.next()) && in_range(fields.next()) && fields.next().is_none()
    }
}

impl Checker for SumOfTwo {
    fn check(&self, input: &str, output: &str) -> bool {
        let mut operands = input
            .split_whitespace()
            .filter_map(|t| t.parse::<i64>().ok());
        let (Some(a), Some(b)) = (operands.next(), operands.next()) else {
            return false;
        };
        let mut answer = output.split_whitespace();
        let Some(value) = answer.next().and_then(|t| t.parse::<i64>().ok()) else {
            return false;
        };
        // The sum is unique, but whitespace layout is the candidate's choice.
        answer.next().is_none() && value == a + b
    }
}

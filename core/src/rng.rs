//! Deterministic random number generation.
//!
//! RULE: Nothing in the pipeline may call any platform RNG.
//! The fractional splitter is the only consumer, and it is always
//! seeded from the configured seed so repeated runs partition identically.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct SplitRng {
    inner: Pcg64Mcg,
}

impl SplitRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }

    /// Roll a u64 in [0, n). `n` must be non-zero.
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        debug_assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n.max(1)
    }

    /// Fisher–Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_u64_below(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }
}

//! Deterministic utilities for reproducible splitting and training
//!
//! LCG-based RNG, seeded permutations and split tie-breaking, so that the
//! same seed and inputs always give the same split and the same model.

use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses constants from Numerical Recipes (glibc)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: u64) -> Self {
        Self {
            state: Wrapping((seed % Self::MODULUS as u64) as i64),
        }
    }

    /// Next value in [0, MODULUS), taken from the upper state bits
    pub fn next_i64(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        (self.state.0 >> 16) & (Self::MODULUS - 1)
    }

    /// Next value in [0, max)
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_i64() as u64 % max as u64) as usize
    }

    /// Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(i + 1);
            items.swap(i, j);
        }
    }

    /// Random ordering of `0..n`
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        self.shuffle(&mut order);
        order
    }
}

/// Deterministic tie-breaker for split selection
///
/// Equal-gain candidates are ordered by the feature's position in the
/// seeded visiting order, then by threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_rank: usize,
    pub threshold: i64,
}

impl SplitTieBreaker {
    pub fn new(feature_rank: usize, threshold: i64) -> Self {
        Self {
            feature_rank,
            threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_i64(), rng2.next_i64());
        }
    }

    #[test]
    fn test_lcg_range() {
        let mut rng = LcgRng::new(42);
        for _ in 0..100 {
            assert!(rng.next_range(10) < 10);
        }
        assert_eq!(rng.next_range(0), 0);
    }

    #[test]
    fn test_permutation_is_complete_and_seeded() {
        let a = LcgRng::new(4).permutation(20);
        let b = LcgRng::new(4).permutation(20);
        let c = LcgRng::new(5).permutation(20);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_tie_breaker_ordering() {
        let t1 = SplitTieBreaker::new(0, 100);
        let t2 = SplitTieBreaker::new(0, 200);
        let t3 = SplitTieBreaker::new(1, 50);

        assert!(t1 < t2);
        assert!(t2 < t3);
    }
}

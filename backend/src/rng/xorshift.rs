//! xorshift64* random number generator
//!
//! This is a fast, high-quality PRNG that is deterministic and suitable
//! for simulation purposes.
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Determinism
//!
//! Same seed → same sequence of random numbers → identical trade log.
//! One generator is owned per run, so independent runs never share state.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use market_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let price = rng.range_inclusive(0, 200); // [0, 200]
/// assert!((0..=200).contains(&price));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is coerced to 1 (xorshift cannot leave the zero state).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Generate random value in range [min, max] (both ends inclusive)
    ///
    /// Consumes exactly one draw, like [`RngManager::range`].
    ///
    /// # Panics
    /// Panics if min > max
    pub fn range_inclusive(&mut self, min: i64, max: i64) -> i64 {
        assert!(min <= max, "min must not exceed max");
        self.range(min, max + 1)
    }

    /// Pick an index uniformly from `0..len`
    ///
    /// # Panics
    /// Panics if len == 0
    pub fn choose_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "cannot choose from an empty collection");
        self.range(0, len as i64) as usize
    }

    /// Fair coin flip (one draw, decided by the top output bit)
    pub fn coin_flip(&mut self) -> bool {
        self.next() >> 63 == 1
    }

    /// Get current RNG state (for checkpointing/replay)
    ///
    /// `RngManager::new(state)` recreates a generator that continues the
    /// same sequence.
    pub fn get_state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    #[should_panic(expected = "min must be less than max")]
    fn test_range_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.range(100, 50);
    }

    #[test]
    fn test_range_inclusive_hits_both_ends() {
        let mut rng = RngManager::new(7);
        let mut seen = [false; 3];
        for _ in 0..500 {
            let v = rng.range_inclusive(0, 2);
            seen[v as usize] = true;
        }
        assert!(seen.iter().all(|s| *s), "every value in [0, 2] should appear");
    }

    #[test]
    fn test_range_inclusive_degenerate() {
        let mut rng = RngManager::new(7);
        assert_eq!(rng.range_inclusive(4, 4), 4);
    }

    #[test]
    #[should_panic(expected = "cannot choose from an empty collection")]
    fn test_choose_index_empty() {
        let mut rng = RngManager::new(1);
        rng.choose_index(0);
    }

    #[test]
    fn test_coin_flip_produces_both_sides() {
        let mut rng = RngManager::new(99);
        let heads = (0..1000).filter(|_| rng.coin_flip()).count();
        assert!(heads > 400 && heads < 600, "coin looks biased: {} heads", heads);
    }
}

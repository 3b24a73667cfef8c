//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ algorithm for fast, high-quality, deterministic randomness.
//! Given the same seed, produces identical sequence on all platforms.
//!
//! Trap resolution never keeps a long-lived generator: each end-of-turn pass
//! builds a fresh one from [`derive_turn_seed`], so the outcome of turn `n`
//! depends only on the match seed and `n`.

use serde::{Deserialize, Serialize};

use super::fixed::{Fixed, FIXED_ONE};

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use robot_arena::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from sequential seeds (seed + turn).
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create the generator used for one end-of-turn resolution.
    pub fn for_turn(match_seed: u64, turn: u32) -> Self {
        Self::new(derive_turn_seed(match_seed, turn))
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large max, but acceptable
        (self.next_u64() % u64::from(max)) as u32
    }

    /// Generate a random integer in range [min, max] (inclusive).
    #[inline]
    pub fn next_int_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        min + self.next_int(max - min + 1)
    }

    /// Generate a random Fixed in range [0, max).
    #[inline]
    pub fn next_fixed(&mut self, max: Fixed) -> Fixed {
        if max <= 0 {
            return 0;
        }
        // Use upper 32 bits to avoid overflow in multiplication
        let raw = (self.next_u64() >> 32) as u32;
        ((i64::from(raw) * i64::from(max)) >> 32) as Fixed
    }

    /// Generate a random boolean with given probability.
    ///
    /// probability is in range [0, FIXED_ONE] where FIXED_ONE = 100%
    #[inline]
    pub fn next_bool(&mut self, probability: Fixed) -> bool {
        self.next_fixed(FIXED_ONE) < probability
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Combine the match seed with a turn number.
///
/// Independent of wall-clock time and message arrival order: the only
/// inputs are the match's fixed seed and the turn counter.
#[inline]
pub fn derive_turn_seed(match_seed: u64, turn: u32) -> u64 {
    match_seed.wrapping_add(u64::from(turn))
}

/// Derive the seed of the match that follows `previous_seed` (rematch).
#[inline]
pub fn derive_rematch_seed(previous_seed: u64) -> u64 {
    let mut s = previous_seed;
    splitmix64(&mut s)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        // Very unlikely to match
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_turn_generators_differ() {
        let mut turn1 = DeterministicRng::for_turn(777, 1);
        let mut turn2 = DeterministicRng::for_turn(777, 2);
        assert_ne!(turn1.next_u64(), turn2.next_u64());

        let mut again = DeterministicRng::for_turn(777, 1);
        let mut turn1_replay = DeterministicRng::for_turn(777, 1);
        assert_eq!(again.next_u64(), turn1_replay.next_u64());
    }

    #[test]
    fn test_next_int_range_inclusive() {
        let mut rng = DeterministicRng::new(5678);
        let mut seen = [false; 3];

        for _ in 0..1000 {
            let val = rng.next_int_range(2, 4);
            assert!((2..=4).contains(&val));
            seen[(val - 2) as usize] = true;
        }

        // Both bounds are reachable
        assert!(seen.iter().all(|s| *s));

        // Edge case: min = max
        assert_eq!(rng.next_int_range(5, 5), 5);
    }

    #[test]
    fn test_next_bool_extremes() {
        let mut rng = DeterministicRng::new(42);
        for _ in 0..1000 {
            assert!(!rng.next_bool(0));
            assert!(rng.next_bool(FIXED_ONE));
        }
    }

    #[test]
    fn test_next_bool_rate() {
        let mut rng = DeterministicRng::new(9999);
        let chance = FIXED_ONE / 4;
        let hits = (0..10_000).filter(|_| rng.next_bool(chance)).count();

        // 25% +/- a generous margin
        assert!((2000..3000).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn test_rematch_seed_is_stable() {
        assert_eq!(derive_rematch_seed(10), derive_rematch_seed(10));
        assert_ne!(derive_rematch_seed(10), 10);
    }
}

//! Deterministic random number generation for the initial deal.
//!
//! The reducer never draws randomness; the only random step in a match is
//! the shuffle performed when the match is dealt. Both clients may compute
//! the deal independently, so the seed is derived from the match id by
//! default and the same match id always produces the same deal.
//!
//! ```
//! use ccg_duel::core::{GameRng, MatchId};
//!
//! let seed = GameRng::seed_for(&MatchId::new("match-7"));
//! let mut a = GameRng::new(seed);
//! let mut b = GameRng::new(seed);
//!
//! let mut deck_a: Vec<u32> = (0..20).collect();
//! let mut deck_b = deck_a.clone();
//! a.shuffle(&mut deck_a);
//! b.shuffle(&mut deck_b);
//! assert_eq!(deck_a, deck_b);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

use super::entity::MatchId;

/// Deterministic RNG for dealing.
///
/// Uses ChaCha8 so the sequence is identical across platforms.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Derive a stable seed from a match id.
    ///
    /// `FxHasher` has no per-process random state, so two clients hashing the
    /// same id agree on the seed.
    #[must_use]
    pub fn seed_for(match_id: &MatchId) -> u64 {
        let mut hasher = FxHasher::default();
        match_id.as_str().hash(&mut hasher);
        hasher.finish()
    }

    /// The seed this RNG was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a random usize in the given range.
    pub fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        self.inner.gen_range(range)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }
}

//! Uniform shape randomizer
//!
//! Every spawn picks one entry of the shape table with equal probability.
//! The game only sees the [`PieceSource`] trait, so tests can script the
//! sequence of shapes.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Something that chooses the next shape
pub trait PieceSource {
    /// Return an index in `0..table_len`
    fn next_index(&mut self, table_len: usize) -> usize;
}

/// Seeded uniform randomizer
#[derive(Debug, Clone)]
pub struct Randomizer {
    rng: ChaCha8Rng,
}

impl Default for Randomizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Randomizer {
    /// Create a randomizer seeded from OS entropy
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create a reproducible randomizer
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl PieceSource for Randomizer {
    fn next_index(&mut self, table_len: usize) -> usize {
        self.rng.gen_range(0..table_len)
    }
}

/// Replays a fixed list of indices, wrapping around at the end
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct Sequence {
    indices: Vec<usize>,
    position: usize,
}

#[cfg(test)]
impl Sequence {
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            indices,
            position: 0,
        }
    }
}

#[cfg(test)]
impl PieceSource for Sequence {
    fn next_index(&mut self, table_len: usize) -> usize {
        if self.indices.is_empty() {
            return 0;
        }
        let index = self.indices[self.position % self.indices.len()];
        self.position += 1;
        index % table_len
    }
}

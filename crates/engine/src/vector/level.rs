//! Layer assignment for new graph nodes
//!
//! A node's top layer is drawn as `floor(-ln(U) * mL)` with `U` uniform in
//! (0, 1]. The random source is injected so tests can fix it; the default is
//! a seeded SplitMix64 stream, which makes graph construction reproducible:
//! same seed + same insertion order = same levels.

use rand::{Rng, RngCore};

/// Upper bound on assigned levels
///
/// With mL = 1/ln(16) the probability of reaching this level is ~16^-32.
pub const MAX_LEVEL: usize = 32;

/// Deterministic SplitMix64 generator
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    /// Create a generator from a seed
    pub fn new(seed: u64) -> Self {
        SplitMix64 { state: seed }
    }
}

impl RngCore for SplitMix64 {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut x = self.state;
        x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
        x ^ (x >> 31)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Draws node levels from an injectable random source
pub struct LevelGenerator {
    rng: Box<dyn RngCore + Send + Sync>,
    ml: f64,
}

impl LevelGenerator {
    /// Create a generator with the given source and level multiplier
    pub fn new(rng: Box<dyn RngCore + Send + Sync>, ml: f64) -> Self {
        LevelGenerator { rng, ml }
    }

    /// Default generator: SplitMix64 seeded with `seed`
    pub fn seeded(seed: u64, ml: f64) -> Self {
        Self::new(Box::new(SplitMix64::new(seed)), ml)
    }

    /// Level multiplier mL
    pub fn ml(&self) -> f64 {
        self.ml
    }

    /// Draw the next level
    pub fn next_level(&mut self) -> usize {
        // gen::<f64>() is in [0, 1); flip to (0, 1] so ln never sees 0
        let uniform = 1.0 - self.rng.gen::<f64>();
        let level = (-uniform.ln() * self.ml).floor();
        (level as usize).min(MAX_LEVEL)
    }
}

impl std::fmt::Debug for LevelGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelGenerator").field("ml", &self.ml).finish()
    }
}

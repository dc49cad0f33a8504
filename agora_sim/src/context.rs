//! Simulation context: tick clock and seeded randomness.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Deterministic tick counter and RNG for one simulation.
///
/// All behavioural randomness (activation order, customer decisions,
/// system events) is drawn from a ChaCha8 stream seeded here, so a run is
/// reproducible from its seed. Message timestamps are wall-clock and are
/// not part of that guarantee.
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Ticks completed so far
    tick: u64,

    rng: ChaCha8Rng,
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Advances the clock by one tick and returns the new tick number
    /// (the first tick is 1).
    pub fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Derives an independent RNG stream, e.g. for population setup, so
    /// that it does not shift the main stream.
    pub fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng {
        let combined_seed = self.seed.wrapping_mul(0x517cc1b727220a95) ^ seed_extension;
        ChaCha8Rng::seed_from_u64(combined_seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_sim_context_ticks() {
        let mut ctx = SimContext::new(42);
        assert_eq!(ctx.tick(), 0);

        assert_eq!(ctx.advance_tick(), 1);
        assert_eq!(ctx.advance_tick(), 2);
        assert_eq!(ctx.tick(), 2);
    }

    #[test]
    fn test_sim_context_deterministic_rng() {
        let mut ctx1 = SimContext::new(42);
        let mut ctx2 = SimContext::new(42);

        let a: Vec<u32> = (0..8).map(|_| ctx1.rng().gen()).collect();
        let b: Vec<u32> = (0..8).map(|_| ctx2.rng().gen()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derived_streams_differ() {
        let ctx = SimContext::new(42);

        let x: u64 = ctx.derive_rng(1).gen();
        let y: u64 = ctx.derive_rng(1).gen();
        let z: u64 = ctx.derive_rng(2).gen();

        assert_eq!(x, y);
        assert_ne!(x, z);
    }
}

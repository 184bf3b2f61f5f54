//! Round-based search for sprite placements: mutate every slot's hypothesis, evaluate the
//! batch, keep improvements, reroll the weakest slots, and commit the best slot once per round.
use rand::RngCore;

pub mod cancel;
pub mod diversity;
pub mod evaluator;
pub mod events;
pub mod hypothesis;
pub mod mutation;
pub mod population;
pub mod runner;
pub mod selection;

/// Default side length of the population grid; the grid holds `GRID_SIZE * GRID_SIZE` slots.
pub const GRID_SIZE: usize = 64;

/// Default number of mutate/evaluate iterations per round.
pub const MUTATION_ITERS: usize = 1024;

/// Default number of sprites committed before the run stops.
pub const SPRITE_LIMIT: usize = 64;

/// Default horizontal aspect correction of the canvas.
pub const ASPECT_RATIO: f32 = 1.65;

/// One slot in `REROLL_DIVISOR` is rerolled every iteration.
pub const REROLL_DIVISOR: usize = 100;

/// Magnitude of the additive perturbations applied by the mutation engine.
pub const MUTATION_STEP: f32 = 1.0 / 16.0;

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f32 {
    // 24 random mantissa bits keep the result strictly below 1.0
    (rng.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

/// Generate a random float in the range [start, end).
#[inline]
pub(crate) fn rand_range(rng: &mut dyn RngCore, start: f32, end: f32) -> f32 {
    rand01(rng) * (end - start) + start
}

/// Creates a deterministic RNG seed for a slot from the run seed.
pub fn seed_for_slot(base_seed: u64, slot: usize) -> u64 {
    let mixed = base_seed ^ (slot as u64).wrapping_mul(0x9E3779B97F4A7C15);
    mix_u64(mixed)
}

#[inline]
fn mix_u64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

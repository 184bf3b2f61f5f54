//! Mutation engine: one random tweak per slot per iteration.
use std::f32::consts::TAU;

use rand::RngCore;

use crate::search::hypothesis::{Hypothesis, SearchSpace};
use crate::search::{rand_range, MUTATION_STEP};

/// The seven tweaks a hypothesis can receive, picked uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Shift `x` and `y` by up to ±1/16.
    Translate,
    /// Grow or shrink `width` and `height` by up to ±1/16.
    Resize,
    /// Turn by up to ±1/16 radian, wrapped to `[0, 2π)`.
    Rotate,
    /// Change alpha by up to ±1/16, clamped to `[0, 1]`.
    Fade,
    FlipHorizontal,
    FlipVertical,
    /// Pick a fresh atlas shape.
    Reshape,
}

impl MutationKind {
    pub const ALL: [MutationKind; 7] = [
        MutationKind::Translate,
        MutationKind::Resize,
        MutationKind::Rotate,
        MutationKind::Fade,
        MutationKind::FlipHorizontal,
        MutationKind::FlipVertical,
        MutationKind::Reshape,
    ];

    /// Uniform pick over [`MutationKind::ALL`].
    pub fn random(rng: &mut dyn RngCore) -> Self {
        Self::ALL[(rng.next_u32() % Self::ALL.len() as u32) as usize]
    }

    /// Applies this tweak in place, then folds the atlas id back into range.
    pub fn apply(self, h: &mut Hypothesis, rng: &mut dyn RngCore, space: &SearchSpace) {
        match self {
            MutationKind::Translate => {
                h.x += step(rng);
                h.y += step(rng);
            }
            MutationKind::Resize => {
                h.width += step(rng);
                h.height += step(rng);
            }
            MutationKind::Rotate => {
                h.angle = (h.angle + step(rng)).rem_euclid(TAU);
                if h.angle >= TAU {
                    h.angle = 0.0;
                }
            }
            MutationKind::Fade => {
                h.alpha = (h.alpha + step(rng)).clamp(0.0, 1.0);
            }
            MutationKind::FlipHorizontal => h.width = -h.width,
            MutationKind::FlipVertical => h.height = -h.height,
            MutationKind::Reshape => h.atlas_id = space.random_atlas_id(rng),
        }
        h.atlas_id %= space.shape_count;
    }
}

/// Returns a copy of `best` with one uniformly chosen mutation applied.
pub fn mutate(best: &Hypothesis, rng: &mut dyn RngCore, space: &SearchSpace) -> Hypothesis {
    let mut next = *best;
    MutationKind::random(rng).apply(&mut next, rng, space);
    next
}

#[inline]
fn step(rng: &mut dyn RngCore) -> f32 {
    rand_range(rng, -MUTATION_STEP, MUTATION_STEP)
}

//! Population grid: `side * side` independent slots, each hill-climbing its own hypothesis.
//!
//! Slots never read each other. Each owns an RNG stream derived from the run seed, so mutating
//! them in parallel gives the same result as mutating them in order.
use glam::Vec4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::canvas::geometry::BoundingBox;
use crate::search::evaluator::{Candidate, SlotEvaluation};
use crate::search::hypothesis::{Hypothesis, SearchSpace};
use crate::search::mutation::mutate;
use crate::search::seed_for_slot;

/// One candidate slot of the population.
#[derive(Clone, Debug)]
pub struct GridSlot {
    best: Hypothesis,
    best_score: f32,
    best_color: Vec4,
    current: Hypothesis,
    current_bounds: BoundingBox,
    rng: StdRng,
}

impl GridSlot {
    fn new(seed: u64, space: &SearchSpace) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let best = Hypothesis::random(&mut rng, space);
        Self {
            best,
            best_score: 0.0,
            best_color: Vec4::ZERO,
            current: best,
            current_bounds: BoundingBox::EMPTY,
            rng,
        }
    }

    pub fn best(&self) -> &Hypothesis {
        &self.best
    }

    pub fn best_score(&self) -> f32 {
        self.best_score
    }

    /// Average color computed when the best hypothesis was scored.
    pub fn best_color(&self) -> Vec4 {
        self.best_color
    }

    /// Hypothesis under evaluation in the current iteration.
    pub fn current(&self) -> &Hypothesis {
        &self.current
    }

    pub fn current_bounds(&self) -> &BoundingBox {
        &self.current_bounds
    }

    fn reroll(&mut self, space: &SearchSpace) {
        self.best = Hypothesis::random(&mut self.rng, space);
        self.best_score = 0.0;
        self.best_color = Vec4::ZERO;
    }
}

/// Fixed-size population of [`GridSlot`]s.
#[derive(Clone, Debug)]
pub struct PopulationGrid {
    side: usize,
    space: SearchSpace,
    slots: Vec<GridSlot>,
}

impl PopulationGrid {
    /// Creates `side * side` slots with random hypotheses and zero scores.
    pub fn initialize(side: usize, seed: u64, space: SearchSpace) -> Self {
        let slots = (0..side * side)
            .map(|i| GridSlot::new(seed_for_slot(seed, i), &space))
            .collect();
        Self { side, space, slots }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn slots(&self) -> &[GridSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&GridSlot> {
        self.slots.get(index)
    }

    /// Read-only view of every slot's best hypothesis and score, in slot order.
    pub fn snapshot_best(&self) -> impl ExactSizeIterator<Item = (&Hypothesis, f32)> + '_ {
        self.slots.iter().map(|s| (&s.best, s.best_score))
    }

    pub fn best_scores(&self) -> Vec<f32> {
        self.slots.iter().map(|s| s.best_score).collect()
    }

    /// Copies each slot's best hypothesis into its current one, applies one mutation, and
    /// refreshes the current bounding box.
    pub fn mutate_all(&mut self) {
        let space = self.space;
        self.slots.par_iter_mut().for_each(|slot| {
            slot.current = mutate(&slot.best, &mut slot.rng, &space);
            slot.current_bounds = slot.current.bounding_box(space.aspect_ratio);
        });
    }

    /// The current hypotheses as an evaluation batch.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.slots
            .iter()
            .map(|s| Candidate::new(s.current, s.current_bounds))
            .collect()
    }

    /// Keeps every current hypothesis that beat its slot's best score. Returns how many did.
    pub fn apply_evaluations(&mut self, evaluations: &[SlotEvaluation]) -> usize {
        debug_assert_eq!(evaluations.len(), self.slots.len());
        let mut improved = 0;
        for (slot, eval) in self.slots.iter_mut().zip(evaluations) {
            if eval.score > slot.best_score {
                slot.best = slot.current;
                slot.best_score = eval.score;
                slot.best_color = eval.color;
                improved += 1;
            }
        }
        improved
    }

    /// Re-randomizes the given slots and zeroes their scores. Unknown indices are ignored.
    pub fn reroll(&mut self, indices: &[usize]) {
        let space = self.space;
        for &i in indices {
            if let Some(slot) = self.slots.get_mut(i) {
                slot.reroll(&space);
            }
        }
    }

    /// Zeroes every slot's best score, keeping hypotheses.
    pub fn reset_scores(&mut self) {
        for slot in &mut self.slots {
            slot.best_score = 0.0;
        }
    }
}

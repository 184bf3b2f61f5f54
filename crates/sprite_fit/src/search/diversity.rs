//! Diversity maintenance: the weakest slots are re-randomized after every mutation iteration.
use std::cmp::Ordering;

use crate::search::REROLL_DIVISOR;

/// Number of slots rerolled per iteration for a population of `slot_count` slots.
///
/// Integer division, so populations below [`REROLL_DIVISOR`] slots never reroll.
#[inline]
pub fn reroll_count(slot_count: usize) -> usize {
    slot_count / REROLL_DIVISOR
}

/// Indices of the `count` lowest scores, sorted ascending by index.
///
/// Equal scores resolve toward the lower index. `count` is clamped to the slice length.
pub fn worst_slots(scores: &[f32], count: usize) -> Vec<usize> {
    let count = count.min(scores.len());
    if count == 0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    let cmp = |a: &usize, b: &usize| -> Ordering {
        scores[*a].total_cmp(&scores[*b]).then_with(|| a.cmp(b))
    };
    if count < order.len() {
        order.select_nth_unstable_by(count - 1, cmp);
        order.truncate(count);
    }
    order.sort_unstable();
    order
}

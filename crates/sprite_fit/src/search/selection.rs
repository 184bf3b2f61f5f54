//! Selection of the round winner from the population's best scores.
//!
//! [`pick_best_slot`] is a plain arg-max: the first slot holding the highest score wins. The
//! runner only commits the winner when its score is positive, see
//! [`crate::search::runner::SearchRunner`].

/// Returns the index and score of the highest-scoring slot, or `None` for an empty slice.
///
/// Ties resolve to the lowest index. NaN scores never win over a finite score.
pub fn pick_best_slot(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((i, score)),
        }
    }
    best
}

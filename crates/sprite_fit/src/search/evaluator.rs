//! Evaluator for candidate hypotheses against the target and the composed image.
//!
//! Evaluation runs in two passes over a batch of [`Candidate`]s:
//! 1. average color: the coverage-weighted mean of the target under each candidate's stencil;
//! 2. error: how much compositing the candidate in that color over the [`ComposedImage`]
//!    reduces the squared RGB error against the [`TargetImage`] inside its bounding box.
//!
//! Both passes are per-candidate independent. [`EvaluationBackend`] decides how they are
//! scheduled: [`SequentialBackend`] in order on the calling thread, [`ParallelBackend`] on the
//! rayon pool. Since each candidate's arithmetic is sequential either way, both backends produce
//! identical results.
use glam::Vec4;
use rayon::prelude::*;

use crate::canvas::atlas::ShapeAtlas;
use crate::canvas::geometry::{BoundingBox, CanvasGeometry};
use crate::canvas::target::{ComposedImage, Patch, TargetImage};
use crate::search::hypothesis::Hypothesis;

/// Everything a pass reads. Nothing in a scene changes while a batch is being evaluated.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub target: &'a TargetImage,
    pub composed: &'a ComposedImage,
    pub atlas: &'a dyn ShapeAtlas,
    pub geometry: CanvasGeometry,
}

impl<'a> Scene<'a> {
    pub fn new(
        target: &'a TargetImage,
        composed: &'a ComposedImage,
        atlas: &'a dyn ShapeAtlas,
        geometry: CanvasGeometry,
    ) -> Self {
        Self {
            target,
            composed,
            atlas,
            geometry,
        }
    }
}

/// A hypothesis together with the bounding box that scopes its evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub hypothesis: Hypothesis,
    pub bounds: BoundingBox,
}

impl Candidate {
    pub fn new(hypothesis: Hypothesis, bounds: BoundingBox) -> Self {
        Self { hypothesis, bounds }
    }

    /// Builds a candidate with its bounding box derived from the hypothesis.
    pub fn from_hypothesis(hypothesis: Hypothesis, aspect_ratio: f32) -> Self {
        Self::new(hypothesis, hypothesis.bounding_box(aspect_ratio))
    }
}

/// Result of evaluating one candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotEvaluation {
    /// Error reduction normalized by canvas pixel count. Higher is better; `<= 0` means the
    /// candidate does not help.
    pub score: f32,
    /// Color the candidate would be stamped with.
    pub color: Vec4,
}

impl SlotEvaluation {
    pub const NONE: SlotEvaluation = SlotEvaluation {
        score: 0.0,
        color: Vec4::ZERO,
    };

    pub fn new(score: f32, color: Vec4) -> Self {
        Self { score, color }
    }
}

/// Schedules the two evaluation passes over a batch.
pub trait EvaluationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// One average color per candidate, in batch order.
    fn average_color_pass(&self, scene: &Scene<'_>, candidates: &[Candidate]) -> Vec<Vec4>;

    /// One score per candidate, in batch order. `colors[i]` belongs to `candidates[i]`.
    fn error_pass(&self, scene: &Scene<'_>, candidates: &[Candidate], colors: &[Vec4])
        -> Vec<f32>;

    /// Runs both passes. The color pass completes for the whole batch before scoring starts.
    fn evaluate_batch(&self, scene: &Scene<'_>, candidates: &[Candidate]) -> Vec<SlotEvaluation> {
        let colors = self.average_color_pass(scene, candidates);
        let scores = self.error_pass(scene, candidates, &colors);
        scores
            .into_iter()
            .zip(colors)
            .map(|(score, color)| SlotEvaluation::new(score, color))
            .collect()
    }
}

/// Evaluates candidates one after another on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialBackend;

impl EvaluationBackend for SequentialBackend {
    fn name(&self) -> &str {
        "sequential"
    }

    fn average_color_pass(&self, scene: &Scene<'_>, candidates: &[Candidate]) -> Vec<Vec4> {
        candidates.iter().map(|c| average_color(scene, c)).collect()
    }

    fn error_pass(
        &self,
        scene: &Scene<'_>,
        candidates: &[Candidate],
        colors: &[Vec4],
    ) -> Vec<f32> {
        candidates
            .iter()
            .zip(colors)
            .map(|(c, color)| improvement_score(scene, c, *color))
            .collect()
    }
}

/// Evaluates candidates on the rayon thread pool.
#[derive(Clone, Copy, Debug)]
pub struct ParallelBackend {
    /// Minimum number of candidates handed to one rayon task.
    pub min_batch_len: usize,
}

impl Default for ParallelBackend {
    fn default() -> Self {
        Self { min_batch_len: 16 }
    }
}

impl ParallelBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_batch_len(mut self, min_batch_len: usize) -> Self {
        self.min_batch_len = min_batch_len.max(1);
        self
    }
}

impl EvaluationBackend for ParallelBackend {
    fn name(&self) -> &str {
        "parallel"
    }

    fn average_color_pass(&self, scene: &Scene<'_>, candidates: &[Candidate]) -> Vec<Vec4> {
        candidates
            .par_iter()
            .with_min_len(self.min_batch_len)
            .map(|c| average_color(scene, c))
            .collect()
    }

    fn error_pass(
        &self,
        scene: &Scene<'_>,
        candidates: &[Candidate],
        colors: &[Vec4],
    ) -> Vec<f32> {
        candidates
            .par_iter()
            .zip(colors.par_iter())
            .with_min_len(self.min_batch_len)
            .map(|(c, color)| improvement_score(scene, c, *color))
            .collect()
    }
}

/// Coverage-weighted mean of the target under the candidate's stencil, with alpha `1`.
///
/// Returns transparent black when the candidate covers no pixel.
pub fn average_color(scene: &Scene<'_>, candidate: &Candidate) -> Vec4 {
    let Some(footprint) = candidate.hypothesis.footprint() else {
        return Vec4::ZERO;
    };
    let Some(rect) = scene.geometry.pixel_rect(&candidate.bounds) else {
        return Vec4::ZERO;
    };

    let mut sum = [0.0f64; 3];
    let mut weight = 0.0f64;
    for (x, y) in rect.pixels() {
        let w = footprint.opacity(scene.atlas, scene.geometry.pixel_center(x, y));
        if w <= 0.0 {
            continue;
        }
        let t = scene.target.get(x, y);
        sum[0] += (t.x * w) as f64;
        sum[1] += (t.y * w) as f64;
        sum[2] += (t.z * w) as f64;
        weight += w as f64;
    }

    if weight <= 0.0 {
        return Vec4::ZERO;
    }
    Vec4::new(
        (sum[0] / weight) as f32,
        (sum[1] / weight) as f32,
        (sum[2] / weight) as f32,
        1.0,
    )
}

/// Reduction in squared RGB error from stamping the candidate in `color`, divided by the canvas
/// pixel count. Pixels the stencil does not touch contribute nothing.
pub fn improvement_score(scene: &Scene<'_>, candidate: &Candidate, color: Vec4) -> f32 {
    let Some(footprint) = candidate.hypothesis.footprint() else {
        return 0.0;
    };
    let Some(rect) = scene.geometry.pixel_rect(&candidate.bounds) else {
        return 0.0;
    };

    let color = color.truncate();
    let mut delta = 0.0f64;
    for (x, y) in rect.pixels() {
        let a = footprint.opacity(scene.atlas, scene.geometry.pixel_center(x, y));
        if a <= 0.0 {
            continue;
        }
        let t = scene.target.get(x, y).truncate();
        let c = scene.composed.get(x, y).truncate();
        let blended = c + (color - c) * a;
        let before = (t - c).length_squared();
        let after = (t - blended).length_squared();
        delta += (before - after) as f64;
    }

    (delta / scene.geometry.pixel_count().max(1) as f64) as f32
}

/// Evaluates a single candidate with both passes.
pub fn evaluate_candidate(scene: &Scene<'_>, candidate: &Candidate) -> SlotEvaluation {
    let color = average_color(scene, candidate);
    SlotEvaluation::new(improvement_score(scene, candidate, color), color)
}

/// Renders the candidate over the composed image inside its pixel rectangle.
///
/// This is the only per-candidate buffer the search ever builds, and only for the round winner.
pub fn render_patch(scene: &Scene<'_>, candidate: &Candidate, color: Vec4) -> Option<Patch> {
    let footprint = candidate.hypothesis.footprint()?;
    let rect = scene.geometry.pixel_rect(&candidate.bounds)?;
    let rgb = color.truncate();
    let pixels = rect
        .pixels()
        .map(|(x, y)| {
            let c = scene.composed.get(x, y);
            let a = footprint.opacity(scene.atlas, scene.geometry.pixel_center(x, y));
            if a <= 0.0 {
                return c;
            }
            let blended = c.truncate() + (rgb - c.truncate()) * a;
            blended.extend(c.w + (1.0 - c.w) * a)
        })
        .collect();
    Some(Patch { rect, pixels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::atlas::MaskAtlas;

    const WHITE: Vec4 = Vec4::new(1.0, 1.0, 1.0, 1.0);

    fn square(x: f32, y: f32, size: f32) -> Hypothesis {
        Hypothesis {
            x,
            y,
            width: size,
            height: size,
            angle: 0.0,
            alpha: 1.0,
            atlas_id: 0,
        }
    }

    /// 16x16 black target with a white square over the middle half.
    fn centered_square_target() -> TargetImage {
        let mut bytes = Vec::with_capacity(16 * 16 * 4);
        for y in 0..16 {
            for x in 0..16 {
                let inside = (4..12).contains(&x) && (4..12).contains(&y);
                let v = if inside { 255 } else { 0 };
                bytes.extend_from_slice(&[v, v, v, 255]);
            }
        }
        TargetImage::from_rgba8(16, 16, &bytes).unwrap()
    }

    fn geometry() -> CanvasGeometry {
        CanvasGeometry::new(16, 16, 1.0)
    }

    #[test]
    fn exact_match_gets_target_color_and_positive_score() {
        let target = centered_square_target();
        let composed = ComposedImage::blank(16, 16);
        let atlas = MaskAtlas::procedural(8);
        let scene = Scene::new(&target, &composed, &atlas, geometry());

        let candidate = Candidate::from_hypothesis(square(0.5, 0.5, 0.5), 1.0);
        let eval = evaluate_candidate(&scene, &candidate);
        assert!((eval.color - WHITE).abs().max_element() < 1e-6);
        // 64 pixels go from error 3 to 0 over a 256-pixel canvas
        assert!((eval.score - 0.75).abs() < 1e-5);
    }

    #[test]
    fn candidate_on_matching_background_scores_zero() {
        let target = centered_square_target();
        let composed = ComposedImage::blank(16, 16);
        let atlas = MaskAtlas::procedural(8);
        let scene = Scene::new(&target, &composed, &atlas, geometry());

        let candidate = Candidate::from_hypothesis(square(0.1, 0.1, 0.1), 1.0);
        let eval = evaluate_candidate(&scene, &candidate);
        assert_eq!(eval.color.truncate(), glam::Vec3::ZERO);
        assert_eq!(eval.score, 0.0);
    }

    #[test]
    fn partial_overlap_still_improves() {
        let target = centered_square_target();
        let composed = ComposedImage::blank(16, 16);
        let atlas = MaskAtlas::procedural(8);
        let scene = Scene::new(&target, &composed, &atlas, geometry());

        let candidate = Candidate::from_hypothesis(square(0.25, 0.5, 0.5), 1.0);
        let eval = evaluate_candidate(&scene, &candidate);
        assert!(eval.score > 0.0);
        assert!(eval.color.x > 0.0 && eval.color.x < 1.0);
    }

    #[test]
    fn stamping_the_wrong_color_scores_negative() {
        let target = centered_square_target();
        let composed = ComposedImage::blank(16, 16);
        let atlas = MaskAtlas::procedural(8);
        let scene = Scene::new(&target, &composed, &atlas, geometry());

        let candidate = Candidate::from_hypothesis(square(0.1, 0.1, 0.1), 1.0);
        assert!(improvement_score(&scene, &candidate, WHITE) < 0.0);
    }

    #[test]
    fn degenerate_candidates_are_no_ops() {
        let target = centered_square_target();
        let composed = ComposedImage::blank(16, 16);
        let atlas = MaskAtlas::procedural(8);
        let scene = Scene::new(&target, &composed, &atlas, geometry());

        let flat = Candidate::from_hypothesis(square(0.5, 0.5, 0.0), 1.0);
        assert_eq!(evaluate_candidate(&scene, &flat), SlotEvaluation::NONE);

        let off_canvas = Candidate::from_hypothesis(square(3.0, 3.0, 0.5), 1.0);
        assert!(off_canvas.bounds.is_empty());
        assert_eq!(evaluate_candidate(&scene, &off_canvas), SlotEvaluation::NONE);
        assert!(render_patch(&scene, &off_canvas, WHITE).is_none());
    }

    #[test]
    fn backends_agree() {
        let target = centered_square_target();
        let composed = ComposedImage::blank(16, 16);
        let atlas = MaskAtlas::procedural(8);
        let scene = Scene::new(&target, &composed, &atlas, geometry());

        let candidates: Vec<_> = (0..40)
            .map(|i| {
                let mut h = square(0.05 + i as f32 * 0.02, 0.3 + i as f32 * 0.01, 0.3);
                h.angle = i as f32 * 0.3;
                h.atlas_id = i % 64;
                Candidate::from_hypothesis(h, 1.0)
            })
            .collect();

        let seq = SequentialBackend.evaluate_batch(&scene, &candidates);
        let par = ParallelBackend::new()
            .with_min_batch_len(1)
            .evaluate_batch(&scene, &candidates);
        assert_eq!(seq.len(), candidates.len());
        assert_eq!(seq, par);
    }

    #[test]
    fn patch_blends_by_alpha_inside_stencil() {
        let target = centered_square_target();
        let composed = ComposedImage::blank(16, 16);
        let atlas = MaskAtlas::procedural(8);
        let scene = Scene::new(&target, &composed, &atlas, geometry());

        let mut h = square(0.5, 0.5, 0.5);
        h.alpha = 0.5;
        let candidate = Candidate::from_hypothesis(h, 1.0);
        let patch = render_patch(&scene, &candidate, WHITE).unwrap();
        assert_eq!(patch.rect.len(), patch.pixels.len());
        let center = scene.geometry.pixel_center(8, 8);
        assert!(h.footprint().unwrap().opacity(&atlas, center) > 0.0);
        let idx = ((8 - patch.rect.y0) * patch.rect.width() + (8 - patch.rect.x0)) as usize;
        assert!((patch.pixels[idx] - Vec4::new(0.5, 0.5, 0.5, 0.5)).abs().max_element() < 1e-6);
    }
}

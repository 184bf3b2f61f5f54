//! Round-based runner: drives the population through mutate/evaluate/update/reroll iterations
//! and commits one sprite per round until the sprite limit is reached.
use std::time::{Duration, Instant};

use glam::Vec4;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::canvas::atlas::{ShapeAtlas, ATLAS_SHAPE_COUNT};
use crate::canvas::geometry::CanvasGeometry;
use crate::canvas::raster::encode_rgba8;
use crate::canvas::target::{ComposedImage, TargetImage};
use crate::error::{Error, Result};
use crate::search::cancel::CancellationToken;
use crate::search::diversity::{reroll_count, worst_slots};
use crate::search::evaluator::{render_patch, Candidate, EvaluationBackend, ParallelBackend, Scene};
use crate::search::events::{EventSink, SearchEvent, SearchEventKind};
use crate::search::hypothesis::{Hypothesis, SearchSpace};
use crate::search::population::PopulationGrid;
use crate::search::selection::pick_best_slot;
use crate::search::{ASPECT_RATIO, GRID_SIZE, MUTATION_ITERS, SPRITE_LIMIT};

/// Seed used by [`RunConfig::default`].
pub const DEFAULT_SEED: u64 = 0x5EED_F17E;

const THROUGHPUT_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a search run.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunConfig {
    /// Expected target width in pixels.
    pub canvas_width: u32,
    /// Expected target height in pixels.
    pub canvas_height: u32,
    /// Horizontal extent of the canvas in world units; the vertical extent is `1`.
    pub aspect_ratio: f32,
    /// Side of the population grid.
    pub grid_size: usize,
    /// Mutation iterations per round.
    pub iterations_per_round: usize,
    /// Sprites to commit before stopping.
    pub sprite_limit: usize,
    /// Master seed; every slot derives its own RNG stream from it.
    pub seed: u64,
    /// Upper bound on rounds, stagnant ones included. `None` runs until the sprite limit.
    pub round_limit: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            canvas_width: 330,
            canvas_height: 200,
            aspect_ratio: ASPECT_RATIO,
            grid_size: GRID_SIZE,
            iterations_per_round: MUTATION_ITERS,
            sprite_limit: SPRITE_LIMIT,
            seed: DEFAULT_SEED,
            round_limit: None,
        }
    }
}

impl RunConfig {
    /// Creates a config for a canvas of the given pixel size, keeping the default aspect ratio.
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            ..Default::default()
        }
    }

    /// Creates a config matching `target`, with the aspect ratio taken from its dimensions.
    pub fn for_target(target: &TargetImage) -> Self {
        let (width, height) = target.size();
        let aspect_ratio = if height > 0 {
            width as f32 / height as f32
        } else {
            ASPECT_RATIO
        };
        Self::new(width, height).with_aspect_ratio(aspect_ratio)
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_iterations_per_round(mut self, iterations_per_round: usize) -> Self {
        self.iterations_per_round = iterations_per_round;
        self
    }

    pub fn with_sprite_limit(mut self, sprite_limit: usize) -> Self {
        self.sprite_limit = sprite_limit;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_round_limit(mut self, round_limit: Option<usize>) -> Self {
        self.round_limit = round_limit;
        self
    }

    /// Number of slots in the population grid.
    pub fn slot_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    pub fn geometry(&self) -> CanvasGeometry {
        CanvasGeometry::new(self.canvas_width, self.canvas_height, self.aspect_ratio)
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(Error::InvalidConfig(
                "canvas_width and canvas_height must be > 0".into(),
            ));
        }
        if !self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0 {
            return Err(Error::InvalidConfig(
                "aspect_ratio must be finite and > 0".into(),
            ));
        }
        if self.grid_size == 0 {
            return Err(Error::InvalidConfig("grid_size must be > 0".into()));
        }
        if self.iterations_per_round == 0 {
            return Err(Error::InvalidConfig(
                "iterations_per_round must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Phase of the round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// Iterating mutation, evaluation, update and diversity control.
    Running,
    /// Iteration budget spent; the winner is about to be selected.
    Complete,
    /// A sprite was merged into the composed image.
    Committed,
    /// The run terminated.
    Done,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Termination {
    /// The configured number of sprites was committed.
    SpriteLimit,
    /// The configured number of rounds ran out first.
    RoundLimit,
    /// A [`CancellationToken`] was triggered.
    Cancelled,
}

/// A committed sprite: its hypothesis and the color it was stamped with.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChosenSprite {
    pub hypothesis: Hypothesis,
    /// Straight RGBA color in `[0, 1]`; alpha is always `1`, opacity lives in the hypothesis.
    pub color: Vec4,
}

impl ChosenSprite {
    pub fn new(hypothesis: Hypothesis, color: Vec4) -> Self {
        Self { hypothesis, color }
    }

    /// Center in world units.
    pub fn position(&self) -> mint::Vector2<f32> {
        self.hypothesis.position().into()
    }

    /// Signed width and height in world units; a negative component is a flip.
    pub fn size(&self) -> mint::Vector2<f32> {
        mint::Vector2 {
            x: self.hypothesis.width,
            y: self.hypothesis.height,
        }
    }

    pub fn angle(&self) -> f32 {
        self.hypothesis.angle
    }

    pub fn alpha(&self) -> f32 {
        self.hypothesis.alpha
    }

    pub fn atlas_id(&self) -> u32 {
        self.hypothesis.atlas_id
    }

    pub fn color_rgba8(&self) -> [u8; 4] {
        encode_rgba8(self.color)
    }
}

/// Committed sprites in commit order. Only the runner appends to it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ChosenSequence {
    sprites: Vec<ChosenSprite>,
}

impl ChosenSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChosenSprite> {
        self.sprites.iter()
    }

    pub fn as_slice(&self) -> &[ChosenSprite] {
        &self.sprites
    }

    pub fn last(&self) -> Option<&ChosenSprite> {
        self.sprites.last()
    }

    pub fn into_inner(self) -> Vec<ChosenSprite> {
        self.sprites
    }

    pub(crate) fn push(&mut self, sprite: ChosenSprite) {
        self.sprites.push(sprite);
    }
}

impl<'a> IntoIterator for &'a ChosenSequence {
    type Item = &'a ChosenSprite;
    type IntoIter = std::slice::Iter<'a, ChosenSprite>;

    fn into_iter(self) -> Self::IntoIter {
        self.sprites.iter()
    }
}

/// Result of a search run.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Sprites committed, in order.
    pub sequence: ChosenSequence,
    /// Rounds that ran to completion, stagnant ones included.
    pub rounds: usize,
    /// Completed rounds that did not commit.
    pub stagnant_rounds: usize,
    /// Mutation iterations executed.
    pub iterations: usize,
    pub termination: Termination,
}

/// Drives a search over one target image.
///
/// Evaluation is delegated to `B`; the default [`ParallelBackend`] spreads each pass over the
/// rayon pool.
pub struct SearchRunner<'a, B: EvaluationBackend = ParallelBackend> {
    config: RunConfig,
    target: &'a TargetImage,
    atlas: &'a dyn ShapeAtlas,
    backend: B,
    grid: PopulationGrid,
    composed: ComposedImage,
    sequence: ChosenSequence,
    state: RoundState,
    cancel: Option<CancellationToken>,
    rounds: usize,
    stagnant_rounds: usize,
    iterations: usize,
}

impl<'a> SearchRunner<'a, ParallelBackend> {
    pub fn try_new(
        config: RunConfig,
        target: &'a TargetImage,
        atlas: &'a dyn ShapeAtlas,
    ) -> Result<Self> {
        Self::try_with_backend(config, target, atlas, ParallelBackend::default())
    }

    pub fn new(config: RunConfig, target: &'a TargetImage, atlas: &'a dyn ShapeAtlas) -> Self {
        Self::with_backend(config, target, atlas, ParallelBackend::default())
    }
}

impl<'a, B: EvaluationBackend> SearchRunner<'a, B> {
    /// Validates the config against the target and atlas, then seeds the population.
    pub fn try_with_backend(
        config: RunConfig,
        target: &'a TargetImage,
        atlas: &'a dyn ShapeAtlas,
        backend: B,
    ) -> Result<Self> {
        config.validate()?;
        let expected = (config.canvas_width, config.canvas_height);
        let actual = target.size();
        if expected != actual {
            return Err(Error::TargetSizeMismatch { expected, actual });
        }
        if atlas.shape_count() == 0 {
            return Err(Error::InvalidAtlas("atlas has no shapes".into()));
        }
        if atlas.shape_count() > ATLAS_SHAPE_COUNT {
            return Err(Error::InvalidAtlas(format!(
                "atlas has {} shapes, at most {ATLAS_SHAPE_COUNT} are addressable",
                atlas.shape_count()
            )));
        }
        Ok(Self::with_backend(config, target, atlas, backend))
    }

    pub fn with_backend(
        config: RunConfig,
        target: &'a TargetImage,
        atlas: &'a dyn ShapeAtlas,
        backend: B,
    ) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid run config");
        debug_assert_eq!(
            (config.canvas_width, config.canvas_height),
            target.size(),
            "target size must match the configured canvas"
        );

        let space = SearchSpace::new(config.aspect_ratio, atlas.shape_count());
        let grid = PopulationGrid::initialize(config.grid_size, config.seed, space);
        if reroll_count(grid.len()) == 0 {
            warn!(
                "Population of {} slots is too small to reroll; diversity control is inactive.",
                grid.len()
            );
        }
        let composed = ComposedImage::blank(config.canvas_width, config.canvas_height);

        Self {
            config,
            target,
            atlas,
            backend,
            grid,
            composed,
            sequence: ChosenSequence::new(),
            state: RoundState::Running,
            cancel: None,
            rounds: 0,
            stagnant_rounds: 0,
            iterations: 0,
        }
    }

    /// Stops the run at the next iteration boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn composed(&self) -> &ComposedImage {
        &self.composed
    }

    pub fn grid(&self) -> &PopulationGrid {
        &self.grid
    }

    pub fn sequence(&self) -> &ChosenSequence {
        &self.sequence
    }

    /// Runs until the sprite limit, the round limit, or cancellation.
    pub fn run(&mut self) -> RunResult {
        self.run_internal(&mut ())
    }

    pub fn run_with_events(&mut self, sink: &mut dyn EventSink) -> RunResult {
        self.run_internal(sink)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    fn result(&self, termination: Termination) -> RunResult {
        RunResult {
            sequence: self.sequence.clone(),
            rounds: self.rounds,
            stagnant_rounds: self.stagnant_rounds,
            iterations: self.iterations,
            termination,
        }
    }

    fn run_internal(&mut self, sink: &mut dyn EventSink) -> RunResult {
        if sink.wants(SearchEventKind::RunStarted) {
            sink.send(SearchEvent::RunStarted {
                config: self.config.clone(),
                slot_count: self.grid.len(),
            });
        }

        let termination = self.drive(sink);
        self.state = RoundState::Done;
        let result = self.result(termination);

        info!(
            "Search finished: {} sprites in {} rounds ({} stagnant), {:?}.",
            result.sequence.len(),
            result.rounds,
            result.stagnant_rounds,
            result.termination,
        );
        if sink.wants(SearchEventKind::RunFinished) {
            sink.send(SearchEvent::RunFinished {
                result: result.clone(),
            });
        }
        result
    }

    fn drive(&mut self, sink: &mut dyn EventSink) -> Termination {
        let geometry = self.config.geometry();
        let slot_count = self.grid.len();
        let rerolls = reroll_count(slot_count);
        let mut last_report = Instant::now();
        let mut checks_since_report = 0usize;

        loop {
            if self.sequence.len() >= self.config.sprite_limit {
                return Termination::SpriteLimit;
            }
            if self.config.round_limit.is_some_and(|max| self.rounds >= max) {
                return Termination::RoundLimit;
            }

            let round = self.rounds;
            self.state = RoundState::Running;
            self.grid.reset_scores();
            if sink.wants(SearchEventKind::RoundStarted) {
                sink.send(SearchEvent::RoundStarted {
                    round,
                    committed: self.sequence.len(),
                });
            }

            for iteration in 0..self.config.iterations_per_round {
                if self.is_cancelled() {
                    info!("Search cancelled in round {} at iteration {}.", round, iteration);
                    if sink.wants(SearchEventKind::Cancelled) {
                        sink.send(SearchEvent::Cancelled { round, iteration });
                    }
                    return Termination::Cancelled;
                }

                self.grid.mutate_all();
                let candidates = self.grid.candidates();
                let evaluations = {
                    let scene = Scene::new(self.target, &self.composed, self.atlas, geometry);
                    self.backend.evaluate_batch(&scene, &candidates)
                };
                let improved = self.grid.apply_evaluations(&evaluations);
                let worst = worst_slots(&self.grid.best_scores(), rerolls);
                self.grid.reroll(&worst);
                self.iterations += 1;

                checks_since_report += slot_count;
                let elapsed = last_report.elapsed();
                if elapsed >= THROUGHPUT_LOG_INTERVAL {
                    debug!(
                        "{:.0} checks per second.",
                        checks_since_report as f64 / elapsed.as_secs_f64()
                    );
                    checks_since_report = 0;
                    last_report = Instant::now();
                }

                if sink.wants(SearchEventKind::IterationFinished) {
                    sink.send(SearchEvent::IterationFinished {
                        round,
                        iteration,
                        improved,
                        rerolled: worst.len(),
                    });
                }
            }

            self.state = RoundState::Complete;
            self.rounds += 1;

            let winner = pick_best_slot(&self.grid.best_scores());
            match winner {
                Some((slot, score)) if score > 0.0 => self.commit(round, slot, score, sink),
                other => {
                    let best_score = other.map_or(0.0, |(_, s)| s);
                    self.stagnant_rounds += 1;
                    info!("Round {} found no improvement.", round);
                    if sink.wants(SearchEventKind::RoundStagnated) {
                        sink.send(SearchEvent::RoundStagnated { round, best_score });
                    }
                }
            }
        }
    }

    fn commit(&mut self, round: usize, slot: usize, score: f32, sink: &mut dyn EventSink) {
        let Some(winner) = self.grid.slot(slot) else {
            return;
        };
        let sprite = ChosenSprite::new(*winner.best(), winner.best_color());

        let candidate = Candidate::from_hypothesis(sprite.hypothesis, self.config.aspect_ratio);
        let patch = {
            let scene = Scene::new(
                self.target,
                &self.composed,
                self.atlas,
                self.config.geometry(),
            );
            render_patch(&scene, &candidate, sprite.color)
        };
        if let Some(patch) = patch {
            self.composed.apply_patch(&patch);
        }

        self.sequence.push(sprite);
        self.state = RoundState::Committed;
        info!(
            "{}/{} best score: {:.8}",
            self.sequence.len(),
            self.config.sprite_limit,
            score
        );
        if sink.wants(SearchEventKind::SpriteCommitted) {
            sink.send(SearchEvent::SpriteCommitted {
                round,
                index: self.sequence.len() - 1,
                slot,
                sprite,
                score,
            });
        }
    }
}

/// Fits `sprite_limit` sprites to `target` with default grid settings.
///
/// The canvas size and aspect ratio are taken from the target, so this never fails with
/// [`Error::TargetSizeMismatch`].
pub fn run(
    target: &TargetImage,
    atlas: &dyn ShapeAtlas,
    iterations_per_round: usize,
    sprite_limit: usize,
    seed: u64,
) -> Result<ChosenSequence> {
    let config = RunConfig::for_target(target)
        .with_iterations_per_round(iterations_per_round)
        .with_sprite_limit(sprite_limit)
        .with_seed(seed);
    Ok(run_search(&config, target, atlas, None)?.sequence)
}

/// Runs a search with an explicit config on the parallel backend.
pub fn run_search(
    config: &RunConfig,
    target: &TargetImage,
    atlas: &dyn ShapeAtlas,
    sink: Option<&mut dyn EventSink>,
) -> Result<RunResult> {
    if let Some(s) = sink {
        run_search_with_events(config, target, atlas, s)
    } else {
        run_search_with_events(config, target, atlas, &mut ())
    }
}

pub fn run_search_with_events(
    config: &RunConfig,
    target: &TargetImage,
    atlas: &dyn ShapeAtlas,
    sink: &mut dyn EventSink,
) -> Result<RunResult> {
    let mut runner = SearchRunner::try_new(config.clone(), target, atlas)?;
    Ok(runner.run_with_events(sink))
}

#[cfg(test)]
mod tests {
    use mint::Vector2;

    use super::*;
    use crate::canvas::atlas::MaskAtlas;
    use crate::canvas::geometry::BoundingBox;
    use crate::search::evaluator::SequentialBackend;
    use crate::search::events::{FnSink, VecSink};

    const SIDE: u32 = 32;

    /// Black target with a white square over the middle half.
    fn square_target() -> TargetImage {
        let mut bytes = Vec::with_capacity((SIDE * SIDE * 4) as usize);
        for y in 0..SIDE {
            for x in 0..SIDE {
                let inside = (8..24).contains(&x) && (8..24).contains(&y);
                let v = if inside { 255 } else { 0 };
                bytes.extend_from_slice(&[v, v, v, 255]);
            }
        }
        TargetImage::from_rgba8(SIDE, SIDE, &bytes).unwrap()
    }

    fn black_target() -> TargetImage {
        TargetImage::uniform(SIDE, SIDE, Vec4::new(0.0, 0.0, 0.0, 1.0))
    }

    fn small_config() -> RunConfig {
        RunConfig::new(SIDE, SIDE)
            .with_aspect_ratio(1.0)
            .with_grid_size(4)
            .with_iterations_per_round(50)
            .with_sprite_limit(1)
            .with_seed(7)
    }

    struct CountAtlas(u32);

    impl ShapeAtlas for CountAtlas {
        fn shape_count(&self) -> u32 {
            self.0
        }

        fn coverage(&self, _id: u32, _uv: Vector2<f32>) -> f32 {
            1.0
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slot_count(), GRID_SIZE * GRID_SIZE);
        assert_eq!(config.iterations_per_round, MUTATION_ITERS);
        assert_eq!(config.sprite_limit, SPRITE_LIMIT);
    }

    #[test]
    fn validate_rejects_degenerate_settings() {
        assert!(small_config().with_grid_size(0).validate().is_err());
        assert!(small_config().with_iterations_per_round(0).validate().is_err());
        assert!(small_config().with_aspect_ratio(0.0).validate().is_err());
        assert!(small_config().with_aspect_ratio(f32::NAN).validate().is_err());
        assert!(RunConfig::new(0, 4).validate().is_err());
        assert!(small_config().with_sprite_limit(0).validate().is_ok());
    }

    #[test]
    fn for_target_takes_size_and_aspect() {
        let target = TargetImage::uniform(40, 20, Vec4::ONE);
        let config = RunConfig::for_target(&target);
        assert_eq!((config.canvas_width, config.canvas_height), (40, 20));
        assert_eq!(config.aspect_ratio, 2.0);
    }

    #[test]
    fn target_size_mismatch_is_fatal() {
        let target = TargetImage::uniform(8, 8, Vec4::ONE);
        let atlas = MaskAtlas::procedural(8);
        let err = SearchRunner::try_new(RunConfig::new(16, 8), &target, &atlas)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::TargetSizeMismatch {
                expected: (16, 8),
                actual: (8, 8)
            }
        ));
    }

    #[test]
    fn empty_atlas_is_rejected() {
        let target = black_target();
        let result = SearchRunner::try_new(small_config(), &target, &CountAtlas(0));
        assert!(matches!(result, Err(Error::InvalidAtlas(_))));
    }

    #[test]
    fn oversized_atlas_is_rejected() {
        let target = black_target();
        let result = SearchRunner::try_new(small_config(), &target, &CountAtlas(100));
        assert!(matches!(result, Err(Error::InvalidAtlas(_))));

        let full_atlas = CountAtlas(ATLAS_SHAPE_COUNT);
        assert!(SearchRunner::try_new(small_config(), &target, &full_atlas).is_ok());
    }

    #[test]
    fn zero_limit_returns_empty_sequence_without_rounds() {
        let target = square_target();
        let atlas = MaskAtlas::procedural(16);
        let mut sink = VecSink::new();
        let result =
            run_search(&small_config().with_sprite_limit(0), &target, &atlas, Some(&mut sink))
                .unwrap();
        assert!(result.sequence.is_empty());
        assert_eq!(result.rounds, 0);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.termination, Termination::SpriteLimit);
        let kinds: Vec<_> = sink.as_slice().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![SearchEventKind::RunStarted, SearchEventKind::RunFinished]
        );
    }

    #[test]
    fn commits_one_sprite_over_isolated_shape() {
        let target = square_target();
        let atlas = MaskAtlas::procedural(16);
        let config = small_config().with_round_limit(Some(1));
        let mut runner = SearchRunner::try_new(config, &target, &atlas).unwrap();
        let before = runner.composed().squared_error(&target);
        let result = runner.run();

        assert_eq!(result.sequence.len(), 1);
        assert_eq!(result.rounds, 1);
        assert_eq!(result.iterations, 50);
        assert_eq!(result.termination, Termination::SpriteLimit);
        assert_eq!(runner.state(), RoundState::Done);

        let square = BoundingBox {
            min: glam::Vec2::splat(0.25),
            max: glam::Vec2::splat(0.75),
        };
        let sprite = result.sequence.as_slice()[0];
        assert!(sprite.hypothesis.bounding_box(1.0).overlaps(&square));
        assert_eq!(sprite.color.w, 1.0);
        assert!(sprite.hypothesis.atlas_id < atlas.shape_count());
        assert!(runner.composed().squared_error(&target) < before);
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let target = square_target();
        let atlas = MaskAtlas::procedural(16);
        let config = small_config()
            .with_sprite_limit(3)
            .with_iterations_per_round(20)
            .with_round_limit(Some(5));

        let run_sequential = || {
            SearchRunner::try_with_backend(config.clone(), &target, &atlas, SequentialBackend)
                .unwrap()
                .run()
                .sequence
        };
        let first = run_sequential();
        let second = run_sequential();
        assert_eq!(first, second);

        let parallel = SearchRunner::try_new(config.clone(), &target, &atlas)
            .unwrap()
            .run()
            .sequence;
        assert_eq!(first, parallel);
    }

    #[test]
    fn different_seeds_explore_differently() {
        let target = square_target();
        let atlas = MaskAtlas::procedural(16);
        let a = SearchRunner::new(small_config().with_seed(1), &target, &atlas);
        let b = SearchRunner::new(small_config().with_seed(2), &target, &atlas);
        let first_a = *a.grid().slots()[0].best();
        let first_b = *b.grid().slots()[0].best();
        assert_ne!(first_a, first_b);
    }

    #[test]
    fn uniform_black_target_never_commits() {
        let target = black_target();
        let atlas = MaskAtlas::procedural(8);
        let config = small_config()
            .with_iterations_per_round(5)
            .with_round_limit(Some(3));
        let mut sink = VecSink::only([SearchEventKind::RoundStagnated]);
        let result = run_search(&config, &target, &atlas, Some(&mut sink)).unwrap();

        assert!(result.sequence.is_empty());
        assert_eq!(result.rounds, 3);
        assert_eq!(result.stagnant_rounds, 3);
        assert_eq!(result.iterations, 15);
        assert_eq!(result.termination, Termination::RoundLimit);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn stagnant_round_keeps_hypotheses() {
        let target = black_target();
        let atlas = MaskAtlas::procedural(8);
        let config = small_config()
            .with_iterations_per_round(10)
            .with_round_limit(Some(2));
        let mut runner = SearchRunner::try_new(config, &target, &atlas).unwrap();
        let initial: Vec<Hypothesis> = runner.grid().snapshot_best().map(|(h, _)| *h).collect();

        let result = runner.run();
        assert_eq!(result.stagnant_rounds, 2);
        let after: Vec<Hypothesis> = runner.grid().snapshot_best().map(|(h, _)| *h).collect();
        assert_eq!(initial, after);
        assert!(runner.grid().best_scores().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn rerolls_one_percent_every_iteration() {
        let target = black_target();
        let atlas = MaskAtlas::procedural(8);
        let config = small_config()
            .with_grid_size(10)
            .with_iterations_per_round(6)
            .with_round_limit(Some(2));
        let mut sink = VecSink::only([SearchEventKind::IterationFinished]);
        run_search(&config, &target, &atlas, Some(&mut sink)).unwrap();

        assert_eq!(sink.len(), 12);
        for event in sink.as_slice() {
            match event {
                SearchEvent::IterationFinished { rerolled, .. } => assert_eq!(*rerolled, 1),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn at_most_one_commit_per_round() {
        let target = square_target();
        let atlas = MaskAtlas::procedural(16);
        let config = small_config()
            .with_sprite_limit(4)
            .with_iterations_per_round(20)
            .with_round_limit(Some(6));
        let mut sink = VecSink::only([SearchEventKind::SpriteCommitted]);
        let result = run_search(&config, &target, &atlas, Some(&mut sink)).unwrap();

        let mut rounds = Vec::new();
        for (i, event) in sink.as_slice().iter().enumerate() {
            match event {
                SearchEvent::SpriteCommitted {
                    round,
                    index,
                    score,
                    ..
                } => {
                    assert_eq!(*index, i);
                    assert!(*score > 0.0);
                    rounds.push(*round);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(rounds.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(rounds.len(), result.sequence.len());
        assert!(result.sequence.len() <= 4);
        assert_eq!(result.rounds, result.sequence.len() + result.stagnant_rounds);
    }

    #[test]
    fn cancelled_token_stops_before_first_iteration() {
        let target = square_target();
        let atlas = MaskAtlas::procedural(16);
        let token = CancellationToken::new();
        token.cancel();
        let mut runner = SearchRunner::try_new(small_config(), &target, &atlas)
            .unwrap()
            .with_cancellation(token);
        let result = runner.run();
        assert_eq!(result.termination, Termination::Cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.rounds, 0);
        assert!(result.sequence.is_empty());
    }

    #[test]
    fn cancel_from_sink_stops_at_next_iteration() {
        let target = black_target();
        let atlas = MaskAtlas::procedural(8);
        let token = CancellationToken::new();
        let remote = token.clone();
        let mut runner = SearchRunner::try_new(small_config(), &target, &atlas)
            .unwrap()
            .with_cancellation(token);

        let mut sink = FnSink::new(move |event| {
            if let SearchEvent::IterationFinished { iteration: 2, .. } = event {
                remote.cancel();
            }
        });
        let result = runner.run_with_events(&mut sink);
        assert_eq!(result.termination, Termination::Cancelled);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn free_run_with_zero_limit_is_empty() {
        let target = TargetImage::uniform(12, 8, Vec4::new(0.0, 0.0, 0.0, 1.0));
        let atlas = MaskAtlas::procedural(8);
        let sequence = run(&target, &atlas, 4, 0, 3).unwrap();
        assert!(sequence.is_empty());
    }

    #[test]
    fn chosen_sprite_accessors() {
        let sprite = ChosenSprite::new(
            Hypothesis {
                x: 0.4,
                y: 0.6,
                width: -0.2,
                height: 0.3,
                angle: 1.0,
                alpha: 0.9,
                atlas_id: 5,
            },
            Vec4::new(1.0, 0.5, 0.0, 1.0),
        );
        assert_eq!(sprite.position(), Vector2 { x: 0.4, y: 0.6 });
        assert_eq!(sprite.size(), Vector2 { x: -0.2, y: 0.3 });
        assert_eq!(sprite.atlas_id(), 5);
        assert_eq!(sprite.color_rgba8(), [255, 128, 0, 255]);
    }
}

#![forbid(unsafe_code)]
//! sprite_fit: approximate a target raster by committing atlas stamp sprites one at a time.
//!
//! Modules:
//! - canvas: raster buffers, target/composed images, the shape atlas, canvas geometry
//! - search: hypotheses, population grid, mutation, evaluation backends, diversity control,
//!   selection, events, and the round-based runner
//!
//! The usual entry point is [`search::runner::run`] or [`search::runner::SearchRunner`].
pub mod canvas;
pub mod error;
pub mod search;

/// Convenient re-exports for common types. Import with `use sprite_fit::prelude::*;`.
pub mod prelude {
    pub use crate::canvas::atlas::{MaskAtlas, ShapeAtlas, ATLAS_SHAPE_COUNT};
    pub use crate::canvas::geometry::{BoundingBox, CanvasGeometry, PixelRect};
    pub use crate::canvas::raster::RgbaRaster;
    pub use crate::canvas::target::{ComposedImage, TargetImage};
    pub use crate::error::{Error, Result};
    pub use crate::search::cancel::CancellationToken;
    pub use crate::search::diversity::{reroll_count, worst_slots};
    pub use crate::search::evaluator::{
        Candidate, EvaluationBackend, ParallelBackend, Scene, SequentialBackend, SlotEvaluation,
    };
    pub use crate::search::events::{
        EventSink, FnSink, MultiSink, SearchEvent, SearchEventKind, VecSink,
    };
    pub use crate::search::hypothesis::{Hypothesis, SearchSpace};
    pub use crate::search::mutation::MutationKind;
    pub use crate::search::population::{GridSlot, PopulationGrid};
    pub use crate::search::runner::{
        run, run_search, run_search_with_events, ChosenSequence, ChosenSprite, RoundState,
        RunConfig, RunResult, SearchRunner, Termination,
    };
    pub use crate::search::selection::pick_best_slot;
}

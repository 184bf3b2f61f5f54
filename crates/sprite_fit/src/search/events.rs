//! Event types and sinks for observing search runs.
//!
//! This module defines [`SearchEvent`] and a set of sinks to emit, collect, or forward events
//! while executing a search via [`crate::search::runner::SearchRunner`] or
//! [`crate::search::runner::run_with_events`].
use crate::search::runner::{ChosenSprite, RunConfig, RunResult};

/// Describes events emitted during a search.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// Emitted once before the first round.
    RunStarted {
        /// The run configuration used.
        config: RunConfig,
        /// Number of slots in the population grid.
        slot_count: usize,
    },

    /// Emitted when a round begins.
    RoundStarted {
        /// Zero-based round index, counting stagnant rounds.
        round: usize,
        /// Sprites committed so far.
        committed: usize,
    },

    /// Emitted after every mutate/evaluate/update/reroll iteration.
    IterationFinished {
        round: usize,
        iteration: usize,
        /// Slots whose best score improved in this iteration.
        improved: usize,
        /// Slots re-randomized by diversity control.
        rerolled: usize,
    },

    /// Emitted when a round ends without any slot scoring above zero.
    RoundStagnated {
        round: usize,
        /// Highest score found in the round.
        best_score: f32,
    },

    /// Emitted when a round's winner is merged into the composed image.
    SpriteCommitted {
        round: usize,
        /// Position of the sprite in the chosen sequence.
        index: usize,
        /// Grid slot that produced the winner.
        slot: usize,
        sprite: ChosenSprite,
        score: f32,
    },

    /// Emitted when a cancellation token stopped the run.
    Cancelled { round: usize, iteration: usize },

    /// Emitted when the run finishes, for any reason.
    RunFinished {
        /// Final result, including the chosen sequence.
        result: RunResult,
    },
}

impl SearchEvent {
    pub fn kind(&self) -> SearchEventKind {
        match self {
            SearchEvent::RunStarted { .. } => SearchEventKind::RunStarted,
            SearchEvent::RoundStarted { .. } => SearchEventKind::RoundStarted,
            SearchEvent::IterationFinished { .. } => SearchEventKind::IterationFinished,
            SearchEvent::RoundStagnated { .. } => SearchEventKind::RoundStagnated,
            SearchEvent::SpriteCommitted { .. } => SearchEventKind::SpriteCommitted,
            SearchEvent::Cancelled { .. } => SearchEventKind::Cancelled,
            SearchEvent::RunFinished { .. } => SearchEventKind::RunFinished,
        }
    }
}

/// Discriminant of [`SearchEvent`], used by sinks to opt out of event construction.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEventKind {
    RunStarted,
    RoundStarted,
    IterationFinished,
    RoundStagnated,
    SpriteCommitted,
    Cancelled,
    RunFinished,
}

/// A generic event sink that accepts [`SearchEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: SearchEvent);

    /// Whether events of `kind` should be built and sent at all.
    ///
    /// The runner checks this before constructing an event, so a sink that only cares about
    /// commits skips the per-iteration allocations.
    #[inline]
    fn wants(&self, _kind: SearchEventKind) -> bool {
        true
    }

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = SearchEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: SearchEvent) {}

    #[inline]
    fn wants(&self, _kind: SearchEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(SearchEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(SearchEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(SearchEvent),
{
    #[inline]
    fn send(&mut self, event: SearchEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects events in a `Vec`, optionally restricted to some kinds.
#[derive(Default)]
pub struct VecSink {
    events: Vec<SearchEvent>,
    only: Option<Vec<SearchEventKind>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
            only: None,
        }
    }

    /// Collects only events whose kind is listed.
    pub fn only(kinds: impl IntoIterator<Item = SearchEventKind>) -> Self {
        Self {
            events: Vec::new(),
            only: Some(kinds.into_iter().collect()),
        }
    }

    pub fn into_inner(self) -> Vec<SearchEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[SearchEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: SearchEvent) {
        if self.wants(event.kind()) {
            self.events.push(event);
        }
    }

    #[inline]
    fn wants(&self, kind: SearchEventKind) -> bool {
        self.only.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn into_inner(self) -> Vec<S> {
        self.sinks
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: SearchEvent) {
        let kind = event.kind();
        let mut targets: Vec<usize> = (0..self.sinks.len())
            .filter(|&i| self.sinks[i].wants(kind))
            .collect();
        let Some(last) = targets.pop() else {
            return;
        };
        for i in targets {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last].send(event);
    }

    fn wants(&self, kind: SearchEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}

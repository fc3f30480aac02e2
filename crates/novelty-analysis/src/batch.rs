//! Corpus-wide runs over a worker pool
//!
//! Positions are independent, so they are pulled from the [`PositionSource`]
//! and dispatched to a rayon pool one at a time. Each worker computes a whole
//! position (statistics, significance, gate) before taking the next one.
//! Per-worker tallies are merged with an order-independent reduction, and the
//! final ranking is done once, so completion order never affects the result.
//!
//! A position that fails (missing record, failed sanity check, unreadable
//! source entry) is logged and counted, and the run continues. The returned
//! [`RunReport`] always says how many positions failed and whether the run
//! covered the whole source.

use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering},
};

use novelty_corpus::{PositionHistory, PositionSource, PositionSourceError, RecordStore};
use novelty_stats::log_factorial::LogFactorialTable;
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::NoveltyAggregator,
    candidate::{self, CandidateFilter, NoveltyCandidate},
    config::{ConfigError, NoveltyConfig},
    significance::SignificanceEvaluator,
};

/// A position that produced no result, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPosition {
    /// Position id, or the source location if the position could not be read
    pub position: String,
    pub error: String,
}

/// Outcome of a corpus run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub positions_seen: usize,
    pub positions_analyzed: usize,
    /// Positions with fewer than two distinct moves
    pub positions_skipped: usize,
    pub positions_failed: usize,
    /// `false` when `max_positions` stopped the run before the source was exhausted
    pub complete: bool,
    pub candidates: Vec<NoveltyCandidate>,
    pub failures: Vec<FailedPosition>,
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum RunError {
    #[display("invalid configuration")]
    Config(ConfigError),
    #[display("failed to start worker pool")]
    ThreadPool(ThreadPoolBuildError),
}

enum Outcome {
    Analyzed(Vec<NoveltyCandidate>),
    Skipped,
    Failed(FailedPosition),
}

#[derive(Debug, Default)]
struct Tally {
    seen: usize,
    analyzed: usize,
    skipped: usize,
    failures: Vec<FailedPosition>,
    candidates: NoveltyAggregator,
}

impl Tally {
    fn record(mut self, outcome: Outcome) -> Self {
        self.seen += 1;
        match outcome {
            Outcome::Analyzed(candidates) => {
                self.analyzed += 1;
                self.candidates.extend(candidates);
            }
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed(failure) => self.failures.push(failure),
        }
        self
    }

    fn merge(mut self, other: Self) -> Self {
        self.seen += other.seen;
        self.analyzed += other.analyzed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
        self.candidates = self.candidates.merge(other.candidates);
        self
    }
}

struct Worker<'a, S: ?Sized> {
    store: &'a S,
    evaluator: SignificanceEvaluator<'a>,
    filter: CandidateFilter,
    progress_every: usize,
    seen: AtomicUsize,
}

impl<S> Worker<'_, S>
where
    S: RecordStore + ?Sized,
{
    fn process(&self, item: Result<PositionHistory, PositionSourceError>) -> Outcome {
        let outcome = match item {
            Ok(history) => self.analyze(&history),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read position");
                Outcome::Failed(FailedPosition {
                    position: source_location(&e).to_owned(),
                    error: e.to_string(),
                })
            }
        };

        let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        if self.progress_every > 0 && seen % self.progress_every == 0 {
            tracing::info!(positions = seen, "progress");
        }
        outcome
    }

    fn analyze(&self, history: &PositionHistory) -> Outcome {
        if history.distinct_moves() < 2 {
            tracing::trace!(position = %history.id, "skipped position with a single move");
            return Outcome::Skipped;
        }
        match candidate::find_novelties(history, self.store, &self.evaluator, &self.filter) {
            Ok(candidates) => {
                tracing::debug!(
                    position = %history.id,
                    moves = history.distinct_moves(),
                    candidates = candidates.len(),
                    "analyzed position"
                );
                Outcome::Analyzed(candidates)
            }
            Err(e) => {
                tracing::warn!(position = %history.id, error = %e, "position analysis failed");
                Outcome::Failed(FailedPosition {
                    position: history.id.to_string(),
                    error: error_chain(&e),
                })
            }
        }
    }
}

fn source_location(error: &PositionSourceError) -> &str {
    match error {
        PositionSourceError::Read { location, .. } | PositionSourceError::Parse { location, .. } => {
            location
        }
    }
}

/// Renders an error with all of its sources, `outer: inner: ...`.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Finds every novelty in `source`.
///
/// `factorials` is shared by all workers; passing a table that is already
/// extended saves work across runs.
///
/// # Errors
///
/// Returns [`RunError`] if the configuration is invalid or the worker pool
/// cannot be started. Failures of individual positions are not errors; they
/// are reported in [`RunReport::failures`].
pub fn run<P, S>(
    config: &NoveltyConfig,
    source: &P,
    store: &S,
    factorials: &LogFactorialTable,
) -> Result<RunReport, RunError>
where
    P: PositionSource + ?Sized,
    S: RecordStore + ?Sized,
{
    config.validate()?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("novelty-worker-{i}"))
        .build()?;

    let worker = Worker {
        store,
        evaluator: SignificanceEvaluator::new(factorials, config.strategy),
        filter: CandidateFilter::from_config(config),
        progress_every: config.progress_every,
        seen: AtomicUsize::new(0),
    };
    let limit = config.max_positions.map_or(usize::MAX, NonZeroUsize::get);

    tracing::info!(
        workers = pool.current_num_threads(),
        strategy = %config.strategy,
        significance = config.significance,
        min_samples = config.min_samples,
        "starting novelty run"
    );

    let mut positions = source.positions();
    let tally = pool.install(|| {
        positions
            .by_ref()
            .take(limit)
            .par_bridge()
            .map(|item| worker.process(item))
            .fold(Tally::default, Tally::record)
            .reduce(Tally::default, Tally::merge)
    });
    let complete = config.max_positions.is_none() || positions.next().is_none();

    let Tally {
        seen,
        analyzed,
        skipped,
        mut failures,
        candidates,
    } = tally;
    failures.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.error.cmp(&b.error)));
    let candidates = candidates.into_ranked(config.rank_by);

    tracing::info!(
        positions = seen,
        analyzed,
        skipped,
        failed = failures.len(),
        candidates = candidates.len(),
        complete,
        "novelty run finished"
    );
    if !complete {
        tracing::warn!(limit, "run stopped at max_positions; results are partial");
    }

    Ok(RunReport {
        positions_seen: seen,
        positions_analyzed: analyzed,
        positions_skipped: skipped,
        positions_failed: failures.len(),
        complete,
        candidates,
        failures,
    })
}

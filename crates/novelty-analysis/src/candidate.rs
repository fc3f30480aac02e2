//! Novelty candidates: moves whose first appearance passes the sample gate and
//! the significance threshold

use novelty_corpus::{PositionHistory, RecordStore, Side};
use serde::{Deserialize, Serialize};

use crate::{
    config::NoveltyConfig,
    move_stats::{self, DataIntegrityError, MoveStatistic},
    significance::{SignificanceError, SignificanceEvaluator, SignificanceResult},
};

/// A move reported as a novelty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoveltyCandidate {
    #[serde(flatten)]
    pub statistic: MoveStatistic,
    pub significance: SignificanceResult,
    /// Participant who played the move in its first record, if the position
    /// tells whose turn it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mover: Option<String>,
}

/// Minimum-sample gate and significance threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFilter {
    pub min_samples: usize,
    /// Natural log of the significance threshold
    pub log_threshold: f64,
}

impl CandidateFilter {
    #[must_use]
    pub fn from_config(config: &NoveltyConfig) -> Self {
        Self {
            min_samples: config.min_samples,
            log_threshold: config.log_threshold(),
        }
    }

    /// Whether a move has enough occurrences on both sides of its first
    /// appearance to be tested at all.
    #[must_use]
    pub fn has_enough_samples(&self, stat: &MoveStatistic) -> bool {
        stat.total >= self.min_samples
            && stat.strictly_before >= self.min_samples
            && stat.strictly_after >= self.min_samples
    }

    #[must_use]
    pub fn is_significant(&self, result: &SignificanceResult) -> bool {
        result.passes(self.log_threshold)
    }
}

/// Why a position produced no result.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PositionFailure {
    #[display("data integrity violation")]
    DataIntegrity(DataIntegrityError),
    #[display("significance computation failed")]
    Significance(SignificanceError),
}

/// Analyzes one position and returns its novelty candidates.
///
/// Moves failing the sample gate are not scored. The result keeps the order
/// of first appearance.
///
/// # Errors
///
/// Returns [`PositionFailure`] if the position's statistics cannot be
/// computed or a significance computation leaves its domain; no partial
/// result is produced.
pub fn find_novelties<S>(
    history: &PositionHistory,
    store: &S,
    evaluator: &SignificanceEvaluator<'_>,
    filter: &CandidateFilter,
) -> Result<Vec<NoveltyCandidate>, PositionFailure>
where
    S: RecordStore + ?Sized,
{
    let side = history.side_to_move();
    let mut candidates = vec![];
    for statistic in move_stats::analyze_position(history, store)? {
        if !filter.has_enough_samples(&statistic) {
            continue;
        }
        let significance = evaluator.evaluate(&statistic)?;
        if !filter.is_significant(&significance) {
            continue;
        }
        let mover = side.map(|side| match side {
            Side::White => statistic.white.clone(),
            Side::Black => statistic.black.clone(),
        });
        candidates.push(NoveltyCandidate {
            statistic,
            significance,
            mover,
        });
    }
    Ok(candidates)
}

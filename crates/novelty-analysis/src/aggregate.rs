//! Merging candidates from many positions into one ranked list

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{candidate::NoveltyCandidate, config::ConfigError};

/// Ordering of the final candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankBy {
    /// Most significant first
    #[default]
    Significance,
    /// Grouped by mover, most significant first within a mover; candidates
    /// without a known mover come last
    Participant,
}

impl RankBy {
    pub const ALL: [Self; 2] = [Self::Significance, Self::Participant];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Significance => "significance",
            Self::Participant => "participant",
        }
    }

    /// Total order of two candidates under this ranking.
    ///
    /// Ties are broken by position id and then move label, so the order never
    /// depends on the order candidates were collected in.
    #[must_use]
    pub fn compare(self, a: &NoveltyCandidate, b: &NoveltyCandidate) -> Ordering {
        let by_score = || a.significance.score.total_cmp(&b.significance.score);
        let primary = match self {
            Self::Significance => by_score(),
            Self::Participant => match (&a.mover, &b.mover) {
                (Some(x), Some(y)) => x.cmp(y).then_with(by_score),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => by_score(),
            },
        };
        primary
            .then_with(|| a.statistic.position.cmp(&b.statistic.position))
            .then_with(|| a.statistic.mv.cmp(&b.statistic.mv))
    }
}

impl fmt::Display for RankBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankBy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rank| rank.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownRanking { name: s.to_owned() })
    }
}

/// Collects candidates from any number of positions or workers.
///
/// Merging is append-only; ranking happens once in [`Self::into_ranked`], so
/// any merge order yields the same final list.
#[derive(Debug, Clone, Default)]
pub struct NoveltyAggregator {
    candidates: Vec<NoveltyCandidate>,
}

impl NoveltyAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Combines two partial aggregates.
    #[must_use]
    pub fn merge(mut self, mut other: Self) -> Self {
        self.candidates.append(&mut other.candidates);
        self
    }

    /// Ranks every collected candidate.
    #[must_use]
    pub fn into_ranked(mut self, rank_by: RankBy) -> Vec<NoveltyCandidate> {
        self.candidates.sort_by(|a, b| rank_by.compare(a, b));
        self.candidates
    }
}

impl Extend<NoveltyCandidate> for NoveltyAggregator {
    fn extend<I: IntoIterator<Item = NoveltyCandidate>>(&mut self, iter: I) {
        self.candidates.extend(iter);
    }
}

impl FromIterator<NoveltyCandidate> for NoveltyAggregator {
    fn from_iter<I: IntoIterator<Item = NoveltyCandidate>>(iter: I) -> Self {
        Self {
            candidates: iter.into_iter().collect(),
        }
    }
}

//! Exact significance of a move's late appearance
//!
//! A move that was never played in the `strictly_before` occurrences preceding
//! its first appearance, yet is played `total` times afterwards, is unlikely
//! to have been missed by chance. This module scores that unlikelihood with
//! one-tailed Fisher exact tests and combines the move's own test with one
//! test per competing move.
//!
//! # Tables
//!
//! The move's own table compares the move against all other occurrences,
//! before and after its first-played date:
//!
//! ```text
//!                 before           after
//! this move          0             total
//! other moves     before     after - total
//! ```
//!
//! A competitor's table does the same for the competitor's counts at that
//! date:
//!
//! ```text
//!                    before                 after
//! competitor        c_before               c_after
//! the rest     before - c_before     after - c_after
//! ```
//!
//! Cells that ambiguous-date exclusions would make negative are taken as zero.
//!
//! # Combination
//!
//! With `k = competitors + 1` log-p-values:
//!
//! - [`CombineStrategy::Bonferroni`]: every log-p-value is divided by `k` and
//!   the minimum is the score.
//! - [`CombineStrategy::ChiSquare`]: the statistic `Σ -2 ln p` is referred to
//!   the chi-square survival function with `k` degrees of freedom.
//!
//! Scores are natural logarithms of probabilities; more negative is more
//! significant.

use std::{collections::BTreeMap, fmt, str::FromStr};

use novelty_corpus::MoveLabel;
use novelty_stats::{
    DomainError, chi_square, hypergeometric::ContingencyTable, log_factorial::LogFactorialTable,
};
use serde::{Deserialize, Serialize};

use crate::{config::ConfigError, move_stats::MoveStatistic};

/// How the move's own test and its competitors' tests are combined into one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombineStrategy {
    /// Minimum of the log-p-values, each divided by the number of tests.
    #[default]
    Bonferroni,
    /// Fisher's method: chi-square survival of `Σ -2 ln p`.
    ChiSquare,
}

impl CombineStrategy {
    pub const ALL: [Self; 2] = [Self::Bonferroni, Self::ChiSquare];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bonferroni => "bonferroni",
            Self::ChiSquare => "chi-square",
        }
    }
}

impl fmt::Display for CombineStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CombineStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownStrategy { name: s.to_owned() })
    }
}

/// Significance of one move's first appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    pub strategy: CombineStrategy,
    /// Left-tailed Fisher log-p of the move's own table
    pub own_log_p: f64,
    /// Left-tailed Fisher log-p of each competitor's table
    pub competitor_log_p: BTreeMap<MoveLabel, f64>,
    /// Number of combined tests (competitors + 1)
    pub degrees_of_freedom: usize,
    /// Combined log-probability
    pub score: f64,
}

impl SignificanceResult {
    /// Whether the score is below `log_threshold`.
    #[must_use]
    pub fn passes(&self, log_threshold: f64) -> bool {
        self.score < log_threshold
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SignificanceError {
    #[display("significance of {mv} could not be combined")]
    Domain { mv: MoveLabel, source: DomainError },
}

/// Scores [`MoveStatistic`]s using a shared log-factorial table.
///
/// The evaluator borrows the table, so one table serves every worker of a
/// run and grows only as large as the biggest position requires.
#[derive(Debug, Clone, Copy)]
pub struct SignificanceEvaluator<'a> {
    factorials: &'a LogFactorialTable,
    strategy: CombineStrategy,
}

impl<'a> SignificanceEvaluator<'a> {
    #[must_use]
    pub fn new(factorials: &'a LogFactorialTable, strategy: CombineStrategy) -> Self {
        Self {
            factorials,
            strategy,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> CombineStrategy {
        self.strategy
    }

    /// Left-tailed log-p of the move's own before/after split.
    #[must_use]
    pub fn own_log_p(&self, stat: &MoveStatistic) -> f64 {
        ContingencyTable::new(
            0,
            stat.total,
            stat.strictly_before,
            stat.strictly_after.saturating_sub(stat.total),
        )
        .fisher_left_tail(self.factorials)
    }

    /// Left-tailed log-p of every competitor's split at the move's first-played date.
    #[must_use]
    pub fn competitor_log_p(&self, stat: &MoveStatistic) -> BTreeMap<MoveLabel, f64> {
        stat.competitors
            .iter()
            .map(|(mv, pivot)| {
                let table = ContingencyTable::new(
                    pivot.strictly_before,
                    pivot.strictly_after,
                    stat.strictly_before.saturating_sub(pivot.strictly_before),
                    stat.strictly_after.saturating_sub(pivot.strictly_after),
                );
                (mv.clone(), table.fisher_left_tail(self.factorials))
            })
            .collect()
    }

    /// Scores one move.
    ///
    /// # Errors
    ///
    /// Returns [`SignificanceError`] if the chi-square combination is asked
    /// for an out-of-domain value, which indicates a defect upstream.
    ///
    /// # Examples
    ///
    /// ```
    /// use novelty_analysis::significance::{CombineStrategy, SignificanceEvaluator};
    /// # use novelty_analysis::move_stats::MoveStatistic;
    /// use novelty_stats::log_factorial::LogFactorialTable;
    ///
    /// # let stat: MoveStatistic = serde_json::from_value(serde_json::json!({
    /// #     "position": "p", "move": "Nd5", "total": 12, "first_played": "1998.07.29",
    /// #     "first_record": "g", "white": "?", "black": "?", "strictly_before": 40,
    /// #     "strictly_after": 30, "unordered": 0, "pivots": {}, "competitors": {}
    /// # })).unwrap();
    /// let factorials = LogFactorialTable::new();
    /// let evaluator = SignificanceEvaluator::new(&factorials, CombineStrategy::Bonferroni);
    /// let result = evaluator.evaluate(&stat).unwrap();
    /// assert!(result.passes(0.01_f64.ln()));
    /// ```
    pub fn evaluate(&self, stat: &MoveStatistic) -> Result<SignificanceResult, SignificanceError> {
        let own_log_p = self.own_log_p(stat);
        let competitor_log_p = self.competitor_log_p(stat);
        let degrees_of_freedom = competitor_log_p.len() + 1;
        let log_ps = || std::iter::once(own_log_p).chain(competitor_log_p.values().copied());

        let score = match self.strategy {
            CombineStrategy::Bonferroni => {
                #[expect(clippy::cast_precision_loss)]
                let k = degrees_of_freedom as f64;
                log_ps().map(|log_p| log_p / k).fold(f64::INFINITY, f64::min)
            }
            CombineStrategy::ChiSquare => {
                let statistic = log_ps().map(|log_p| -2.0 * log_p).sum::<f64>();
                chi_square::log_survival(statistic, degrees_of_freedom, self.factorials).map_err(
                    |source| SignificanceError::Domain {
                        mv: stat.mv.clone(),
                        source,
                    },
                )?
            }
        };

        Ok(SignificanceResult {
            strategy: self.strategy,
            own_log_p,
            competitor_log_p,
            degrees_of_freedom,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use novelty_corpus::PartialDate;

    use super::*;
    use crate::move_stats::PivotEntry;

    fn statistic(total: usize, before: usize, after: usize) -> MoveStatistic {
        MoveStatistic {
            position: "p".into(),
            mv: "Nd5".into(),
            total,
            first_played: "1998.07.29".parse().unwrap(),
            first_record: "g".into(),
            white: "?".into(),
            black: "?".into(),
            strictly_before: before,
            strictly_after: after,
            unordered: 0,
            pivots: BTreeMap::new(),
            competitors: BTreeMap::new(),
        }
    }

    fn with_competitor(mut stat: MoveStatistic, mv: &str, before: usize, after: usize) -> MoveStatistic {
        let anchor_date: PartialDate = stat.first_played;
        stat.competitors.insert(
            mv.into(),
            PivotEntry {
                anchor_date,
                strictly_before: before,
                strictly_after: after,
            },
        );
        stat
    }

    #[test]
    fn test_strategy_names_roundtrip() {
        for strategy in CombineStrategy::ALL {
            assert_eq!(strategy.to_string().parse::<CombineStrategy>().unwrap(), strategy);
        }
        assert_eq!("Chi-Square".parse::<CombineStrategy>().unwrap(), CombineStrategy::ChiSquare);
        assert!(matches!(
            "fisher".parse::<CombineStrategy>(),
            Err(ConfigError::UnknownStrategy { .. })
        ));
        let json = serde_json::to_string(&CombineStrategy::ChiSquare).unwrap();
        assert_eq!(json, "\"chi-square\"");
    }

    #[test]
    fn test_own_log_p_closed_form() {
        // With a = 0 only one table is possible: P = C(c+d, c) / C(n, c)
        let factorials = LogFactorialTable::new();
        let evaluator = SignificanceEvaluator::new(&factorials, CombineStrategy::Bonferroni);
        let stat = statistic(3, 4, 6);
        // table (0, 3, 4, 3): P = C(7,4) / C(10,4) = 35 / 210
        let expected = (35.0_f64 / 210.0).ln();
        assert!((evaluator.own_log_p(&stat) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_no_competitors_bonferroni_is_own() {
        let factorials = LogFactorialTable::new();
        let evaluator = SignificanceEvaluator::new(&factorials, CombineStrategy::Bonferroni);
        let result = evaluator.evaluate(&statistic(12, 40, 30)).unwrap();
        assert_eq!(result.degrees_of_freedom, 1);
        assert_eq!(result.score, result.own_log_p);
    }

    #[test]
    fn test_chi_square_single_test_is_monotone() {
        // With one test, χ²(1) survival of -2 ln p is not p itself, but it is monotone in p.
        let factorials = LogFactorialTable::new();
        let evaluator = SignificanceEvaluator::new(&factorials, CombineStrategy::ChiSquare);
        let weak = evaluator.evaluate(&statistic(12, 5, 30)).unwrap();
        let strong = evaluator.evaluate(&statistic(12, 40, 30)).unwrap();
        assert!(strong.score < weak.score);
        assert!(strong.score <= 0.0);
    }

    #[test]
    fn test_bonferroni_takes_scaled_minimum() {
        let factorials = LogFactorialTable::new();
        let evaluator = SignificanceEvaluator::new(&factorials, CombineStrategy::Bonferroni);
        let stat = with_competitor(with_competitor(statistic(12, 40, 30), "d5", 30, 5), "b3", 10, 13);
        let result = evaluator.evaluate(&stat).unwrap();
        assert_eq!(result.degrees_of_freedom, 3);
        assert_eq!(result.competitor_log_p.len(), 2);
        let expected = std::iter::once(result.own_log_p)
            .chain(result.competitor_log_p.values().copied())
            .map(|p| p / 3.0)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(result.score, expected);
    }

    #[test]
    fn test_chi_square_combines_all_tests() {
        let factorials = LogFactorialTable::new();
        let evaluator = SignificanceEvaluator::new(&factorials, CombineStrategy::ChiSquare);
        let stat = with_competitor(statistic(12, 40, 30), "d5", 30, 5);
        let result = evaluator.evaluate(&stat).unwrap();
        let statistic = -2.0 * (result.own_log_p + result.competitor_log_p[&MoveLabel::from("d5")]);
        let expected = chi_square::log_survival(statistic, 2, &factorials).unwrap();
        assert!((result.score - expected).abs() < 1e-12);
        assert!(result.score < 0.0);
    }

    #[test]
    fn test_competitor_surge_is_significant() {
        // d5 played 2 of 40 times before, 25 of 30 after
        let factorials = LogFactorialTable::new();
        let evaluator = SignificanceEvaluator::new(&factorials, CombineStrategy::Bonferroni);
        let stat = with_competitor(statistic(1, 40, 30), "d5", 2, 25);
        let result = evaluator.evaluate(&stat).unwrap();
        assert!(result.competitor_log_p[&MoveLabel::from("d5")] < 0.001_f64.ln());
    }

    #[test]
    fn test_score_non_increasing_in_strictly_before() {
        let factorials = LogFactorialTable::new();
        for strategy in CombineStrategy::ALL {
            let evaluator = SignificanceEvaluator::new(&factorials, strategy);
            let mut previous = 0.0;
            for before in 0..200 {
                let score = evaluator.evaluate(&statistic(15, before, 60)).unwrap().score;
                assert!(score <= previous + 1e-12, "{strategy}: before={before}");
                previous = score;
            }
        }
    }

    #[test]
    fn test_saturates_impossible_cells() {
        let factorials = LogFactorialTable::new();
        let evaluator = SignificanceEvaluator::new(&factorials, CombineStrategy::ChiSquare);
        // after < total can only come from ambiguous-date exclusions
        let stat = with_competitor(statistic(10, 12, 9), "e4", 20, 20);
        let result = evaluator.evaluate(&stat).unwrap();
        assert!(result.score.is_finite());
    }
}

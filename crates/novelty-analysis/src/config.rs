//! Run configuration

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::{aggregate::RankBy, significance::CombineStrategy};

/// Tunable parameters of a novelty run.
///
/// Every field has a default, so a JSON config file only needs the fields it
/// overrides:
///
/// ```json
/// { "significance": 0.001, "strategy": "chi-square", "workers": 8 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoveltyConfig {
    /// Minimum `total`, `strictly_before` and `strictly_after` of a candidate
    pub min_samples: usize,
    /// Probability threshold; a candidate's score must be below its logarithm
    pub significance: f64,
    pub strategy: CombineStrategy,
    pub rank_by: RankBy,
    /// Worker threads; `0` uses one per available CPU
    pub workers: usize,
    /// Stop after this many positions
    pub max_positions: Option<NonZeroUsize>,
    /// Log progress every this many positions; `0` disables progress logging
    pub progress_every: usize,
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            significance: 0.01,
            strategy: CombineStrategy::default(),
            rank_by: RankBy::default(),
            workers: 0,
            max_positions: None,
            progress_every: 1000,
        }
    }
}

impl NoveltyConfig {
    /// Checks that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] unless `0 < significance < 1` and `min_samples > 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(ConfigError::Significance {
                value: self.significance,
            });
        }
        if self.min_samples == 0 {
            return Err(ConfigError::MinSamples);
        }
        Ok(())
    }

    /// Natural log of the significance threshold.
    #[must_use]
    pub fn log_threshold(&self) -> f64 {
        self.significance.ln()
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("significance must be in (0, 1), got {value}")]
    Significance { value: f64 },
    #[display("min_samples must be at least 1")]
    MinSamples,
    #[display("unknown combination strategy `{name}` (expected `bonferroni` or `chi-square`)")]
    UnknownStrategy { name: String },
    #[display("unknown ranking `{name}` (expected `significance` or `participant`)")]
    UnknownRanking { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NoveltyConfig::default();
        assert_eq!(config.min_samples, 10);
        assert!((config.log_threshold() - 0.01_f64.ln()).abs() < 1e-15);
        assert_eq!(config.strategy, CombineStrategy::Bonferroni);
        assert_eq!(config.rank_by, RankBy::Significance);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: NoveltyConfig =
            serde_json::from_str(r#"{ "strategy": "chi-square", "max_positions": 5 }"#).unwrap();
        assert_eq!(config.strategy, CombineStrategy::ChiSquare);
        assert_eq!(config.max_positions, NonZeroUsize::new(5));
        assert_eq!(config.min_samples, 10);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = serde_json::from_str::<NoveltyConfig>(r#"{ "min_sample": 3 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_significance_range() {
        for value in [0.0, -0.5, 1.0, 1.5, f64::NAN] {
            let config = NoveltyConfig {
                significance: value,
                ..NoveltyConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Significance { .. })
            ));
        }
        let config = NoveltyConfig {
            significance: 0.5,
            ..NoveltyConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_min_samples_is_rejected() {
        let config = NoveltyConfig {
            min_samples: 0,
            ..NoveltyConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MinSamples));
    }
}

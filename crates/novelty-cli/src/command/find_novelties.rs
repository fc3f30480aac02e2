use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use novelty_analysis::{
    aggregate::RankBy,
    batch::{self, RunReport},
    config::NoveltyConfig,
    significance::CombineStrategy,
};
use novelty_stats::log_factorial::LogFactorialTable;
use serde::Serialize;

use crate::{
    store::{DirectoryPositionSource, DirectoryRecordStore},
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct FindNoveltiesArg {
    /// Directory of game records (`<id[..2]>/<id[2..]>`)
    games: PathBuf,
    /// Directory of position history files
    positions: PathBuf,
    /// JSON config file; the options below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Minimum number of games for the move, and before and after its first appearance
    #[arg(long)]
    min_samples: Option<usize>,
    /// Significance level
    #[arg(long)]
    significance: Option<f64>,
    /// How the move's own test and its competitors' tests are combined
    #[arg(long, value_name = "bonferroni|chi-square")]
    strategy: Option<CombineStrategy>,
    /// Ordering of the reported candidates
    #[arg(long, value_name = "significance|participant")]
    rank_by: Option<RankBy>,
    /// Number of worker threads (0 = one per CPU)
    #[arg(long)]
    workers: Option<usize>,
    /// Stop after this many positions
    #[arg(long)]
    max_positions: Option<NonZeroUsize>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl FindNoveltiesArg {
    fn load_config(&self) -> anyhow::Result<NoveltyConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file::<NoveltyConfig, _>("config", path)?,
            None => NoveltyConfig::default(),
        };
        if let Some(min_samples) = self.min_samples {
            config.min_samples = min_samples;
        }
        if let Some(significance) = self.significance {
            config.significance = significance;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(rank_by) = self.rank_by {
            config.rank_by = rank_by;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.max_positions.is_some() {
            config.max_positions = self.max_positions;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct NoveltyReport<'a> {
    generated_at: DateTime<Utc>,
    games: &'a PathBuf,
    positions: &'a PathBuf,
    config: &'a NoveltyConfig,
    #[serde(flatten)]
    run: &'a RunReport,
}

pub(crate) fn run(arg: &FindNoveltiesArg) -> anyhow::Result<()> {
    let config = arg.load_config()?;
    util::ensure_dir("games", &arg.games)?;
    util::ensure_dir("positions", &arg.positions)?;

    let store = DirectoryRecordStore::new(&arg.games);
    let source = DirectoryPositionSource::new(&arg.positions);
    let factorials = LogFactorialTable::new();
    let report = batch::run(&config, &source, &store, &factorials)
        .context("Failed to run novelty search")?;

    if report.positions_failed > 0 {
        tracing::warn!(
            failed = report.positions_failed,
            seen = report.positions_seen,
            "some positions could not be analyzed; see `failures` in the report"
        );
    }

    Output::save_json(
        &NoveltyReport {
            generated_at: Utc::now(),
            games: &arg.games,
            positions: &arg.positions,
            config: &config,
            run: &report,
        },
        arg.output.clone(),
    )
}

use std::path::PathBuf;

use anyhow::Context;
use novelty_analysis::{
    move_stats::{self, MoveStatistic},
    significance::{CombineStrategy, SignificanceEvaluator, SignificanceResult},
};
use novelty_stats::log_factorial::LogFactorialTable;
use serde::Serialize;

use crate::{
    store::{self, DirectoryRecordStore},
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PositionStatsArg {
    /// Directory of game records (`<id[..2]>/<id[2..]>`)
    games: PathBuf,
    /// Position history file
    position: PathBuf,
    /// Combination strategy for the reported significance
    #[arg(long, default_value_t = CombineStrategy::Bonferroni)]
    strategy: CombineStrategy,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct MoveReport {
    #[serde(flatten)]
    statistic: MoveStatistic,
    significance: SignificanceResult,
}

pub(crate) fn run(arg: &PositionStatsArg) -> anyhow::Result<()> {
    util::ensure_dir("games", &arg.games)?;
    let store = DirectoryRecordStore::new(&arg.games);
    let id = store::position_id(&arg.position);
    let history = store::read_position_file(&arg.position, id)?;

    let stats = move_stats::analyze_position(&history, &store)
        .with_context(|| format!("Failed to analyze position {}", history.id))?;
    tracing::info!(
        position = %history.id,
        moves = history.distinct_moves(),
        occurrences = history.occurrence_count(),
        "analyzed position"
    );

    let factorials = LogFactorialTable::new();
    let evaluator = SignificanceEvaluator::new(&factorials, arg.strategy);
    let reports = stats
        .into_iter()
        .map(|statistic| {
            let significance = evaluator
                .evaluate(&statistic)
                .with_context(|| format!("Failed to score move {}", statistic.mv))?;
            Ok(MoveReport {
                statistic,
                significance,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Output::save_json(&reports, arg.output.clone())
}

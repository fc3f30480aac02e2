use clap::{Parser, Subcommand};

use self::{find_novelties::FindNoveltiesArg, position_stats::PositionStatsArg};

mod find_novelties;
mod position_stats;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Find novelties in every position of a corpus and write a ranked report
    FindNovelties(#[clap(flatten)] FindNoveltiesArg),
    /// Print the move statistics of a single position
    PositionStats(#[clap(flatten)] PositionStatsArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::FindNovelties(arg) => find_novelties::run(&arg)?,
        Mode::PositionStats(arg) => position_stats::run(&arg)?,
    }
    Ok(())
}

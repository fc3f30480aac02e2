//! Novelty detection over a corpus of recorded games
//!
//! This crate finds moves whose first appearance in a position came later,
//! and was followed more often, than the position's history makes plausible
//! by chance.
//!
//! # Overview
//!
//! One position is processed in three steps:
//!
//! 1. **Move statistics** ([`move_stats::analyze_position`]): For every move,
//!    its first-played date and how the position's other occurrences split
//!    strictly before and strictly after it, together with the competing
//!    moves' splits at that date
//! 2. **Significance** ([`significance::SignificanceEvaluator`]): One-tailed
//!    Fisher exact tests for the move and each competitor, combined by the
//!    chosen [`significance::CombineStrategy`]
//! 3. **Gate** ([`candidate::find_novelties`]): Moves with too few samples or
//!    a score above the threshold are dropped
//!
//! Whole corpora are processed by [`batch::run`], which spreads positions over
//! a worker pool, merges the results with [`aggregate::NoveltyAggregator`], and
//! reports how many positions were analyzed, skipped, or failed.
//!
//! # Example
//!
//! ```
//! use novelty_analysis::{batch, config::NoveltyConfig};
//! use novelty_corpus::{MemoryPositionSource, MemoryRecordStore, PositionHistory, RecordRef};
//! use novelty_stats::log_factorial::LogFactorialTable;
//!
//! let mut store = MemoryRecordStore::new();
//! let mut position = PositionHistory::new("start".into());
//! for year in 1950..2010 {
//!     let id = format!("g{year}");
//!     store.insert(RecordRef {
//!         id: id.as_str().into(),
//!         date: format!("{year}.??.??").parse().unwrap(),
//!         white: "?".into(),
//!         black: "?".into(),
//!     });
//!     // `Nf3` appears in 1980 and takes over
//!     let mv = if year >= 1980 && year % 3 != 0 { "Nf3" } else { "e4" };
//!     position.add_record(mv.into(), id.into());
//! }
//! let source = [position].into_iter().collect::<MemoryPositionSource>();
//!
//! let report = batch::run(
//!     &NoveltyConfig::default(),
//!     &source,
//!     &store,
//!     &LogFactorialTable::new(),
//! )
//! .unwrap();
//! assert!(report.complete);
//! assert_eq!(report.candidates.len(), 1);
//! assert_eq!(report.candidates[0].statistic.mv.as_str(), "Nf3");
//! ```
//!
//! # Modules
//!
//! - [`move_stats`]: Temporal partition statistics per position
//! - [`significance`]: Exact tests and their combination
//! - [`candidate`]: Sample gate and threshold
//! - [`aggregate`]: Order-independent merging and ranking
//! - [`config`]: Run configuration
//! - [`batch`]: Parallel corpus runs

pub mod aggregate;
pub mod batch;
pub mod candidate;
pub mod config;
pub mod move_stats;
pub mod significance;

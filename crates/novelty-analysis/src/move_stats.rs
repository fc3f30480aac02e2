//! Temporal partition statistics for every move played from a position
//!
//! Given one [`PositionHistory`], this module computes for each distinct move
//! when it was first played and how the position's other occurrences split
//! around that date.
//!
//! # Overview
//!
//! All (move, record) occurrences of the position are sorted by date and
//! scanned forward in time. Each move's first occurrence defines an *anchor
//! date*. Relative to its own anchor a move records:
//!
//! - `strictly_before`: occurrences of any move strictly before the anchor
//! - `strictly_after`: occurrences of any move strictly after the anchor
//!
//! Every anchor also becomes a *pivot* for each move already known at that
//! time, counting that move's own occurrences strictly before and strictly
//! after the anchor. Collated the other way round, the pivots at a move's
//! anchor form its competitor table.
//!
//! # Partial Dates
//!
//! Many dates are partial (`1960.??.??`). An occurrence whose date cannot be
//! ordered against an anchor is counted neither before nor after it:
//!
//! ```text
//! anchor 1990.??.??   occurrence 1990.05.05   => excluded from both tallies
//! anchor 1990.??.??   occurrence 1991.01.02   => strictly after
//! ```
//!
//! The computation runs in two passes. The forward pass assigns provisional
//! counts by position in the sorted list. The correction pass then revisits,
//! for each anchor, only the occurrences dated in the anchor's year (the only
//! ones that can be unordered with it) and removes the unordered ones from the
//! provisional tallies.
//!
//! # Sanity Checks
//!
//! Two invariants are verified after the scan and reported as
//! [`DataIntegrityError`] rather than repaired:
//!
//! - every pivot satisfies `strictly_before + strictly_after <= total`
//! - the move totals sum to the number of occurrences

use std::collections::{BTreeMap, HashMap};

use novelty_corpus::{
    MoveLabel, PartialDate, PositionHistory, PositionId, RecordId, RecordRef, RecordStore,
    RecordStoreError,
};
use serde::{Deserialize, Serialize};

/// Counts of one move's occurrences strictly before and strictly after an anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotEntry {
    /// First-played date of the move that defines this pivot
    pub anchor_date: PartialDate,
    pub strictly_before: usize,
    pub strictly_after: usize,
}

/// Statistics for one move played from one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStatistic {
    pub position: PositionId,
    #[serde(rename = "move")]
    pub mv: MoveLabel,
    /// Number of times this move was played from the position
    pub total: usize,
    /// Date of the move's first appearance
    pub first_played: PartialDate,
    /// Record in which the move first appears
    pub first_record: RecordId,
    /// Participants of the first record
    pub white: String,
    pub black: String,
    /// Occurrences of any move strictly before `first_played`
    pub strictly_before: usize,
    /// Occurrences of any move strictly after `first_played`
    pub strictly_after: usize,
    /// Other occurrences whose date cannot be ordered against `first_played`
    pub unordered: usize,
    /// This move's counts at the first-played date of every move that appeared
    /// after it, keyed by that later move
    pub pivots: BTreeMap<MoveLabel, PivotEntry>,
    /// Every move already known when this one first appeared, with its counts
    /// at this move's first-played date
    pub competitors: BTreeMap<MoveLabel, PivotEntry>,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DataIntegrityError {
    #[display("position {position}: record lookup failed")]
    RecordLookup {
        position: PositionId,
        source: RecordStoreError,
    },
    #[display(
        "position {position}: pivot of {mv} at {anchor} counts {strictly_before} before and {strictly_after} after, exceeding its total {total}"
    )]
    PivotExceedsTotal {
        position: PositionId,
        mv: MoveLabel,
        anchor: PartialDate,
        strictly_before: usize,
        strictly_after: usize,
        total: usize,
    },
    #[display("position {position}: date correction drove a count of {mv} below zero")]
    NegativeCount { position: PositionId, mv: MoveLabel },
    #[display("position {position}: move totals sum to {counted}, expected {expected}")]
    TotalMismatch {
        position: PositionId,
        counted: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Occurrence<'a> {
    mv: &'a MoveLabel,
    record: &'a RecordRef,
}

impl Occurrence<'_> {
    fn date(&self) -> &PartialDate {
        &self.record.date
    }
}

#[derive(Debug, Clone, Copy)]
struct PivotCounts {
    /// Index of the anchoring move in the builder list
    anchor: usize,
    strictly_before: usize,
    strictly_after: usize,
}

#[derive(Debug)]
struct MoveBuilder<'a> {
    first: Occurrence<'a>,
    first_index: usize,
    total: usize,
    strictly_before: usize,
    strictly_after: usize,
    unordered: usize,
    pivots: Vec<PivotCounts>,
}

impl MoveBuilder<'_> {
    fn pivot_mut(&mut self, anchor: usize) -> Option<&mut PivotCounts> {
        self.pivots.iter_mut().find(|p| p.anchor == anchor)
    }

    fn pivot(&self, anchor: usize) -> Option<&PivotCounts> {
        self.pivots.iter().find(|p| p.anchor == anchor)
    }
}

/// Computes [`MoveStatistic`]s for every move played from `history`.
///
/// Returns an empty list when fewer than two distinct moves were ever
/// played, since no move can then be a novelty. The result lists moves in
/// order of first appearance.
///
/// # Errors
///
/// Returns [`DataIntegrityError`] if any referenced record cannot be
/// resolved, or if a sanity check fails. No partial result is produced.
///
/// # Examples
///
/// ```
/// use novelty_analysis::move_stats;
/// use novelty_corpus::{MemoryRecordStore, PositionHistory, RecordRef};
///
/// let mut store = MemoryRecordStore::new();
/// let mut position = PositionHistory::new("p".into());
/// for (id, date, mv) in [("g1", "1950.??.??", "e4"), ("g2", "1960.01.01", "d4"), ("g3", "1961.??.??", "e4")] {
///     store.insert(RecordRef {
///         id: id.into(),
///         date: date.parse().unwrap(),
///         white: "?".into(),
///         black: "?".into(),
///     });
///     position.add_record(mv.into(), id.into());
/// }
///
/// let stats = move_stats::analyze_position(&position, &store).unwrap();
/// let d4 = stats.iter().find(|s| s.mv.as_str() == "d4").unwrap();
/// assert_eq!((d4.strictly_before, d4.strictly_after), (1, 1));
/// ```
pub fn analyze_position<S>(
    history: &PositionHistory,
    store: &S,
) -> Result<Vec<MoveStatistic>, DataIntegrityError>
where
    S: RecordStore + ?Sized,
{
    if history.distinct_moves() < 2 {
        return Ok(vec![]);
    }

    let records = resolve_records(history, store)?;
    let mut occurrences = history
        .moves_observed()
        .iter()
        .flat_map(|(mv, ids)| {
            let records = &records;
            ids.iter().map(move |id| Occurrence {
                mv,
                record: &records[id],
            })
        })
        .collect::<Vec<_>>();
    occurrences.sort_by_key(|o| o.date().sort_key());

    let (mut builders, index_of) = forward_pass(&occurrences);
    correct_unordered(&history.id, &occurrences, &mut builders, &index_of)?;
    check_sanity(&history.id, &builders, occurrences.len())?;

    Ok(finish(&history.id, &builders))
}

fn resolve_records<'a, S>(
    history: &'a PositionHistory,
    store: &S,
) -> Result<HashMap<&'a RecordId, RecordRef>, DataIntegrityError>
where
    S: RecordStore + ?Sized,
{
    let mut records = HashMap::new();
    for id in history.moves_observed().values().flatten() {
        if records.contains_key(id) {
            continue;
        }
        let record = store
            .get(id)
            .map_err(|source| DataIntegrityError::RecordLookup {
                position: history.id.clone(),
                source,
            })?;
        records.insert(id, record);
    }
    Ok(records)
}

/// Scans occurrences in date order, assigning provisional counts.
///
/// A move first seen at index `i` gets `i` occurrences before and all the
/// remaining ones after. Each already known move gets a pivot holding its
/// running total as the before count; its later occurrences accumulate into
/// the pivot's after count.
fn forward_pass<'a>(
    occurrences: &[Occurrence<'a>],
) -> (Vec<MoveBuilder<'a>>, HashMap<&'a MoveLabel, usize>) {
    let n = occurrences.len();
    let mut builders: Vec<MoveBuilder<'a>> = vec![];
    let mut index_of = HashMap::new();

    for (i, occurrence) in occurrences.iter().enumerate() {
        let slot = if let Some(&slot) = index_of.get(occurrence.mv) {
            slot
        } else {
            let anchor = builders.len();
            for known in &mut builders {
                known.pivots.push(PivotCounts {
                    anchor,
                    strictly_before: known.total,
                    strictly_after: 0,
                });
            }
            builders.push(MoveBuilder {
                first: *occurrence,
                first_index: i,
                total: 0,
                strictly_before: i,
                strictly_after: n - i - 1,
                unordered: 0,
                pivots: vec![],
            });
            index_of.insert(occurrence.mv, anchor);
            anchor
        };

        let builder = &mut builders[slot];
        builder.total += 1;
        for pivot in &mut builder.pivots {
            pivot.strictly_after += 1;
        }
    }

    (builders, index_of)
}

/// Removes occurrences that cannot be ordered against an anchor from every
/// tally that provisionally counted them.
fn correct_unordered(
    position: &PositionId,
    occurrences: &[Occurrence<'_>],
    builders: &mut [MoveBuilder<'_>],
    index_of: &HashMap<&MoveLabel, usize>,
) -> Result<(), DataIntegrityError> {
    let negative = |mv: &MoveLabel| DataIntegrityError::NegativeCount {
        position: position.clone(),
        mv: mv.clone(),
    };

    for anchor in 0..builders.len() {
        let i = builders[anchor].first_index;
        let date = *occurrences[i].date();
        let mut unordered_before = 0;
        let mut unordered_after = 0;

        let earlier = occurrences[..i]
            .iter()
            .rev()
            .take_while(|o| o.date().year() == date.year());
        for occurrence in earlier {
            if occurrence.date().is_strictly_before(&date) {
                continue;
            }
            unordered_before += 1;
            // Every move seen before index `i` is older than the anchor and has a pivot at it.
            let known = &mut builders[index_of[occurrence.mv]];
            let pivot = known.pivot_mut(anchor).ok_or_else(|| negative(occurrence.mv))?;
            pivot.strictly_before = pivot
                .strictly_before
                .checked_sub(1)
                .ok_or_else(|| negative(occurrence.mv))?;
        }

        let later = occurrences[i + 1..]
            .iter()
            .take_while(|o| o.date().year() == date.year());
        for occurrence in later {
            if occurrence.date().is_strictly_after(&date) {
                continue;
            }
            unordered_after += 1;
            let slot = index_of[occurrence.mv];
            if slot < anchor {
                let known = &mut builders[slot];
                let pivot = known.pivot_mut(anchor).ok_or_else(|| negative(occurrence.mv))?;
                pivot.strictly_after = pivot
                    .strictly_after
                    .checked_sub(1)
                    .ok_or_else(|| negative(occurrence.mv))?;
            }
        }

        let builder = &mut builders[anchor];
        let mv = builder.first.mv;
        builder.strictly_before = builder
            .strictly_before
            .checked_sub(unordered_before)
            .ok_or_else(|| negative(mv))?;
        builder.strictly_after = builder
            .strictly_after
            .checked_sub(unordered_after)
            .ok_or_else(|| negative(mv))?;
        builder.unordered = unordered_before + unordered_after;
    }
    Ok(())
}

fn check_sanity(
    position: &PositionId,
    builders: &[MoveBuilder<'_>],
    expected: usize,
) -> Result<(), DataIntegrityError> {
    for builder in builders {
        for pivot in &builder.pivots {
            if pivot.strictly_before + pivot.strictly_after > builder.total {
                return Err(DataIntegrityError::PivotExceedsTotal {
                    position: position.clone(),
                    mv: builder.first.mv.clone(),
                    anchor: *builders[pivot.anchor].first.date(),
                    strictly_before: pivot.strictly_before,
                    strictly_after: pivot.strictly_after,
                    total: builder.total,
                });
            }
        }
    }

    let counted = builders.iter().map(|b| b.total).sum::<usize>();
    if counted != expected {
        return Err(DataIntegrityError::TotalMismatch {
            position: position.clone(),
            counted,
            expected,
        });
    }
    Ok(())
}

fn finish(position: &PositionId, builders: &[MoveBuilder<'_>]) -> Vec<MoveStatistic> {
    let entry = |pivot: &PivotCounts| PivotEntry {
        anchor_date: *builders[pivot.anchor].first.date(),
        strictly_before: pivot.strictly_before,
        strictly_after: pivot.strictly_after,
    };

    builders
        .iter()
        .enumerate()
        .map(|(slot, builder)| {
            let pivots = builder
                .pivots
                .iter()
                .map(|pivot| (builders[pivot.anchor].first.mv.clone(), entry(pivot)))
                .collect();
            let competitors = builders[..slot]
                .iter()
                .filter_map(|known| Some((known.first.mv.clone(), entry(known.pivot(slot)?))))
                .collect();
            let record = builder.first.record;
            MoveStatistic {
                position: position.clone(),
                mv: builder.first.mv.clone(),
                total: builder.total,
                first_played: record.date,
                first_record: record.id.clone(),
                white: record.white.clone(),
                black: record.black.clone(),
                strictly_before: builder.strictly_before,
                strictly_after: builder.strictly_after,
                unordered: builder.unordered,
                pivots,
                competitors,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use novelty_corpus::MemoryRecordStore;

    use super::*;

    /// Builds a position and store from `(date, move)` pairs, one record each.
    fn fixture(games: &[(&str, &str)]) -> (PositionHistory, MemoryRecordStore) {
        let mut position = PositionHistory::new("pos".into());
        let mut store = MemoryRecordStore::new();
        for (i, (date, mv)) in games.iter().enumerate() {
            let id = RecordId::from(format!("g{i:03}"));
            store.insert(RecordRef {
                id: id.clone(),
                date: date.parse().unwrap(),
                white: format!("white {i}"),
                black: format!("black {i}"),
            });
            position.add_record((*mv).into(), id);
        }
        (position, store)
    }

    fn by_move(stats: &[MoveStatistic], mv: &str) -> MoveStatistic {
        stats.iter().find(|s| s.mv.as_str() == mv).unwrap().clone()
    }

    #[test]
    fn test_single_move_yields_nothing() {
        let (position, store) = fixture(&[("1990.01.01", "e4"), ("1991.01.01", "e4")]);
        assert!(analyze_position(&position, &store).unwrap().is_empty());
    }

    #[test]
    fn test_empty_position_yields_nothing() {
        let position = PositionHistory::new("empty".into());
        let store = MemoryRecordStore::new();
        assert!(analyze_position(&position, &store).unwrap().is_empty());
    }

    #[test]
    fn test_missing_record_fails_whole_position() {
        let (mut position, store) = fixture(&[("1990.01.01", "e4"), ("1991.01.01", "d4")]);
        position.add_record("c4".into(), "nowhere".into());
        let err = analyze_position(&position, &store).unwrap_err();
        assert!(matches!(err, DataIntegrityError::RecordLookup { .. }));
    }

    #[test]
    fn test_fully_ordered_dates() {
        let (position, store) = fixture(&[
            ("1950.01.01", "e4"),
            ("1951.01.01", "e4"),
            ("1960.01.01", "d4"),
            ("1961.01.01", "e4"),
            ("1962.01.01", "d4"),
        ]);
        let stats = analyze_position(&position, &store).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].mv.as_str(), "e4");

        let e4 = by_move(&stats, "e4");
        assert_eq!((e4.total, e4.strictly_before, e4.strictly_after), (3, 0, 4));
        let d4_pivot = e4.pivots[&MoveLabel::from("d4")];
        assert_eq!(d4_pivot.anchor_date.to_string(), "1960.01.01");
        assert_eq!((d4_pivot.strictly_before, d4_pivot.strictly_after), (2, 1));
        assert!(e4.competitors.is_empty());

        let d4 = by_move(&stats, "d4");
        assert_eq!((d4.total, d4.strictly_before, d4.strictly_after), (2, 2, 2));
        assert!(d4.pivots.is_empty());
        assert_eq!(d4.competitors[&MoveLabel::from("e4")], d4_pivot);
        assert_eq!(d4.first_record.as_str(), "g002");
        assert_eq!(d4.white, "white 2");
    }

    #[test]
    fn test_same_year_ambiguity_is_excluded() {
        let (position, store) = fixture(&[
            ("1989.06.01", "e4"),
            ("1990.05.05", "e4"),
            ("1990.??.??", "d4"),
            ("1990.08.01", "e4"),
            ("1991.02.02", "e4"),
        ]);
        let stats = analyze_position(&position, &store).unwrap();
        let d4 = by_move(&stats, "d4");
        // 1990.05.05 and 1990.08.01 cannot be ordered against 1990.??.??
        assert_eq!((d4.strictly_before, d4.strictly_after, d4.unordered), (1, 1, 2));
        let pivot = by_move(&stats, "e4").pivots[&MoveLabel::from("d4")];
        assert_eq!((pivot.strictly_before, pivot.strictly_after), (1, 1));
    }

    #[test]
    fn test_non_adjacent_unordered_occurrence_is_excluded() {
        // Sorted order: 1990.03.?? (e4), 1990.03.02 (e4), 1990.03.05 (d4).
        // 1990.03.?? is unordered with the anchor even though 1990.03.02 sits between them.
        let (position, store) = fixture(&[
            ("1990.03.05", "d4"),
            ("1990.03.02", "e4"),
            ("1990.03.??", "e4"),
            ("1990.04.01", "d4"),
        ]);
        let stats = analyze_position(&position, &store).unwrap();
        let d4 = by_move(&stats, "d4");
        assert_eq!((d4.strictly_before, d4.strictly_after, d4.unordered), (1, 1, 1));
        let pivot = by_move(&stats, "e4").pivots[&MoveLabel::from("d4")];
        assert_eq!((pivot.strictly_before, pivot.strictly_after), (1, 0));
    }

    #[test]
    fn test_later_unordered_occurrence_of_known_move() {
        let (position, store) = fixture(&[
            ("1980.01.01", "e4"),
            ("1990.??.??", "d4"),
            ("1990.02.01", "e4"),
            ("1990.??.??", "e4"),
            ("1995.01.01", "e4"),
        ]);
        let stats = analyze_position(&position, &store).unwrap();
        let d4 = by_move(&stats, "d4");
        assert_eq!((d4.strictly_before, d4.strictly_after, d4.unordered), (1, 1, 2));
        let e4 = by_move(&stats, "e4");
        let pivot = e4.pivots[&MoveLabel::from("d4")];
        assert_eq!((pivot.strictly_before, pivot.strictly_after), (1, 1));
        assert_eq!(e4.total, 4);
    }

    #[test]
    fn test_moves_first_played_on_same_date_keep_separate_pivots() {
        let (position, store) = fixture(&[
            ("1970.01.01", "e4"),
            ("1980.05.05", "d4"),
            ("1980.05.05", "c4"),
            ("1985.01.01", "e4"),
        ]);
        let stats = analyze_position(&position, &store).unwrap();
        let e4 = by_move(&stats, "e4");
        assert_eq!(e4.pivots.len(), 2);
        for pivot in e4.pivots.values() {
            assert_eq!((pivot.strictly_before, pivot.strictly_after), (1, 1));
        }
        let first_of_pair = &stats[1];
        let second_of_pair = &stats[2];
        // the pair cannot be ordered against each other
        assert_eq!(first_of_pair.unordered, 1);
        assert_eq!(second_of_pair.unordered, 1);
        assert_eq!(
            second_of_pair.competitors[&first_of_pair.mv],
            PivotEntry {
                anchor_date: "1980.05.05".parse().unwrap(),
                strictly_before: 0,
                strictly_after: 0,
            }
        );
    }

    #[test]
    fn test_duplicate_record_ids_resolve_once() {
        let (mut position, store) = fixture(&[("1990.01.01", "e4"), ("1991.01.01", "d4")]);
        position.add_record("c4".into(), "g000".into());
        let stats = analyze_position(&position, &store).unwrap();
        assert_eq!(stats.iter().map(|s| s.total).sum::<usize>(), 3);
    }
}

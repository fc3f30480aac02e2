use std::{collections::BTreeMap, io};

use serde::{Deserialize, Serialize};

use crate::RecordId;

/// Canonical identifier of a position (a hash of the board state).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct PositionId(String);

impl PositionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PositionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A move as written in the source records (e.g. `Nf3`).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct MoveLabel(String);

impl MoveLabel {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MoveLabel {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Side to move in a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

/// Every move ever played from one position, with the records it was played in.
///
/// Moves are kept in label order and each move's record ids in insertion
/// order, so iterating a history is deterministic.
///
/// # Serialization
///
/// ```json
/// {
///   "id": "a1b2c3",
///   "fen": "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
///   "moves": {
///     "Bb5": ["35fd9232bf4e4755", "ea19d08de9925418"],
///     "Bc4": ["0d1e7f3a5b2c4d6e"]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHistory {
    pub id: PositionId,
    /// Optional board description; its side-to-move field picks the mover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(default)]
    pub moves: BTreeMap<MoveLabel, Vec<RecordId>>,
}

impl PositionHistory {
    #[must_use]
    pub fn new(id: PositionId) -> Self {
        Self {
            id,
            fen: None,
            moves: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_fen(mut self, fen: impl Into<String>) -> Self {
        self.fen = Some(fen.into());
        self
    }

    /// Records that `mv` was played from this position in `record`.
    pub fn add_record(&mut self, mv: MoveLabel, record: RecordId) {
        self.moves.entry(mv).or_default().push(record);
    }

    /// Mapping from each distinct move to the records it was played in.
    #[must_use]
    pub fn moves_observed(&self) -> &BTreeMap<MoveLabel, Vec<RecordId>> {
        &self.moves
    }

    #[must_use]
    pub fn distinct_moves(&self) -> usize {
        self.moves.len()
    }

    /// Total number of (move, record) observations.
    #[must_use]
    pub fn occurrence_count(&self) -> usize {
        self.moves.values().map(Vec::len).sum()
    }

    /// Side to move, read from the second whitespace-separated field of the FEN.
    #[must_use]
    pub fn side_to_move(&self) -> Option<Side> {
        match self.fen.as_deref()?.split_whitespace().nth(1)? {
            "w" => Some(Side::White),
            "b" => Some(Side::Black),
            _ => None,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PositionSourceError {
    #[display("failed to read position {location}")]
    Read { location: String, source: io::Error },
    #[display("failed to parse position {location}: {reason}")]
    Parse { location: String, reason: String },
}

/// Iterator yielded by a [`PositionSource`].
pub type PositionIter<'a> =
    Box<dyn Iterator<Item = Result<PositionHistory, PositionSourceError>> + Send + 'a>;

/// Something that can enumerate every position of a corpus.
pub trait PositionSource {
    fn positions(&self) -> PositionIter<'_>;
}

/// A [`PositionSource`] over positions held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPositionSource {
    positions: Vec<PositionHistory>,
}

impl MemoryPositionSource {
    #[must_use]
    pub fn new(positions: Vec<PositionHistory>) -> Self {
        Self { positions }
    }

    pub fn push(&mut self, position: PositionHistory) {
        self.positions.push(position);
    }
}

impl FromIterator<PositionHistory> for MemoryPositionSource {
    fn from_iter<I: IntoIterator<Item = PositionHistory>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl PositionSource for MemoryPositionSource {
    fn positions(&self) -> PositionIter<'_> {
        Box::new(self.positions.iter().cloned().map(Ok))
    }
}

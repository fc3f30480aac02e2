use std::{collections::HashMap, io};

use serde::{Deserialize, Serialize};

use crate::{PartialDate, Side};

/// Content-addressed identifier of a recorded game.
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
pub struct RecordId(String);

impl RecordId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Label used for a participant whose name is not recorded.
pub const UNKNOWN_PARTICIPANT: &str = "?";

/// Metadata of one recorded game, resolved from a [`RecordStore`].
///
/// Built at the store boundary from a flat key/value record; the keys `Date`,
/// `White` and `Black` are interpreted, everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: RecordId,
    pub date: PartialDate,
    pub white: String,
    pub black: String,
}

impl RecordRef {
    /// Validates flat record metadata into a [`RecordRef`].
    ///
    /// A missing participant becomes [`UNKNOWN_PARTICIPANT`]; a missing or
    /// malformed `Date` is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Invalid`] when the date is absent or unparseable.
    pub fn from_metadata(
        id: RecordId,
        metadata: &HashMap<String, String>,
    ) -> Result<Self, RecordStoreError> {
        let Some(raw_date) = metadata.get("Date") else {
            return Err(RecordStoreError::Invalid {
                id,
                reason: "missing Date field".to_owned(),
            });
        };
        let date = match raw_date.parse::<PartialDate>() {
            Ok(date) => date,
            Err(e) => {
                return Err(RecordStoreError::Invalid {
                    id,
                    reason: e.to_string(),
                });
            }
        };
        let participant = |key: &str| {
            metadata
                .get(key)
                .map_or(UNKNOWN_PARTICIPANT, |s| s.trim_matches('"'))
                .to_owned()
        };
        Ok(Self {
            white: participant("White"),
            black: participant("Black"),
            id,
            date,
        })
    }

    /// The participant playing `side`.
    #[must_use]
    pub fn participant(&self, side: Side) -> &str {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RecordStoreError {
    #[display("record {id} not found")]
    NotFound { id: RecordId },
    #[display("record {id} is invalid: {reason}")]
    Invalid { id: RecordId, reason: String },
    #[display("failed to read record {id}")]
    Io { id: RecordId, source: io::Error },
}

/// Lookup from record id to record metadata.
///
/// Stores are shared by every worker of a run, hence `Sync`.
pub trait RecordStore: Sync {
    /// Resolves one record.
    ///
    /// # Errors
    ///
    /// Fails with [`RecordStoreError::NotFound`] when the id is unknown.
    fn get(&self, id: &RecordId) -> Result<RecordRef, RecordStoreError>;
}

impl<T> RecordStore for &T
where
    T: RecordStore + ?Sized,
{
    fn get(&self, id: &RecordId) -> Result<RecordRef, RecordStoreError> {
        (**self).get(id)
    }
}

/// A [`RecordStore`] held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: HashMap<RecordId, RecordRef>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a record, keyed by its id.
    pub fn insert(&mut self, record: RecordRef) {
        self.records.insert(record.id.clone(), record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<RecordRef> for MemoryRecordStore {
    fn from_iter<I: IntoIterator<Item = RecordRef>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, id: &RecordId) -> Result<RecordRef, RecordStoreError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| RecordStoreError::NotFound { id: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_from_metadata() {
        let record = RecordRef::from_metadata(
            "35fd9232bf4e4755".into(),
            &metadata(&[
                ("Event", "FIDE (27) 1967-1969"),
                ("Date", "1968.??.??"),
                ("White", "Korchnoi, Viktor"),
                ("Black", "Tal, Mikhail"),
            ]),
        )
        .unwrap();
        assert_eq!(record.date.to_string(), "1968.??.??");
        assert_eq!(record.participant(Side::White), "Korchnoi, Viktor");
        assert_eq!(record.participant(Side::Black), "Tal, Mikhail");
    }

    #[test]
    fn test_missing_participants_are_unknown() {
        let record =
            RecordRef::from_metadata("a".into(), &metadata(&[("Date", "2000.01.01")])).unwrap();
        assert_eq!(record.white, UNKNOWN_PARTICIPANT);
        assert_eq!(record.black, UNKNOWN_PARTICIPANT);
    }

    #[test]
    fn test_invalid_dates_are_rejected() {
        let missing = RecordRef::from_metadata("a".into(), &metadata(&[("White", "x")]));
        assert!(matches!(missing, Err(RecordStoreError::Invalid { .. })));
        let garbled = RecordRef::from_metadata("b".into(), &metadata(&[("Date", "soon")]));
        assert!(matches!(garbled, Err(RecordStoreError::Invalid { .. })));
    }

    #[test]
    fn test_memory_store_lookup() {
        let record =
            RecordRef::from_metadata("g1".into(), &metadata(&[("Date", "1990.??.??")])).unwrap();
        let store = [record.clone()].into_iter().collect::<MemoryRecordStore>();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&"g1".into()).unwrap(), record);
        assert!(matches!(
            store.get(&"g2".into()),
            Err(RecordStoreError::NotFound { .. })
        ));
    }
}

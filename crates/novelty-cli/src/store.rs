//! File-backed record store and position source
//!
//! Records live in a content-addressed tree, one JSON object of string
//! metadata per file:
//!
//! ```text
//! games/
//!   35/
//!     fd9232bf4e4755    {"Date": "1968.??.??", "White": "Korchnoi, Viktor", ...}
//! ```
//!
//! Positions are JSON files anywhere below the positions directory. A
//! position's id is the name of the file's parent directory followed by the
//! file name, so `positions/a1/b2c3` is position `a1b2c3`.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

use novelty_corpus::{
    MoveLabel, PositionHistory, PositionId, PositionIter, PositionSource, PositionSourceError,
    RecordId, RecordRef, RecordStore, RecordStoreError,
};
use serde::Deserialize;
use walkdir::WalkDir;

/// Length of the directory prefix of a record id.
const PREFIX_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct DirectoryRecordStore {
    root: PathBuf,
}

impl DirectoryRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, id: &RecordId) -> Option<PathBuf> {
        let id = id.as_str();
        if id.len() <= PREFIX_LEN || !id.is_char_boundary(PREFIX_LEN) || id.contains(['/', '\\']) {
            return None;
        }
        let (prefix, rest) = id.split_at(PREFIX_LEN);
        Some(self.root.join(prefix).join(rest))
    }
}

impl RecordStore for DirectoryRecordStore {
    fn get(&self, id: &RecordId) -> Result<RecordRef, RecordStoreError> {
        let not_found = || RecordStoreError::NotFound { id: id.clone() };
        let path = self.record_path(id).ok_or_else(not_found)?;
        let data = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => not_found(),
            _ => RecordStoreError::Io {
                id: id.clone(),
                source,
            },
        })?;
        let metadata = serde_json::from_str::<HashMap<String, String>>(&data).map_err(|e| {
            RecordStoreError::Invalid {
                id: id.clone(),
                reason: e.to_string(),
            }
        })?;
        RecordRef::from_metadata(id.clone(), &metadata)
    }
}

/// On-disk shape of a position file.
#[derive(Debug, Deserialize)]
struct PositionFile {
    #[serde(default)]
    fen: Option<String>,
    moves: BTreeMap<MoveLabel, Vec<RecordId>>,
}

/// Reads one position file.
pub fn read_position_file(
    path: &Path,
    id: PositionId,
) -> Result<PositionHistory, PositionSourceError> {
    let location = || path.display().to_string();
    let data = fs::read_to_string(path).map_err(|source| PositionSourceError::Read {
        location: location(),
        source,
    })?;
    let file = serde_json::from_str::<PositionFile>(&data).map_err(|e| {
        PositionSourceError::Parse {
            location: location(),
            reason: e.to_string(),
        }
    })?;
    Ok(PositionHistory {
        id,
        fen: file.fen,
        moves: file.moves,
    })
}

/// Position id of a file: its parent directory name followed by its file name.
pub fn position_id(path: &Path) -> PositionId {
    let name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());
    let parent = path.parent().and_then(name).unwrap_or_default();
    let file = name(path).unwrap_or_default();
    format!("{parent}{file}").into()
}

/// Every position file below a directory, in file name order.
#[derive(Debug, Clone)]
pub struct DirectoryPositionSource {
    root: PathBuf,
}

impl DirectoryPositionSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PositionSource for DirectoryPositionSource {
    fn positions(&self) -> PositionIter<'_> {
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        Box::new(walker.filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => {
                Some(read_position_file(entry.path(), position_id(entry.path())))
            }
            Ok(_) => None,
            Err(e) => Some(Err(PositionSourceError::Read {
                location: e
                    .path()
                    .map_or_else(|| self.root.display().to_string(), |p| p.display().to_string()),
                source: e.into(),
            })),
        }))
    }
}

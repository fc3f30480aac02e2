//! Corpus data model at the boundary of the novelty engine.
//!
//! The engine does not parse game transcripts or replay moves; it consumes two
//! collaborators:
//!
//! - a [`RecordStore`] resolving record ids to [`RecordRef`] metadata
//!   (date and participants), and
//! - a [`PositionSource`] enumerating [`PositionHistory`] values, each mapping
//!   the moves played from one position to the records they were played in.
//!
//! Dates in historical corpora are often only partially known, so they are
//! represented by [`PartialDate`], whose comparison may be [`Chronology::Ambiguous`].

pub use self::{date::*, position::*, record::*};

pub(crate) mod date;
pub(crate) mod position;
pub(crate) mod record;

//! Domain-level error taxonomy.

use super::bottle::BottleId;
use super::note::NoteId;
use chrono::NaiveDate;
use thiserror::Error;

/// Structural invariant violation on a bottle or note.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bottle id must not be nil")]
    NilBottleId,
    #[error("note id must not be nil")]
    NilNoteId,
    #[error("bottle {0} has no end date")]
    MissingEndDate(BottleId),
    #[error("end_date ({end}) must be >= start_date ({start})")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("note {0} content must not be blank")]
    BlankNoteContent(NoteId),
    #[error("note {0} sequence_index must be >= 1")]
    ZeroSequenceIndex(NoteId),
    #[error("note {note} belongs to bottle {owner}, not {bottle}")]
    ForeignNote {
        note: NoteId,
        owner: BottleId,
        bottle: BottleId,
    },
    #[error("note sequence is not contiguous: expected index {expected}, found {found}")]
    SequenceGap { expected: u32, found: u32 },
}

/// A state transition that is not allowed in the bottle's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidOperationError {
    #[error("bottle {0} is already opened")]
    BottleAlreadyOpened(BottleId),
    #[error("bottle {0} is still in progress; open or delete it first")]
    ActiveBottleExists(BottleId),
    #[error("there is no bottle in progress")]
    NoActiveBottle,
    #[error("start/end dates of bottle {0} cannot change after creation")]
    DatesImmutable(BottleId),
    #[error("opened bottle {0} cannot be closed again")]
    CannotReopen(BottleId),
    #[error("bottle {0} changed in storage since it was loaded; reload and retry")]
    StaleBottle(BottleId),
}

/// Failure of an in-memory domain transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperationError),
}

//! Bottle domain model.
//!
//! # Responsibility
//! - Define the savings period record and the notes it owns.
//! - Provide the deposit/open state transitions.
//!
//! # Invariants
//! - `id` is stable and never reused for another bottle.
//! - `end_date` is present and not earlier than `start_date`.
//! - `notes` are in deposit order with `sequence_index` 1, 2, 3, ...
//! - `is_opened` only ever moves from `false` to `true`.

use super::error::{DomainError, InvalidOperationError, ValidationError};
use super::note::{Note, NoteDraft};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a bottle.
pub type BottleId = Uuid;

/// One savings period: notes are deposited until the bottle is opened.
///
/// `end_date` is optional at the type level so that records coming from
/// outside the core (hand-built or legacy rows) can express a missing value;
/// `validate()` rejects it, so stored and deserialized bottles always carry
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BottleWire")]
pub struct Bottle {
    pub id: BottleId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Deposit order; index `i` holds the note with `sequence_index == i + 1`.
    pub notes: Vec<Note>,
    pub is_opened: bool,
}

#[derive(Deserialize)]
struct BottleWire {
    id: BottleId,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    is_opened: bool,
}

impl TryFrom<BottleWire> for Bottle {
    type Error = ValidationError;

    fn try_from(wire: BottleWire) -> Result<Self, Self::Error> {
        let bottle = Self {
            id: wire.id,
            start_date: wire.start_date,
            end_date: wire.end_date,
            notes: wire.notes,
            is_opened: wire.is_opened,
        };
        bottle.validate()?;
        Ok(bottle)
    }
}

impl Bottle {
    /// Creates an empty, unopened bottle with a generated id.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, ValidationError> {
        Self::with_id(Uuid::new_v4(), start_date, end_date)
    }

    /// Creates an empty, unopened bottle with a caller-provided id.
    ///
    /// Used by storage read-back where identity already exists.
    pub fn with_id(
        id: BottleId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let bottle = Self {
            id,
            start_date,
            end_date: Some(end_date),
            notes: Vec::new(),
            is_opened: false,
        };
        bottle.validate()?;
        Ok(bottle)
    }

    /// Checks all structural invariants, including owned notes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilBottleId);
        }
        let end = self.end_date.ok_or(ValidationError::MissingEndDate(self.id))?;
        if end < self.start_date {
            return Err(ValidationError::EndBeforeStart {
                start: self.start_date,
                end,
            });
        }

        for (position, note) in self.notes.iter().enumerate() {
            note.validate()?;
            if note.bottle_id != self.id {
                return Err(ValidationError::ForeignNote {
                    note: note.id,
                    owner: note.bottle_id,
                    bottle: self.id,
                });
            }
            let expected = next_sequence_index(position);
            if note.sequence_index != expected {
                return Err(ValidationError::SequenceGap {
                    expected,
                    found: note.sequence_index,
                });
            }
        }
        Ok(())
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Position the next deposited note will receive.
    pub fn next_sequence_index(&self) -> u32 {
        next_sequence_index(self.notes.len())
    }

    /// Appends a note at `note_count + 1`.
    ///
    /// # Errors
    /// - `InvalidOperationError::BottleAlreadyOpened` when opened; `notes` is
    ///   left untouched.
    /// - `ValidationError` when the draft content is blank.
    pub fn deposit(&mut self, draft: NoteDraft) -> Result<&Note, DomainError> {
        if self.is_opened {
            return Err(InvalidOperationError::BottleAlreadyOpened(self.id).into());
        }
        let note = Note::new(self.id, self.next_sequence_index(), draft)?;
        self.notes.push(note);
        Ok(&self.notes[self.notes.len() - 1])
    }

    /// Marks the bottle opened. Opening before `end_date` is allowed.
    pub fn open(&mut self) -> Result<(), InvalidOperationError> {
        if self.is_opened {
            return Err(InvalidOperationError::BottleAlreadyOpened(self.id));
        }
        self.is_opened = true;
        Ok(())
    }
}

fn next_sequence_index(count: usize) -> u32 {
    u32::try_from(count).map_or(u32::MAX, |count| count.saturating_add(1))
}

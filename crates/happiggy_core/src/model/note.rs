//! Note domain model.
//!
//! # Responsibility
//! - Define one deposited item and its payload shape.
//!
//! # Invariants
//! - `content` is immutable and never blank.
//! - `sequence_index` is 1-based and assigned once, at deposit time.

use super::bottle::BottleId;
use super::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a deposited note.
pub type NoteId = Uuid;

/// Payload of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NoteContent {
    /// Free-form text written by the user.
    Text(String),
    /// Reference (path or asset key) to a stored photo.
    Image(String),
}

impl NoteContent {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn image(reference: impl Into<String>) -> Self {
        Self::Image(reference.into())
    }

    /// Storage label for the payload kind (`text|image`).
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }

    /// Raw payload string regardless of kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(value) | Self::Image(value) => value.as_str(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    /// Rebuilds content from its storage label and payload.
    pub fn from_parts(kind: &str, value: String) -> Option<Self> {
        match kind {
            "text" => Some(Self::Text(value)),
            "image" => Some(Self::Image(value)),
            _ => None,
        }
    }
}

/// Input for depositing a note; identity and position are assigned by the
/// owner at deposit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub content: NoteContent,
    pub created_at: DateTime<Utc>,
}

impl NoteDraft {
    pub fn new(content: NoteContent, created_at: DateTime<Utc>) -> Self {
        Self {
            content,
            created_at,
        }
    }
}

/// One item deposited into a bottle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// Owning bottle; lookup only.
    pub bottle_id: BottleId,
    pub created_at: DateTime<Utc>,
    pub content: NoteContent,
    /// 1-based position in deposit order.
    pub sequence_index: u32,
}

impl Note {
    /// Creates a note with a generated id at the given position.
    pub fn new(
        bottle_id: BottleId,
        sequence_index: u32,
        draft: NoteDraft,
    ) -> Result<Self, ValidationError> {
        let note = Self {
            id: Uuid::new_v4(),
            bottle_id,
            created_at: draft.created_at,
            content: draft.content,
            sequence_index,
        };
        note.validate()?;
        Ok(note)
    }

    /// Checks note-local invariants; ownership is checked by the bottle.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilNoteId);
        }
        if self.content.is_blank() {
            return Err(ValidationError::BlankNoteContent(self.id));
        }
        if self.sequence_index == 0 {
            return Err(ValidationError::ZeroSequenceIndex(self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Note, NoteContent, NoteDraft};
    use crate::model::error::ValidationError;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn blank_text_is_rejected() {
        let draft = NoteDraft::new(NoteContent::text("  \n"), Utc::now());
        let err = Note::new(Uuid::new_v4(), 1, draft).unwrap_err();
        assert!(matches!(err, ValidationError::BlankNoteContent(_)));
    }

    #[test]
    fn content_parts_roundtrip_through_storage_label() {
        let content = NoteContent::image("photos/a.jpg");
        let rebuilt = NoteContent::from_parts(content.kind_label(), content.as_str().to_string());
        assert_eq!(rebuilt, Some(content));
        assert_eq!(NoteContent::from_parts("video", "x".to_string()), None);
    }
}

//! Continuity notes: human annotations that never block writes.

use super::{require_text, SubjectRef};
use crate::error::ValidationError;
use crate::id::{AuthorId, NoteId, SeriesId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A free-text decision record attached to a series or one of its entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuityNote {
    pub id: NoteId,
    pub series_id: SeriesId,
    pub author_id: AuthorId,
    pub target: SubjectRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl ContinuityNote {
    pub fn apply(&mut self, patch: NotePatch) {
        self.content = patch.content.trim().to_string();
        self.updated_at = Utc::now();
    }
}

/// Request to attach a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub author_id: AuthorId,
    /// Entity the note is about; the series itself when absent.
    #[serde(default)]
    pub target: Option<SubjectRef>,
    pub content: String,
}

impl NewNote {
    pub fn new(author_id: AuthorId, content: impl Into<String>) -> Self {
        Self {
            author_id,
            target: None,
            content: content.into(),
        }
    }

    pub fn about(mut self, target: SubjectRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content)
    }

    pub fn into_note(self, series_id: SeriesId) -> ContinuityNote {
        let now = Utc::now();
        ContinuityNote {
            id: NoteId::new(),
            series_id,
            author_id: self.author_id,
            target: self.target.unwrap_or(SubjectRef::Series(series_id)),
            content: self.content.trim().to_string(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }
}

/// Edit of a note's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    pub content: String,
}

impl NotePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_defaults_to_series_target() {
        let series_id = SeriesId::new();
        let note = NewNote::new(AuthorId::new(), "Elira's eye color changes after Book 2")
            .into_note(series_id);
        assert_eq!(note.target, SubjectRef::Series(series_id));
    }

    #[test]
    fn test_blank_note_rejected() {
        assert!(NewNote::new(AuthorId::new(), "  ").validate().is_err());
        assert!(NotePatch {
            content: String::new()
        }
        .validate()
        .is_err());
    }
}

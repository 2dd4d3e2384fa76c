//! Books within a series.

use super::require_text;
use crate::error::ValidationError;
use crate::id::{AuthorId, BookId, SeriesId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Writing progress of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    Outline,
    Drafting,
    Revising,
    Complete,
}

/// A closed window of in-story time covered by a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub start: i64,
    pub end: i64,
}

impl Timeline {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Build a window from optional bounds; both or neither must be present.
    pub fn from_bounds(start: Option<i64>, end: Option<i64>) -> Result<Option<Self>, ValidationError> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) if start <= end => Ok(Some(Self { start, end })),
            (Some(start), Some(end)) => Err(ValidationError::Invalid {
                field: "timelineEnd",
                reason: format!("timeline ends at {end}, before it starts at {start}"),
            }),
            (Some(_), None) => Err(ValidationError::Missing { field: "timelineEnd" }),
            (None, Some(_)) => Err(ValidationError::Missing { field: "timelineStart" }),
        }
    }
}

/// A book in a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub series_id: SeriesId,
    pub author_id: AuthorId,
    pub book_number: u32,
    pub title: String,
    pub book_premise: Option<String>,
    pub book_conflict: Option<String>,
    pub timeline_start: Option<i64>,
    pub timeline_end: Option<i64>,
    /// Explicit jump from the previous book; a negative skip permits overlap.
    pub time_skip_from_previous: Option<i64>,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl Book {
    pub fn timeline(&self) -> Option<Timeline> {
        match (self.timeline_start, self.timeline_end) {
            (Some(start), Some(end)) => Some(Timeline { start, end }),
            _ => None,
        }
    }

    pub fn apply(&mut self, patch: BookPatch) {
        if let Some(number) = patch.book_number {
            self.book_number = number;
        }
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(premise) = patch.book_premise {
            self.book_premise = Some(premise);
        }
        if let Some(conflict) = patch.book_conflict {
            self.book_conflict = Some(conflict);
        }
        if let Some(start) = patch.timeline_start {
            self.timeline_start = Some(start);
        }
        if let Some(end) = patch.timeline_end {
            self.timeline_end = Some(end);
        }
        if let Some(skip) = patch.time_skip_from_previous {
            self.time_skip_from_previous = Some(skip);
        }
        if let Some(words) = patch.word_count {
            self.word_count = words;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Request to add a book to a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub author_id: AuthorId,
    pub book_number: u32,
    pub title: String,
    #[serde(default)]
    pub book_premise: Option<String>,
    #[serde(default)]
    pub book_conflict: Option<String>,
    #[serde(default)]
    pub timeline_start: Option<i64>,
    #[serde(default)]
    pub timeline_end: Option<i64>,
    #[serde(default)]
    pub time_skip_from_previous: Option<i64>,
    #[serde(default)]
    pub word_count: u64,
}

impl NewBook {
    pub fn new(author_id: AuthorId, book_number: u32, title: impl Into<String>) -> Self {
        Self {
            author_id,
            book_number,
            title: title.into(),
            book_premise: None,
            book_conflict: None,
            timeline_start: None,
            timeline_end: None,
            time_skip_from_previous: None,
            word_count: 0,
        }
    }

    pub fn with_timeline(mut self, start: i64, end: i64) -> Self {
        self.timeline_start = Some(start);
        self.timeline_end = Some(end);
        self
    }

    pub fn with_time_skip(mut self, skip: i64) -> Self {
        self.time_skip_from_previous = Some(skip);
        self
    }

    pub fn with_word_count(mut self, words: u64) -> Self {
        self.word_count = words;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        validate_book_number(self.book_number)?;
        Timeline::from_bounds(self.timeline_start, self.timeline_end)?;
        Ok(())
    }

    pub fn into_book(self, series_id: SeriesId) -> Book {
        let now = Utc::now();
        Book {
            id: BookId::new(),
            series_id,
            author_id: self.author_id,
            book_number: self.book_number,
            title: self.title.trim().to_string(),
            book_premise: self.book_premise,
            book_conflict: self.book_conflict,
            timeline_start: self.timeline_start,
            timeline_end: self.timeline_end,
            time_skip_from_previous: self.time_skip_from_previous,
            word_count: self.word_count,
            status: BookStatus::default(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }
}

/// Partial update of a book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookPatch {
    pub book_number: Option<u32>,
    pub title: Option<String>,
    pub book_premise: Option<String>,
    pub book_conflict: Option<String>,
    pub timeline_start: Option<i64>,
    pub timeline_end: Option<i64>,
    pub time_skip_from_previous: Option<i64>,
    pub word_count: Option<u64>,
    pub status: Option<BookStatus>,
}

impl BookPatch {
    /// Validate the patch against the book it will be applied to.
    pub fn validate(&self, current: &Book) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(number) = self.book_number {
            validate_book_number(number)?;
        }
        Timeline::from_bounds(
            self.timeline_start.or(current.timeline_start),
            self.timeline_end.or(current.timeline_end),
        )?;
        Ok(())
    }

    /// Whether applying this patch moves the book in the series ordering or
    /// in story time.
    pub fn touches_timeline(&self, current: &Book) -> bool {
        let changed = |new: Option<i64>, old: Option<i64>| new.is_some() && new != old;
        self.book_number.is_some_and(|n| n != current.book_number)
            || changed(self.timeline_start, current.timeline_start)
            || changed(self.timeline_end, current.timeline_end)
            || changed(self.time_skip_from_previous, current.time_skip_from_previous)
    }
}

fn validate_book_number(number: u32) -> Result<(), ValidationError> {
    if number == 0 {
        return Err(ValidationError::Invalid {
            field: "bookNumber",
            reason: "book numbers start at 1".to_string(),
        });
    }
    Ok(())
}

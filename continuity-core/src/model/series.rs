//! Series records: the continuity space shared by a set of books.

use super::require_text;
use crate::error::ValidationError;
use crate::id::{AuthorId, SeriesId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall mood of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Light,
    #[default]
    Balanced,
    Dark,
    Grim,
}

/// Narrative pacing of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    Slow,
    #[default]
    Moderate,
    Fast,
}

/// Intended readership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAudience {
    Children,
    MiddleGrade,
    YoungAdult,
    #[default]
    Adult,
}

/// Content rating shown to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    General,
    #[default]
    Teen,
    Mature,
    Explicit,
}

/// Lifecycle of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
}

/// A collection of books sharing one continuity space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: SeriesId,
    pub author_id: AuthorId,
    pub title: String,
    pub premise: Option<String>,
    pub genre: String,
    pub target_book_count: u32,
    pub tone: Tone,
    pub pacing: Pacing,
    pub target_audience: TargetAudience,
    pub content_rating: ContentRating,
    pub themes: Vec<String>,
    pub main_conflict: Option<String>,
    pub status: SeriesStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store revision, bumped on every commit.
    #[serde(default)]
    pub revision: u64,
}

impl Series {
    /// Apply a metadata patch. Series fields carry no continuity semantics.
    pub fn apply(&mut self, patch: SeriesPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(premise) = patch.premise {
            self.premise = Some(premise);
        }
        if let Some(genre) = patch.genre {
            self.genre = genre;
        }
        if let Some(count) = patch.target_book_count {
            self.target_book_count = count;
        }
        if let Some(tone) = patch.tone {
            self.tone = tone;
        }
        if let Some(pacing) = patch.pacing {
            self.pacing = pacing;
        }
        if let Some(audience) = patch.target_audience {
            self.target_audience = audience;
        }
        if let Some(rating) = patch.content_rating {
            self.content_rating = rating;
        }
        if let Some(themes) = patch.themes {
            self.themes = themes;
        }
        if let Some(conflict) = patch.main_conflict {
            self.main_conflict = Some(conflict);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Request to create a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSeries {
    pub author_id: AuthorId,
    pub title: String,
    #[serde(default)]
    pub premise: Option<String>,
    pub genre: String,
    pub target_book_count: u32,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub pacing: Pacing,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub content_rating: ContentRating,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub main_conflict: Option<String>,
}

impl NewSeries {
    /// Create a request with the required fields and defaults elsewhere.
    pub fn new(
        author_id: AuthorId,
        title: impl Into<String>,
        genre: impl Into<String>,
        target_book_count: u32,
    ) -> Self {
        Self {
            author_id,
            title: title.into(),
            premise: None,
            genre: genre.into(),
            target_book_count,
            tone: Tone::default(),
            pacing: Pacing::default(),
            target_audience: TargetAudience::default(),
            content_rating: ContentRating::default(),
            themes: Vec::new(),
            main_conflict: None,
        }
    }

    pub fn with_premise(mut self, premise: impl Into<String>) -> Self {
        self.premise = Some(premise.into());
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.themes.push(theme.into());
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("genre", &self.genre)?;
        validate_book_count(self.target_book_count)
    }

    /// Build the stored record.
    pub fn into_series(self) -> Series {
        let now = Utc::now();
        Series {
            id: SeriesId::new(),
            author_id: self.author_id,
            title: self.title.trim().to_string(),
            premise: self.premise,
            genre: self.genre.trim().to_string(),
            target_book_count: self.target_book_count,
            tone: self.tone,
            pacing: self.pacing,
            target_audience: self.target_audience,
            content_rating: self.content_rating,
            themes: self.themes,
            main_conflict: self.main_conflict,
            status: SeriesStatus::Planning,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }
}

/// Partial update of series metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesPatch {
    pub title: Option<String>,
    pub premise: Option<String>,
    pub genre: Option<String>,
    pub target_book_count: Option<u32>,
    pub tone: Option<Tone>,
    pub pacing: Option<Pacing>,
    pub target_audience: Option<TargetAudience>,
    pub content_rating: Option<ContentRating>,
    pub themes: Option<Vec<String>>,
    pub main_conflict: Option<String>,
    pub status: Option<SeriesStatus>,
}

impl SeriesPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(genre) = &self.genre {
            require_text("genre", genre)?;
        }
        if let Some(count) = self.target_book_count {
            validate_book_count(count)?;
        }
        Ok(())
    }
}

fn validate_book_count(count: u32) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::Invalid {
            field: "targetBookCount",
            reason: "a series plans at least one book".to_string(),
        });
    }
    Ok(())
}

//! Entity store: the persistence stage of the write pipeline.
//!
//! The store holds records and nothing else. It never evaluates continuity
//! rules; it only guarantees that a [`Write`] lands atomically and that a
//! stale revision is refused.

mod memory;
mod snapshot;

pub use memory::InMemoryStore;
pub use snapshot::{StoreSnapshot, SNAPSHOT_VERSION};

use crate::error::{StoreError, StoreResult};
use crate::id::{AuthorId, BookId, CharacterId, NoteId, SeriesId, ViolationId, WorldElementId};
use crate::model::{
    Book, Character, ContinuityNote, EntityKind, Series, Violation, ViolationStatus, WorldElement,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Narrow data-access interface over every record kind.
///
/// Listing methods return records in a stable order: books by book number,
/// everything else by creation time.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Get a series by ID
    async fn get_series(&self, id: SeriesId) -> StoreResult<Option<Series>>;

    /// List series, optionally restricted to one author
    async fn list_series(&self, author: Option<AuthorId>) -> StoreResult<Vec<Series>>;

    /// Delete a series and every record it owns. Returns false if absent.
    async fn delete_series(&self, id: SeriesId) -> StoreResult<bool>;

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>>;

    async fn books_in_series(&self, series: SeriesId) -> StoreResult<Vec<Book>>;

    async fn get_character(&self, id: CharacterId) -> StoreResult<Option<Character>>;

    async fn characters_in_series(&self, series: SeriesId) -> StoreResult<Vec<Character>>;

    async fn get_world_element(&self, id: WorldElementId) -> StoreResult<Option<WorldElement>>;

    async fn world_elements_in_series(&self, series: SeriesId) -> StoreResult<Vec<WorldElement>>;

    async fn get_note(&self, id: NoteId) -> StoreResult<Option<ContinuityNote>>;

    async fn notes_in_series(&self, series: SeriesId) -> StoreResult<Vec<ContinuityNote>>;

    async fn get_violation(&self, id: ViolationId) -> StoreResult<Option<Violation>>;

    async fn violations_in_series(&self, series: SeriesId) -> StoreResult<Vec<Violation>>;

    /// Move a violation to `next`, provided it is still in `expected`.
    async fn set_violation_status(
        &self,
        id: ViolationId,
        expected: ViolationStatus,
        next: ViolationStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Violation>;

    /// Persist a record together with the violations its change produced.
    ///
    /// `write.record.revision()` must equal the stored revision (0 for a new
    /// record). On success the stored copy, with its revision bumped, is
    /// returned. Child records require their series to exist.
    async fn commit(&self, write: Write) -> StoreResult<Record>;
}

/// Any record that can be committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Series(Series),
    Book(Book),
    Character(Character),
    WorldElement(WorldElement),
    Note(ContinuityNote),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Series(_) => EntityKind::Series,
            Record::Book(_) => EntityKind::Book,
            Record::Character(_) => EntityKind::Character,
            Record::WorldElement(_) => EntityKind::WorldElement,
            Record::Note(_) => EntityKind::Note,
        }
    }

    pub fn id_string(&self) -> String {
        match self {
            Record::Series(r) => r.id.to_string(),
            Record::Book(r) => r.id.to_string(),
            Record::Character(r) => r.id.to_string(),
            Record::WorldElement(r) => r.id.to_string(),
            Record::Note(r) => r.id.to_string(),
        }
    }

    pub fn series_id(&self) -> SeriesId {
        match self {
            Record::Series(r) => r.id,
            Record::Book(r) => r.series_id,
            Record::Character(r) => r.series_id,
            Record::WorldElement(r) => r.series_id,
            Record::Note(r) => r.series_id,
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            Record::Series(r) => r.revision,
            Record::Book(r) => r.revision,
            Record::Character(r) => r.revision,
            Record::WorldElement(r) => r.revision,
            Record::Note(r) => r.revision,
        }
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        match self {
            Record::Series(r) => r.revision = revision,
            Record::Book(r) => r.revision = revision,
            Record::Character(r) => r.revision = revision,
            Record::WorldElement(r) => r.revision = revision,
            Record::Note(r) => r.revision = revision,
        }
    }
}

/// A typed record that round-trips through [`Record`].
pub trait StoredRecord: Into<Record> + Sized {
    const KIND: EntityKind;

    fn from_record(record: Record) -> StoreResult<Self>;
}

macro_rules! stored_record {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Record {
            fn from(record: $ty) -> Self {
                Record::$variant(record)
            }
        }

        impl StoredRecord for $ty {
            const KIND: EntityKind = EntityKind::$variant;

            fn from_record(record: Record) -> StoreResult<Self> {
                match record {
                    Record::$variant(inner) => Ok(inner),
                    other => Err(StoreError::UnexpectedRecord {
                        expected: Self::KIND,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

stored_record!(Series, Series);
stored_record!(Book, Book);
stored_record!(Character, Character);
stored_record!(WorldElement, WorldElement);
stored_record!(ContinuityNote, Note);

/// One atomic commit: a record plus the soft violations raised against it.
#[derive(Debug, Clone)]
pub struct Write {
    pub record: Record,
    pub violations: Vec<Violation>,
}

impl Write {
    pub fn new(record: impl Into<Record>) -> Self {
        Self {
            record: record.into(),
            violations: Vec::new(),
        }
    }

    pub fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = violations;
        self
    }
}

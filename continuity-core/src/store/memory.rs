//! In-process entity store.

use super::{EntityStore, Record, StoreSnapshot, Write};
use crate::error::{StoreError, StoreResult};
use crate::id::{AuthorId, BookId, CharacterId, NoteId, SeriesId, ViolationId, WorldElementId};
use crate::model::{
    Book, Character, ContinuityNote, EntityKind, Series, Violation, ViolationStatus, WorldElement,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    series: HashMap<SeriesId, Series>,
    books: HashMap<BookId, Book>,
    characters: HashMap<CharacterId, Character>,
    world_elements: HashMap<WorldElementId, WorldElement>,
    notes: HashMap<NoteId, ContinuityNote>,
    violations: HashMap<ViolationId, Violation>,
}

impl Tables {
    fn check_parent(&self, record: &Record) -> StoreResult<()> {
        if matches!(record, Record::Series(_)) {
            return Ok(());
        }
        let series_id = record.series_id();
        if self.series.contains_key(&series_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                kind: EntityKind::Series,
                id: series_id.to_string(),
            })
        }
    }

    fn stored_revision(&self, record: &Record) -> Option<u64> {
        match record {
            Record::Series(r) => self.series.get(&r.id).map(|s| s.revision),
            Record::Book(r) => self.books.get(&r.id).map(|s| s.revision),
            Record::Character(r) => self.characters.get(&r.id).map(|s| s.revision),
            Record::WorldElement(r) => self.world_elements.get(&r.id).map(|s| s.revision),
            Record::Note(r) => self.notes.get(&r.id).map(|s| s.revision),
        }
    }

    fn put(&mut self, record: Record) {
        match record {
            Record::Series(r) => {
                self.series.insert(r.id, r);
            }
            Record::Book(r) => {
                self.books.insert(r.id, r);
            }
            Record::Character(r) => {
                self.characters.insert(r.id, r);
            }
            Record::WorldElement(r) => {
                self.world_elements.insert(r.id, r);
            }
            Record::Note(r) => {
                self.notes.insert(r.id, r);
            }
        }
    }
}

fn children<K, V, F>(table: &HashMap<K, V>, keep: F) -> Vec<V>
where
    K: Eq + Hash,
    V: Clone,
    F: Fn(&V) -> bool,
{
    table.values().filter(|v| keep(v)).cloned().collect()
}

/// Entity store held in memory behind a single async lock.
///
/// Every commit takes the write lock, so a record and its violations land
/// together or not at all.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a saved snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let tables = Tables {
            series: snapshot.series.into_iter().map(|r| (r.id, r)).collect(),
            books: snapshot.books.into_iter().map(|r| (r.id, r)).collect(),
            characters: snapshot.characters.into_iter().map(|r| (r.id, r)).collect(),
            world_elements: snapshot
                .world_elements
                .into_iter()
                .map(|r| (r.id, r))
                .collect(),
            notes: snapshot.notes.into_iter().map(|r| (r.id, r)).collect(),
            violations: snapshot.violations.into_iter().map(|r| (r.id, r)).collect(),
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Capture the full contents for persistence.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.read().await;
        let mut snapshot = StoreSnapshot::new();
        snapshot.series = tables.series.values().cloned().collect();
        snapshot.books = tables.books.values().cloned().collect();
        snapshot.characters = tables.characters.values().cloned().collect();
        snapshot.world_elements = tables.world_elements.values().cloned().collect();
        snapshot.notes = tables.notes.values().cloned().collect();
        snapshot.violations = tables.violations.values().cloned().collect();
        snapshot.sort();
        snapshot
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn get_series(&self, id: SeriesId) -> StoreResult<Option<Series>> {
        Ok(self.tables.read().await.series.get(&id).cloned())
    }

    async fn list_series(&self, author: Option<AuthorId>) -> StoreResult<Vec<Series>> {
        let tables = self.tables.read().await;
        let mut series = children(&tables.series, |s| {
            author.is_none_or(|author| s.author_id == author)
        });
        series.sort_by_key(|s| (s.created_at, s.id));
        Ok(series)
    }

    async fn delete_series(&self, id: SeriesId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.series.remove(&id).is_none() {
            return Ok(false);
        }
        tables.books.retain(|_, r| r.series_id != id);
        tables.characters.retain(|_, r| r.series_id != id);
        tables.world_elements.retain(|_, r| r.series_id != id);
        tables.notes.retain(|_, r| r.series_id != id);
        tables.violations.retain(|_, r| r.series_id != id);
        Ok(true)
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn books_in_series(&self, series: SeriesId) -> StoreResult<Vec<Book>> {
        let tables = self.tables.read().await;
        let mut books = children(&tables.books, |b| b.series_id == series);
        books.sort_by_key(|b| b.book_number);
        Ok(books)
    }

    async fn get_character(&self, id: CharacterId) -> StoreResult<Option<Character>> {
        Ok(self.tables.read().await.characters.get(&id).cloned())
    }

    async fn characters_in_series(&self, series: SeriesId) -> StoreResult<Vec<Character>> {
        let tables = self.tables.read().await;
        let mut characters = children(&tables.characters, |c| c.series_id == series);
        characters.sort_by_key(|c| (c.created_at, c.id));
        Ok(characters)
    }

    async fn get_world_element(&self, id: WorldElementId) -> StoreResult<Option<WorldElement>> {
        Ok(self.tables.read().await.world_elements.get(&id).cloned())
    }

    async fn world_elements_in_series(&self, series: SeriesId) -> StoreResult<Vec<WorldElement>> {
        let tables = self.tables.read().await;
        let mut elements = children(&tables.world_elements, |e| e.series_id == series);
        elements.sort_by_key(|e| (e.created_at, e.id));
        Ok(elements)
    }

    async fn get_note(&self, id: NoteId) -> StoreResult<Option<ContinuityNote>> {
        Ok(self.tables.read().await.notes.get(&id).cloned())
    }

    async fn notes_in_series(&self, series: SeriesId) -> StoreResult<Vec<ContinuityNote>> {
        let tables = self.tables.read().await;
        let mut notes = children(&tables.notes, |n| n.series_id == series);
        notes.sort_by_key(|n| (n.created_at, n.id));
        Ok(notes)
    }

    async fn get_violation(&self, id: ViolationId) -> StoreResult<Option<Violation>> {
        Ok(self.tables.read().await.violations.get(&id).cloned())
    }

    async fn violations_in_series(&self, series: SeriesId) -> StoreResult<Vec<Violation>> {
        let tables = self.tables.read().await;
        let mut violations = children(&tables.violations, |v| v.series_id == series);
        violations.sort_by_key(|v| (v.created_at, v.id));
        Ok(violations)
    }

    async fn set_violation_status(
        &self,
        id: ViolationId,
        expected: ViolationStatus,
        next: ViolationStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Violation> {
        let mut tables = self.tables.write().await;
        let violation = tables
            .violations
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Violation,
                id: id.to_string(),
            })?;
        if violation.status != expected {
            return Err(StoreError::Unavailable(format!(
                "violation {id} moved to {:?} concurrently",
                violation.status
            )));
        }
        violation.status = next;
        if next == ViolationStatus::Resolved {
            violation.resolved_at = Some(at);
        }
        Ok(violation.clone())
    }

    async fn commit(&self, write: Write) -> StoreResult<Record> {
        let Write {
            mut record,
            violations,
        } = write;
        let mut tables = self.tables.write().await;
        tables.check_parent(&record)?;

        let expected = record.revision();
        let found = tables.stored_revision(&record).unwrap_or(0);
        if expected != found {
            return Err(StoreError::Conflict {
                kind: record.kind(),
                id: record.id_string(),
                expected,
                found,
            });
        }

        record.set_revision(found + 1);
        tables.put(record.clone());
        for violation in violations {
            tables.violations.insert(violation.id, violation);
        }
        Ok(record)
    }
}

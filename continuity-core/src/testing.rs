//! Testing utilities for the continuity engine.
//!
//! This module provides tools for integration testing:
//! - `TestHarness` for building a series with books and cast in a few lines
//! - `FlakyStore` for injecting timeouts and transient failures into commits
//! - Assertion helpers for verifying violations

use crate::config::EngineConfig;
use crate::engine::{ContinuityEngine, WriteOutcome};
use crate::error::{EngineResult, StoreError, StoreResult};
use crate::id::{AuthorId, BookId, CharacterId, NoteId, SeriesId, ViolationId, WorldElementId};
use crate::model::{
    Book, Character, ContinuityNote, NewBook, NewCharacter, NewSeries, RuleCategory, Series,
    Severity, Violation, ViolationStatus, WorldElement,
};
use crate::store::{EntityStore, InMemoryStore, Record, Write};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How a [`FlakyStore`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Commit fails immediately with a transient error.
    Unavailable,
    /// Commit hangs for the given duration before proceeding.
    Stall(Duration),
}

/// An in-memory store whose next few commits fail.
pub struct FlakyStore {
    inner: InMemoryStore,
    fault: Fault,
    remaining: AtomicU32,
    commit_attempts: AtomicU32,
}

impl FlakyStore {
    /// Fail the next `count` commits with `fault`.
    pub fn new(fault: Fault, count: u32) -> Self {
        Self {
            inner: InMemoryStore::new(),
            fault,
            remaining: AtomicU32::new(count),
            commit_attempts: AtomicU32::new(0),
        }
    }

    /// Arm the fault again for the next `count` commits.
    pub fn fail_next(&self, count: u32) {
        self.remaining.store(count, Ordering::SeqCst);
    }

    /// Total commits attempted, including failed ones.
    pub fn commit_attempts(&self) -> u32 {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    fn take_fault(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl EntityStore for FlakyStore {
    async fn get_series(&self, id: SeriesId) -> StoreResult<Option<Series>> {
        self.inner.get_series(id).await
    }

    async fn list_series(&self, author: Option<AuthorId>) -> StoreResult<Vec<Series>> {
        self.inner.list_series(author).await
    }

    async fn delete_series(&self, id: SeriesId) -> StoreResult<bool> {
        self.inner.delete_series(id).await
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        self.inner.get_book(id).await
    }

    async fn books_in_series(&self, series: SeriesId) -> StoreResult<Vec<Book>> {
        self.inner.books_in_series(series).await
    }

    async fn get_character(&self, id: CharacterId) -> StoreResult<Option<Character>> {
        self.inner.get_character(id).await
    }

    async fn characters_in_series(&self, series: SeriesId) -> StoreResult<Vec<Character>> {
        self.inner.characters_in_series(series).await
    }

    async fn get_world_element(&self, id: WorldElementId) -> StoreResult<Option<WorldElement>> {
        self.inner.get_world_element(id).await
    }

    async fn world_elements_in_series(&self, series: SeriesId) -> StoreResult<Vec<WorldElement>> {
        self.inner.world_elements_in_series(series).await
    }

    async fn get_note(&self, id: NoteId) -> StoreResult<Option<ContinuityNote>> {
        self.inner.get_note(id).await
    }

    async fn notes_in_series(&self, series: SeriesId) -> StoreResult<Vec<ContinuityNote>> {
        self.inner.notes_in_series(series).await
    }

    async fn get_violation(&self, id: ViolationId) -> StoreResult<Option<Violation>> {
        self.inner.get_violation(id).await
    }

    async fn violations_in_series(&self, series: SeriesId) -> StoreResult<Vec<Violation>> {
        self.inner.violations_in_series(series).await
    }

    async fn set_violation_status(
        &self,
        id: ViolationId,
        expected: ViolationStatus,
        next: ViolationStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Violation> {
        self.inner.set_violation_status(id, expected, next, at).await
    }

    async fn commit(&self, write: Write) -> StoreResult<Record> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);
        if self.take_fault() {
            match self.fault {
                Fault::Unavailable => {
                    return Err(StoreError::Unavailable("injected fault".to_string()));
                }
                Fault::Stall(duration) => tokio::time::sleep(duration).await,
            }
        }
        self.inner.commit(write).await
    }
}

/// Engine over a fresh in-memory store, with one author and shortcuts for
/// the usual fixtures.
pub struct TestHarness {
    pub engine: ContinuityEngine,
    pub store: Arc<InMemoryStore>,
    pub author: AuthorId,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::new())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let engine = ContinuityEngine::with_config(store.clone(), config);
        Self {
            engine,
            store,
            author: AuthorId::new(),
        }
    }

    /// Create a series with default metadata.
    pub async fn series(&self, title: &str, target_book_count: u32) -> EngineResult<Series> {
        self.engine
            .create_series(NewSeries::new(self.author, title, "fantasy", target_book_count))
            .await
    }

    /// Add a book covering `start..end` in story time.
    pub async fn book(
        &self,
        series: SeriesId,
        number: u32,
        start: i64,
        end: i64,
    ) -> EngineResult<WriteOutcome<Book>> {
        self.engine
            .create_book(
                series,
                NewBook::new(self.author, number, format!("Book {number}")).with_timeline(start, end),
            )
            .await
    }

    /// Start a character request owned by this harness's author.
    pub fn new_character(&self, series: SeriesId, name: &str) -> NewCharacter {
        NewCharacter::new(series, self.author, name)
    }

    /// Create a plain character.
    pub async fn character(&self, series: SeriesId, name: &str) -> EngineResult<Character> {
        self.engine
            .create_character(self.new_character(series, name))
            .await
            .map(WriteOutcome::into_record)
    }

    pub async fn pending_violations(&self, series: SeriesId) -> EngineResult<Vec<Violation>> {
        self.engine
            .get_series_violations(series, Some(ViolationStatus::Pending))
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Count violations of one category and severity.
pub fn count_violations(violations: &[Violation], category: RuleCategory, severity: Severity) -> usize {
    violations
        .iter()
        .filter(|v| v.category == category && v.severity == severity)
        .count()
}

/// Assert that exactly one violation of this category and severity exists.
pub fn assert_single_violation(violations: &[Violation], category: RuleCategory, severity: Severity) {
    let count = count_violations(violations, category, severity);
    assert_eq!(
        count, 1,
        "Expected exactly one {severity:?} {category} violation, found {count} in {violations:#?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_builds_series() {
        let harness = TestHarness::new();
        let series = harness.series("Embercrest", 3).await.unwrap();
        harness.book(series.id, 1, 0, 100).await.unwrap();
        harness.character(series.id, "Vael").await.unwrap();

        let overview = harness.engine.get_series_overview(series.id).await.unwrap();
        assert_eq!(overview.books.len(), 1);
        assert_eq!(overview.character_count, 1);
    }

    #[tokio::test]
    async fn test_flaky_store_fails_then_recovers() {
        let store = FlakyStore::new(Fault::Unavailable, 1);
        let series = NewSeries::new(AuthorId::new(), "Embercrest", "fantasy", 3).into_series();

        let err = store.commit(Write::new(series.clone())).await.unwrap_err();
        assert!(err.is_transient());
        store.commit(Write::new(series)).await.unwrap();
        assert_eq!(store.commit_attempts(), 2);
    }
}

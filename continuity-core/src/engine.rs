//! Engine facade: the only surface exposed to the web layer.
//!
//! Every write that touches a book, character or world element runs the
//! full pipeline:
//!
//! 1. Validate the request
//! 2. Read a snapshot of the series and build a [`Change`]
//! 3. Let the [`ContinuityChecker`] decide
//! 4. Commit the record together with any soft violations, or reject
//!
//! A retryable failure anywhere in steps 2-4 restarts the whole operation
//! from a fresh read.

use crate::aggregator::{SeriesAggregator, SeriesContents, SeriesOverview, SeriesSummary};
use crate::checker::{BookChange, Change, ChangeKind, ContinuityChecker, EntityChange, SeriesContext, Verdict};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, StoreError, StoreResult, ValidationError};
use crate::id::{AuthorId, BookId, CharacterId, NoteId, SeriesId, ViolationId, WorldElementId};
use crate::model::{
    Book, BookPatch, Character, CharacterPatch, ContinuityNote, EntityKind, NewBook,
    NewCharacter, NewNote, NewSeries, NewWorldElement, NotePatch, Series, SeriesPatch,
    SubjectRef, Violation, ViolationStatus, WorldElement, WorldElementPatch,
};
use crate::store::{EntityStore, StoredRecord, Write};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A committed record plus the soft violations recorded with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(default)]
    pub warnings: Vec<Violation>,
}

impl<T> WriteOutcome<T> {
    pub fn into_record(self) -> T {
        self.record
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Stateless facade over an entity store. Cheap to clone.
#[derive(Clone)]
pub struct ContinuityEngine {
    store: Arc<dyn EntityStore>,
    config: EngineConfig,
    checker: ContinuityChecker,
    aggregator: SeriesAggregator,
}

impl ContinuityEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self::with_config(store, EngineConfig::new())
    }

    pub fn with_config(store: Arc<dyn EntityStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            checker: ContinuityChecker::new(),
            aggregator: SeriesAggregator::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Series
    // ========================================================================

    pub async fn create_series(&self, request: NewSeries) -> EngineResult<Series> {
        request.validate()?;
        let series = request.into_series();
        let stored = self
            .with_retry("create_series", || self.commit(series.clone(), Vec::new()))
            .await?;
        info!(series = %stored.id, title = %stored.title, "series created");
        Ok(stored)
    }

    /// Metadata edits carry no continuity semantics and bypass the checker.
    pub async fn update_series(&self, id: SeriesId, patch: SeriesPatch) -> EngineResult<Series> {
        patch.validate()?;
        self.with_retry("update_series", || self.update_series_once(id, &patch))
            .await
    }

    async fn update_series_once(&self, id: SeriesId, patch: &SeriesPatch) -> EngineResult<Series> {
        let mut series = self.require_series(id).await?;
        series.apply(patch.clone());
        self.commit(series, Vec::new()).await
    }

    pub async fn get_series(&self, id: SeriesId) -> EngineResult<Series> {
        self.with_retry("get_series", || self.require_series(id)).await
    }

    /// Every series by one author, each with its summary figures.
    pub async fn list_series_by_author(&self, author: AuthorId) -> EngineResult<Vec<SeriesSummary>> {
        self.with_retry("list_series_by_author", || self.list_series_once(author))
            .await
    }

    async fn list_series_once(&self, author: AuthorId) -> EngineResult<Vec<SeriesSummary>> {
        let all = self.call(self.store.list_series(Some(author))).await?;
        let mut summaries = Vec::with_capacity(all.len());
        for series in all {
            let contents = self.load_contents(series).await?;
            summaries.push(self.aggregator.summary(contents));
        }
        Ok(summaries)
    }

    /// Delete a series and everything it owns.
    pub async fn delete_series(&self, id: SeriesId) -> EngineResult<()> {
        let deleted = self
            .with_retry("delete_series", || self.call(self.store.delete_series(id)))
            .await?;
        if !deleted {
            return Err(EngineError::not_found(EntityKind::Series, id));
        }
        info!(series = %id, "series deleted");
        Ok(())
    }

    pub async fn get_series_overview(&self, id: SeriesId) -> EngineResult<SeriesOverview> {
        self.with_retry("get_series_overview", || self.overview_once(id))
            .await
    }

    async fn overview_once(&self, id: SeriesId) -> EngineResult<SeriesOverview> {
        let series = self.require_series(id).await?;
        let contents = self.load_contents(series).await?;
        Ok(self.aggregator.overview(contents))
    }

    // ========================================================================
    // Books
    // ========================================================================

    pub async fn create_book(
        &self,
        series_id: SeriesId,
        request: NewBook,
    ) -> EngineResult<WriteOutcome<Book>> {
        request.validate()?;
        let book = request.into_book(series_id);
        self.with_retry("create_book", || self.create_book_once(&book))
            .await
    }

    async fn create_book_once(&self, book: &Book) -> EngineResult<WriteOutcome<Book>> {
        self.require_series(book.series_id).await?;
        let books = self.call(self.store.books_in_series(book.series_id)).await?;
        ensure_book_number_free(&books, book)?;

        let context = SeriesContext::new().with_books(&books);
        let verdict = self
            .checker
            .evaluate(&Change::Book(BookChange::new(book, ChangeKind::Create)), &context);
        self.finish(verdict, book.clone()).await
    }

    /// Edit a book. Only number and timeline edits are re-checked; prose
    /// metadata and word counts are written directly.
    pub async fn update_book(&self, id: BookId, patch: BookPatch) -> EngineResult<WriteOutcome<Book>> {
        self.with_retry("update_book", || self.update_book_once(id, &patch))
            .await
    }

    async fn update_book_once(&self, id: BookId, patch: &BookPatch) -> EngineResult<WriteOutcome<Book>> {
        let current = self.require_book(id).await?;
        patch.validate(&current)?;

        let touches_timeline = patch.touches_timeline(&current);
        let mut next = current.clone();
        next.apply(patch.clone());

        let verdict = if touches_timeline {
            let books = self.call(self.store.books_in_series(current.series_id)).await?;
            ensure_book_number_free(&books, &next)?;
            let context = SeriesContext::new().with_books(&books);
            self.checker
                .evaluate(&Change::Book(BookChange::new(&next, ChangeKind::Update)), &context)
        } else {
            Verdict::default()
        };
        self.finish(verdict, next).await
    }

    pub async fn get_book(&self, id: BookId) -> EngineResult<Book> {
        self.with_retry("get_book", || self.require_book(id)).await
    }

    /// Books of a series, ordered by book number.
    pub async fn get_series_books(&self, series_id: SeriesId) -> EngineResult<Vec<Book>> {
        self.with_retry("get_series_books", || async move {
            self.require_series(series_id).await?;
            self.call(self.store.books_in_series(series_id)).await
        })
        .await
    }

    // ========================================================================
    // Characters
    // ========================================================================

    pub async fn create_character(&self, request: NewCharacter) -> EngineResult<WriteOutcome<Character>> {
        request.validate()?;
        let book_context = request.book_context;
        let character = request.into_character();
        self.with_retry("create_character", || {
            self.create_character_once(&character, book_context)
        })
        .await
    }

    async fn create_character_once(
        &self,
        character: &Character,
        book_context: Option<u32>,
    ) -> EngineResult<WriteOutcome<Character>> {
        let series_id = character.series_id;
        self.require_series(series_id).await?;
        let books = self.call(self.store.books_in_series(series_id)).await?;
        check_first_appearance(&books, character.first_appears_book, book_context)?;

        let context = self.identity_context(series_id).await?;
        let change = EntityChange::creation(character, character.creation_changes()?)
            .in_book(book_context);
        let verdict = self.checker.evaluate(&Change::Character(change), &context);
        self.finish(verdict, character.clone()).await
    }

    pub async fn update_character(
        &self,
        id: CharacterId,
        patch: CharacterPatch,
    ) -> EngineResult<WriteOutcome<Character>> {
        patch.validate()?;
        self.with_retry("update_character", || self.update_character_once(id, &patch))
            .await
    }

    async fn update_character_once(
        &self,
        id: CharacterId,
        patch: &CharacterPatch,
    ) -> EngineResult<WriteOutcome<Character>> {
        let current = self.require_character(id).await?;
        let mut patch = patch.clone();
        patch.normalize(&current);

        if patch.first_appears_book.is_some() {
            let books = self.call(self.store.books_in_series(current.series_id)).await?;
            check_first_appearance(&books, patch.first_appears_book, patch.book_context)?;
        }

        let context = self.identity_context(current.series_id).await?;
        let attributes = patch.changes(&current)?;
        let book_context = patch.book_context;
        let mut next = current.clone();
        next.apply(patch);

        let change = EntityChange::update(&current, attributes)
            .relocked(&next)
            .in_book(book_context);
        let verdict = self.checker.evaluate(&Change::Character(change), &context);
        self.finish(verdict, next).await
    }

    pub async fn get_character(&self, id: CharacterId) -> EngineResult<Character> {
        self.with_retry("get_character", || self.require_character(id))
            .await
    }

    pub async fn get_series_characters(&self, series_id: SeriesId) -> EngineResult<Vec<Character>> {
        self.with_retry("get_series_characters", || async move {
            self.require_series(series_id).await?;
            self.call(self.store.characters_in_series(series_id)).await
        })
        .await
    }

    // ========================================================================
    // World elements
    // ========================================================================

    pub async fn create_world_element(
        &self,
        request: NewWorldElement,
    ) -> EngineResult<WriteOutcome<WorldElement>> {
        request.validate()?;
        let book_context = request.book_context;
        let element = request.into_world_element();
        self.with_retry("create_world_element", || {
            self.create_world_element_once(&element, book_context)
        })
        .await
    }

    async fn create_world_element_once(
        &self,
        element: &WorldElement,
        book_context: Option<u32>,
    ) -> EngineResult<WriteOutcome<WorldElement>> {
        let series_id = element.series_id;
        self.require_series(series_id).await?;
        let books = self.call(self.store.books_in_series(series_id)).await?;
        check_first_appearance(&books, element.first_appears_book, book_context)?;

        let context = self.identity_context(series_id).await?;
        let change = EntityChange::creation(element, element.creation_changes()?)
            .in_book(book_context);
        let verdict = self.checker.evaluate(&Change::WorldElement(change), &context);
        self.finish(verdict, element.clone()).await
    }

    pub async fn update_world_element(
        &self,
        id: WorldElementId,
        patch: WorldElementPatch,
    ) -> EngineResult<WriteOutcome<WorldElement>> {
        patch.validate()?;
        self.with_retry("update_world_element", || {
            self.update_world_element_once(id, &patch)
        })
        .await
    }

    async fn update_world_element_once(
        &self,
        id: WorldElementId,
        patch: &WorldElementPatch,
    ) -> EngineResult<WriteOutcome<WorldElement>> {
        let current = self.require_world_element(id).await?;
        let mut patch = patch.clone();
        patch.normalize(&current);

        if patch.first_appears_book.is_some() {
            let books = self.call(self.store.books_in_series(current.series_id)).await?;
            check_first_appearance(&books, patch.first_appears_book, patch.book_context)?;
        }

        let context = self.identity_context(current.series_id).await?;
        let attributes = patch.changes(&current)?;
        let book_context = patch.book_context;
        let mut next = current.clone();
        next.apply(patch);

        let change = EntityChange::update(&current, attributes)
            .relocked(&next)
            .in_book(book_context);
        let verdict = self.checker.evaluate(&Change::WorldElement(change), &context);
        self.finish(verdict, next).await
    }

    pub async fn get_world_element(&self, id: WorldElementId) -> EngineResult<WorldElement> {
        self.with_retry("get_world_element", || self.require_world_element(id))
            .await
    }

    pub async fn get_series_world_elements(
        &self,
        series_id: SeriesId,
    ) -> EngineResult<Vec<WorldElement>> {
        self.with_retry("get_series_world_elements", || async move {
            self.require_series(series_id).await?;
            self.call(self.store.world_elements_in_series(series_id)).await
        })
        .await
    }

    // ========================================================================
    // Continuity notes
    // ========================================================================

    /// Attach a note. Notes never pass through the checker.
    pub async fn add_note(&self, series_id: SeriesId, request: NewNote) -> EngineResult<ContinuityNote> {
        request.validate()?;
        let note = request.into_note(series_id);
        self.with_retry("add_note", || self.add_note_once(&note))
            .await
    }

    async fn add_note_once(&self, note: &ContinuityNote) -> EngineResult<ContinuityNote> {
        self.require_series(note.series_id).await?;
        self.require_target(note.series_id, note.target).await?;
        self.commit(note.clone(), Vec::new()).await
    }

    pub async fn update_note(&self, id: NoteId, patch: NotePatch) -> EngineResult<ContinuityNote> {
        patch.validate()?;
        self.with_retry("update_note", || self.update_note_once(id, &patch))
            .await
    }

    async fn update_note_once(&self, id: NoteId, patch: &NotePatch) -> EngineResult<ContinuityNote> {
        let mut note = self.require_note(id).await?;
        note.apply(patch.clone());
        self.commit(note, Vec::new()).await
    }

    pub async fn get_series_notes(&self, series_id: SeriesId) -> EngineResult<Vec<ContinuityNote>> {
        self.with_retry("get_series_notes", || async move {
            self.require_series(series_id).await?;
            self.call(self.store.notes_in_series(series_id)).await
        })
        .await
    }

    // ========================================================================
    // Violations
    // ========================================================================

    /// Violations of a series, oldest first, optionally filtered by status.
    pub async fn get_series_violations(
        &self,
        series_id: SeriesId,
        status: Option<ViolationStatus>,
    ) -> EngineResult<Vec<Violation>> {
        let mut violations = self
            .with_retry("get_series_violations", || async move {
                self.require_series(series_id).await?;
                self.call(self.store.violations_in_series(series_id)).await
            })
            .await?;
        if let Some(status) = status {
            violations.retain(|v| v.status == status);
        }
        Ok(violations)
    }

    pub async fn acknowledge_violation(&self, id: ViolationId) -> EngineResult<Violation> {
        self.transition_violation(id, ViolationStatus::Acknowledged)
            .await
    }

    pub async fn resolve_violation(&self, id: ViolationId) -> EngineResult<Violation> {
        self.transition_violation(id, ViolationStatus::Resolved)
            .await
    }

    async fn transition_violation(&self, id: ViolationId, next: ViolationStatus) -> EngineResult<Violation> {
        let violation = self
            .with_retry("transition_violation", || async move {
                let current = self.require_violation(id).await?;
                if !current.status.can_transition_to(next) {
                    return Err(ValidationError::Invalid {
                        field: "status",
                        reason: format!(
                            "cannot move a violation from {} to {}",
                            current.status.name(),
                            next.name()
                        ),
                    }
                    .into());
                }
                self.call(
                    self.store
                        .set_violation_status(id, current.status, next, Utc::now()),
                )
                .await
            })
            .await?;
        info!(violation = %id, status = next.name(), "violation status changed");
        Ok(violation)
    }

    // ========================================================================
    // Pipeline plumbing
    // ========================================================================

    /// Reject on any hard violation, otherwise commit the record with the
    /// soft ones.
    async fn finish<T: StoredRecord>(&self, verdict: Verdict, record: T) -> EngineResult<WriteOutcome<T>> {
        if verdict.is_rejected() {
            warn!(
                kind = %T::KIND,
                violations = verdict.violations.len(),
                "write rejected by continuity check"
            );
            return Err(EngineError::ContinuityViolation {
                violations: verdict.violations,
            });
        }

        let warnings = verdict.violations;
        if !warnings.is_empty() {
            warn!(kind = %T::KIND, count = warnings.len(), "soft continuity violations recorded");
        }
        let record = self.commit(record, warnings.clone()).await?;
        info!(kind = %T::KIND, "record committed");
        Ok(WriteOutcome { record, warnings })
    }

    async fn commit<T: StoredRecord>(&self, record: T, violations: Vec<Violation>) -> EngineResult<T> {
        let write = Write::new(record).with_violations(violations);
        let stored = self.call(self.store.commit(write)).await?;
        Ok(T::from_record(stored)?)
    }

    /// Run one store call under the configured timeout.
    async fn call<T, F>(&self, future: F) -> EngineResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.config.store_timeout, future).await {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => Err(StoreError::Timeout(self.config.store_timeout).into()),
        }
    }

    /// Repeat `attempt` while it fails with a retryable error, up to
    /// `max_retries` extra times with linear backoff.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt().await {
                Err(EngineError::ConflictRetryable { reason, .. }) => {
                    if attempts > self.config.max_retries {
                        warn!(operation, attempts, %reason, "giving up on retryable failure");
                        return Err(EngineError::ConflictRetryable { reason, attempts });
                    }
                    debug!(operation, attempts, %reason, "retrying");
                    tokio::time::sleep(self.config.backoff_for(attempts)).await;
                }
                other => return other,
            }
        }
    }

    async fn load_contents(&self, series: Series) -> EngineResult<SeriesContents> {
        let id = series.id;
        Ok(SeriesContents {
            books: self.call(self.store.books_in_series(id)).await?,
            characters: self.call(self.store.characters_in_series(id)).await?,
            world_elements: self.call(self.store.world_elements_in_series(id)).await?,
            notes: self.call(self.store.notes_in_series(id)).await?,
            violations: self.call(self.store.violations_in_series(id)).await?,
            series,
        })
    }

    async fn identity_context(&self, series_id: SeriesId) -> EngineResult<SeriesContext> {
        let characters = self.call(self.store.characters_in_series(series_id)).await?;
        let elements = self.call(self.store.world_elements_in_series(series_id)).await?;
        Ok(SeriesContext::new()
            .with_characters(&characters)
            .with_world_elements(&elements))
    }

    /// A note target must exist and belong to the note's series.
    async fn require_target(&self, series_id: SeriesId, target: SubjectRef) -> EngineResult<()> {
        let owner = match target {
            SubjectRef::Series(id) => id,
            SubjectRef::Book(id) => self.require_book(id).await?.series_id,
            SubjectRef::Character(id) => self.require_character(id).await?.series_id,
            SubjectRef::WorldElement(id) => self.require_world_element(id).await?.series_id,
        };
        if owner != series_id {
            return Err(ValidationError::Invalid {
                field: "target",
                reason: format!("{target} belongs to another series"),
            }
            .into());
        }
        Ok(())
    }

    async fn require_series(&self, id: SeriesId) -> EngineResult<Series> {
        required(self.call(self.store.get_series(id)).await?, EntityKind::Series, id)
    }

    async fn require_book(&self, id: BookId) -> EngineResult<Book> {
        required(self.call(self.store.get_book(id)).await?, EntityKind::Book, id)
    }

    async fn require_character(&self, id: CharacterId) -> EngineResult<Character> {
        required(
            self.call(self.store.get_character(id)).await?,
            EntityKind::Character,
            id,
        )
    }

    async fn require_world_element(&self, id: WorldElementId) -> EngineResult<WorldElement> {
        required(
            self.call(self.store.get_world_element(id)).await?,
            EntityKind::WorldElement,
            id,
        )
    }

    async fn require_note(&self, id: NoteId) -> EngineResult<ContinuityNote> {
        required(self.call(self.store.get_note(id)).await?, EntityKind::Note, id)
    }

    async fn require_violation(&self, id: ViolationId) -> EngineResult<Violation> {
        required(
            self.call(self.store.get_violation(id)).await?,
            EntityKind::Violation,
            id,
        )
    }
}

fn required<T>(found: Option<T>, kind: EntityKind, id: impl ToString) -> EngineResult<T> {
    found.ok_or_else(|| EngineError::not_found(kind, id))
}

fn ensure_book_number_free(books: &[Book], book: &Book) -> Result<(), ValidationError> {
    if books
        .iter()
        .any(|b| b.book_number == book.book_number && b.id != book.id)
    {
        return Err(ValidationError::Invalid {
            field: "bookNumber",
            reason: format!("book {} already exists in this series", book.book_number),
        });
    }
    Ok(())
}

/// `firstAppearsBook` must name an existing book at or before the book being
/// edited.
fn check_first_appearance(
    books: &[Book],
    first: Option<u32>,
    book_context: Option<u32>,
) -> Result<(), ValidationError> {
    let Some(first) = first else {
        return Ok(());
    };
    if !books.iter().any(|b| b.book_number == first) {
        return Err(ValidationError::Invalid {
            field: "firstAppearsBook",
            reason: format!("book {first} does not exist in this series"),
        });
    }
    if let Some(context) = book_context {
        if first > context {
            return Err(ValidationError::Invalid {
                field: "firstAppearsBook",
                reason: format!("book {first} comes after the book being edited ({context})"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::AuthorId;

    fn book(number: u32) -> Book {
        NewBook::new(AuthorId::new(), number, format!("Book {number}")).into_book(SeriesId::new())
    }

    #[test]
    fn test_first_appearance_rules() {
        let books = vec![book(1), book(3)];
        assert!(check_first_appearance(&books, None, Some(1)).is_ok());
        assert!(check_first_appearance(&books, Some(1), Some(3)).is_ok());
        assert!(check_first_appearance(&books, Some(3), None).is_ok());

        let err = check_first_appearance(&books, Some(2), None).unwrap_err();
        assert_eq!(err.field(), "firstAppearsBook");

        let err = check_first_appearance(&books, Some(3), Some(1)).unwrap_err();
        assert!(err.to_string().contains("after the book being edited"));
    }

    #[test]
    fn test_book_number_must_be_free() {
        let existing = book(1);
        let mut same = existing.clone();
        assert!(ensure_book_number_free(std::slice::from_ref(&existing), &same).is_ok());

        same.id = BookId::new();
        let err = ensure_book_number_free(&[existing], &same).unwrap_err();
        assert_eq!(err.field(), "bookNumber");
    }

    #[test]
    fn test_write_outcome_wire_shape() {
        let outcome = WriteOutcome {
            record: book(1),
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["bookNumber"], 1);
        assert!(json["warnings"].as_array().unwrap().is_empty());
        assert!(!outcome.has_warnings());
    }
}

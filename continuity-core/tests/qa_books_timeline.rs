//! QA tests for books: numbering, timeline windows and time skips.
//!
//! Run with: `cargo test -p continuity-core --test qa_books_timeline`

use continuity_core::testing::{assert_single_violation, TestHarness};
use continuity_core::{BookPatch, BookStatus, EngineError, NewBook, RuleCategory, Severity};

#[tokio::test]
async fn test_book_two_overlapping_book_one_rejected() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    h.book(series.id, 1, 0, 100).await.unwrap();

    let err = h.book(series.id, 2, 50, 150).await.unwrap_err();
    assert!(matches!(err, EngineError::ContinuityViolation { .. }));
    assert_single_violation(err.violations(), RuleCategory::TimelineOverlap, Severity::Hard);
    assert_eq!(h.engine.get_series_books(series.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_book_two_starting_at_book_one_end_accepted() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    h.book(series.id, 1, 0, 100).await.unwrap();

    let outcome = h.book(series.id, 2, 100, 180).await.unwrap();
    assert!(!outcome.has_warnings());
}

#[tokio::test]
async fn test_negative_time_skip_allows_flashback_overlap() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    h.book(series.id, 1, 0, 100).await.unwrap();

    h.engine
        .create_book(
            series.id,
            NewBook::new(h.author, 2, "Embers Past")
                .with_timeline(75, 160)
                .with_time_skip(-25),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_books_are_ordered_and_numbers_unique() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    h.book(series.id, 3, 300, 400).await.unwrap();
    h.book(series.id, 1, 0, 100).await.unwrap();

    let err = h.book(series.id, 1, 100, 200).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let numbers: Vec<u32> = h
        .engine
        .get_series_books(series.id)
        .await
        .unwrap()
        .iter()
        .map(|b| b.book_number)
        .collect();
    assert_eq!(numbers, vec![1, 3]);
}

#[tokio::test]
async fn test_invalid_timeline_bounds_rejected_before_checker() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();

    let err = h.book(series.id, 1, 100, 0).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let mut half_open = NewBook::new(h.author, 1, "Ashfall");
    half_open.timeline_start = Some(10);
    let err = h.engine.create_book(series.id, half_open).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_moving_book_into_neighbour_rejected() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    h.book(series.id, 1, 0, 100).await.unwrap();
    let second = h.book(series.id, 2, 100, 200).await.unwrap().into_record();

    let err = h
        .engine
        .update_book(
            second.id,
            BookPatch {
                timeline_start: Some(90),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_single_violation(err.violations(), RuleCategory::TimelineOverlap, Severity::Hard);
    assert_eq!(
        h.engine.get_book(second.id).await.unwrap().timeline_start,
        Some(100)
    );
}

#[tokio::test]
async fn test_word_count_updates_bypass_checker() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    let first = h.book(series.id, 1, 0, 100).await.unwrap().into_record();

    let outcome = h
        .engine
        .update_book(
            first.id,
            BookPatch {
                word_count: Some(42_000),
                status: Some(BookStatus::Drafting),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.record.word_count, 42_000);
    assert_eq!(outcome.record.status, BookStatus::Drafting);
    assert_eq!(outcome.record.revision, first.revision + 1);
}

#[tokio::test]
async fn test_book_for_missing_series_not_found() {
    let h = TestHarness::new();
    let err = h
        .book(continuity_core::SeriesId::new(), 1, 0, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

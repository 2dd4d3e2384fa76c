//! QA tests for series overviews, notes, listing and cascading deletes.
//!
//! Run with: `cargo test -p continuity-core --test qa_overview`

use continuity_core::testing::TestHarness;
use continuity_core::{
    ArcStatus, CanonLockLevel, CharacterAttribute, CharacterPatch, ElementCategory, EngineError,
    NewNote, NewSeries, NewWorldElement, NotePatch, SeriesId, SeriesPatch, SeriesStatus,
    SubjectRef, ViolationStatus,
};

#[tokio::test]
async fn test_overview_counts_entities() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    for name in ["Vael", "Elira", "Orren"] {
        h.character(series.id, name).await.unwrap();
    }
    for name in ["Dusk Gate", "Ashen Order"] {
        h.engine
            .create_world_element(
                NewWorldElement::new(series.id, h.author, name, ElementCategory::Faction)
                    .with_arc(ArcStatus::Active),
            )
            .await
            .unwrap();
    }

    let overview = h.engine.get_series_overview(series.id).await.unwrap();
    assert_eq!(overview.character_count, 3);
    assert_eq!(overview.world_element_count, 2);
    assert_eq!(overview.active_arc_count, 2);
    assert_eq!(overview.pending_violations, 0);
}

#[tokio::test]
async fn test_resolving_all_violations_clears_pending_count() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    let vael = h
        .engine
        .create_character(
            h.new_character(series.id, "Vael")
                .with_eye_color("amber")
                .with_lock(
                    CanonLockLevel::Soft,
                    [CharacterAttribute::EyeColor, CharacterAttribute::HairColor],
                ),
        )
        .await
        .unwrap()
        .into_record();
    h.engine
        .update_character(
            vael.id,
            CharacterPatch {
                eye_color: Some("blue".into()),
                hair_color: Some("white".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let overview = h.engine.get_series_overview(series.id).await.unwrap();
    assert_eq!(overview.pending_violations, 2);

    for violation in h.pending_violations(series.id).await.unwrap() {
        h.engine.resolve_violation(violation.id).await.unwrap();
    }
    let overview = h.engine.get_series_overview(series.id).await.unwrap();
    assert_eq!(overview.pending_violations, 0);
}

#[tokio::test]
async fn test_overview_word_count_and_book_order() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    let second = h.book(series.id, 2, 100, 200).await.unwrap().into_record();
    let first = h.book(series.id, 1, 0, 100).await.unwrap().into_record();
    for (id, words) in [(first.id, 90_000), (second.id, 85_000)] {
        h.engine
            .update_book(
                id,
                continuity_core::BookPatch {
                    word_count: Some(words),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let overview = h.engine.get_series_overview(series.id).await.unwrap();
    assert_eq!(overview.total_word_count, 175_000);
    assert_eq!(overview.books[0].id, first.id);
    assert_eq!(overview.books[1].id, second.id);
}

#[tokio::test]
async fn test_missing_series_overview_not_found() {
    let h = TestHarness::new();
    let err = h
        .engine
        .get_series_overview(SeriesId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_notes_surface_in_overview() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    let vael = h.character(series.id, "Vael").await.unwrap();

    let note = h
        .engine
        .add_note(
            series.id,
            NewNote::new(h.author, "Vael's scar is on the left hand")
                .about(SubjectRef::Character(vael.id)),
        )
        .await
        .unwrap();
    h.engine
        .update_note(
            note.id,
            NotePatch {
                content: "Vael's scar is on the right hand".into(),
            },
        )
        .await
        .unwrap();

    let overview = h.engine.get_series_overview(series.id).await.unwrap();
    assert_eq!(overview.continuity_notes.len(), 1);
    assert_eq!(
        overview.continuity_notes[0].content,
        "Vael's scar is on the right hand"
    );
    assert_eq!(overview.pending_violations, 0);
}

#[tokio::test]
async fn test_note_target_must_belong_to_series() {
    let h = TestHarness::new();
    let home = h.series("Embercrest", 3).await.unwrap();
    let other = h.series("Frostmere", 2).await.unwrap();
    let stranger = h.character(other.id, "Kestrel").await.unwrap();

    let err = h
        .engine
        .add_note(
            home.id,
            NewNote::new(h.author, "cameo?").about(SubjectRef::Character(stranger.id)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_series_metadata_update_and_listing() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    h.book(series.id, 1, 0, 100).await.unwrap();
    h.engine
        .create_series(NewSeries::new(
            continuity_core::AuthorId::new(),
            "Someone Else's",
            "mystery",
            1,
        ))
        .await
        .unwrap();

    let updated = h
        .engine
        .update_series(
            series.id,
            SeriesPatch {
                status: Some(SeriesStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, SeriesStatus::Active);

    let listed = h.engine.list_series_by_author(h.author).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].series.id, series.id);
    assert_eq!(listed[0].book_count, 1);

    let err = h
        .engine
        .update_series(
            series.id,
            SeriesPatch {
                target_book_count: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_delete_series_cascades() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    h.book(series.id, 1, 0, 100).await.unwrap();
    let vael = h
        .engine
        .create_character(
            h.new_character(series.id, "Vael")
                .with_eye_color("amber")
                .with_lock(CanonLockLevel::Soft, [CharacterAttribute::EyeColor]),
        )
        .await
        .unwrap()
        .into_record();
    let outcome = h
        .engine
        .update_character(
            vael.id,
            CharacterPatch {
                eye_color: Some("blue".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let violation = outcome.warnings[0].id;
    h.engine
        .add_note(series.id, NewNote::new(h.author, "check Book 1 epilogue"))
        .await
        .unwrap();

    h.engine.delete_series(series.id).await.unwrap();

    assert!(matches!(
        h.engine.get_series(series.id).await,
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        h.engine.get_character(vael.id).await,
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        h.engine.acknowledge_violation(violation).await,
        Err(EngineError::NotFound { .. })
    ));
    assert!(h.engine.list_series_by_author(h.author).await.unwrap().is_empty());
    assert!(matches!(
        h.engine.delete_series(series.id).await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_pending_filter_excludes_acknowledged() {
    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    let vael = h
        .engine
        .create_character(
            h.new_character(series.id, "Vael")
                .with_eye_color("amber")
                .with_lock(CanonLockLevel::Soft, [CharacterAttribute::EyeColor]),
        )
        .await
        .unwrap()
        .into_record();
    let outcome = h
        .engine
        .update_character(
            vael.id,
            CharacterPatch {
                eye_color: Some("blue".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    h.engine
        .acknowledge_violation(outcome.warnings[0].id)
        .await
        .unwrap();

    assert!(h.pending_violations(series.id).await.unwrap().is_empty());
    let acknowledged = h
        .engine
        .get_series_violations(series.id, Some(ViolationStatus::Acknowledged))
        .await
        .unwrap();
    assert_eq!(acknowledged.len(), 1);
}

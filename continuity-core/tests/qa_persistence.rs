//! QA tests for snapshot save/load.
//!
//! These tests verify that store contents survive a round trip through a
//! JSON snapshot file.
//! Run with: `cargo test -p continuity-core --test qa_persistence`

use continuity_core::testing::TestHarness;
use continuity_core::{
    CanonLockLevel, CharacterAttribute, CharacterPatch, ContinuityEngine, EngineError,
    InMemoryStore, StoreSnapshot,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_snapshot_preserves_overview() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("continuity.json");

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
    h.engine
        .update_character(
            vael.id,
            CharacterPatch {
                eye_color: Some("blue".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let before = h.engine.get_series_overview(series.id).await.unwrap();

    h.store.snapshot().await.save_json(&path).await.unwrap();

    let restored = StoreSnapshot::load_json(&path).await.unwrap();
    let engine = ContinuityEngine::new(Arc::new(InMemoryStore::from_snapshot(restored)));
    let after = engine.get_series_overview(series.id).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.pending_violations, 1);
}

#[tokio::test]
async fn test_restored_store_keeps_locks_and_revisions() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("continuity.json");

    let h = TestHarness::new();
    let series = h.series("Embercrest", 3).await.unwrap();
    let vael = h
        .engine
        .create_character(
            h.new_character(series.id, "Vael")
                .with_eye_color("amber")
                .with_lock(CanonLockLevel::Hard, [CharacterAttribute::EyeColor]),
        )
        .await
        .unwrap()
        .into_record();
    h.store.snapshot().await.save_json(&path).await.unwrap();

    let engine = ContinuityEngine::new(Arc::new(InMemoryStore::from_snapshot(
        StoreSnapshot::load_json(&path).await.unwrap(),
    )));

    let err = engine
        .update_character(
            vael.id,
            CharacterPatch {
                eye_color: Some("blue".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ContinuityViolation { .. }));

    let outcome = engine
        .update_character(
            vael.id,
            CharacterPatch {
                backstory: Some("Raised in the ash fields".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.record.revision, vael.revision + 1);
}

//! JSON snapshots of the entity store for save/load across restarts.

use crate::error::{StoreError, StoreResult};
use crate::model::{Book, Character, ContinuityNote, Series, Violation, WorldElement};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Every record in the store, one table per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Format version for compatibility checking.
    pub version: u32,

    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,

    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub world_elements: Vec<WorldElement>,
    #[serde(default)]
    pub notes: Vec<ContinuityNote>,
    #[serde(default)]
    pub violations: Vec<Violation>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            series: Vec::new(),
            books: Vec::new(),
            characters: Vec::new(),
            world_elements: Vec::new(),
            notes: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Order tables so repeated saves of the same state produce the same file.
    pub fn sort(&mut self) {
        self.series.sort_by_key(|r| (r.created_at, r.id));
        self.books.sort_by_key(|r| (r.series_id, r.book_number));
        self.characters.sort_by_key(|r| (r.created_at, r.id));
        self.world_elements.sort_by_key(|r| (r.created_at, r.id));
        self.notes.sort_by_key(|r| (r.created_at, r.id));
        self.violations.sort_by_key(|r| (r.created_at, r.id));
    }

    pub fn record_count(&self) -> usize {
        self.series.len()
            + self.books.len()
            + self.characters.len()
            + self.world_elements.len()
            + self.notes.len()
            + self.violations.len()
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> StoreResult<Self> {
        let content = fs::read_to_string(path).await?;
        let snapshot: Self = serde_json::from_str(&content)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }

        Ok(snapshot)
    }
}

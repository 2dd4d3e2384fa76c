//! Narrative continuity engine for multi-book fiction series.
//!
//! This crate provides:
//! - The series data model (books, characters, world elements, notes)
//! - Canon locking with per-attribute soft and hard locks
//! - A continuity checker for identity, status regression, timeline overlap
//!   and locked-attribute rules
//! - Series overviews for tracking continuity health
//! - An async entity store with JSON snapshots
//!
//! # Quick Start
//!
//! ```ignore
//! use continuity_core::{ContinuityEngine, InMemoryStore, NewSeries, NewCharacter, AuthorId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ContinuityEngine::new(Arc::new(InMemoryStore::new()));
//!     let author = AuthorId::new();
//!
//!     let series = engine
//!         .create_series(NewSeries::new(author, "Embercrest", "fantasy", 3))
//!         .await?;
//!     let vael = engine
//!         .create_character(NewCharacter::new(series.id, author, "Vael").with_eye_color("amber"))
//!         .await?;
//!
//!     let overview = engine.get_series_overview(series.id).await?;
//!     println!("{} characters", overview.character_count);
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod checker;
pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod model;
pub mod policy;
pub mod store;
pub mod testing;

// Primary public API
pub use aggregator::{SeriesAggregator, SeriesOverview, SeriesSummary};
pub use checker::{ContinuityChecker, Verdict};
pub use config::{ConfigError, EngineConfig};
pub use engine::{ContinuityEngine, WriteOutcome};
pub use error::{EngineError, EngineResult, StoreError, StoreResult, ValidationError};
pub use id::{AuthorId, BookId, CharacterId, NoteId, SeriesId, ViolationId, WorldElementId};
pub use model::*;
pub use policy::{classify, LockClass};
pub use store::{EntityStore, InMemoryStore, StoreSnapshot};

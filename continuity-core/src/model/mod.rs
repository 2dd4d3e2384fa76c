//! Records persisted by the entity store.
//!
//! ```text
//! Series ──owns──┬── Book*            (bookNumber unique per series)
//!                ├── Character*       (lockable, identity-bearing)
//!                ├── WorldElement*    (lockable, identity-bearing)
//!                ├── ContinuityNote*  (human-only annotations)
//!                └── Violation*       (append-only, produced by the checker)
//! ```

mod book;
mod character;
mod lock;
mod note;
mod series;
mod violation;
mod world_element;

pub use book::{Book, BookPatch, BookStatus, NewBook, Timeline};
pub use character::{
    Character, CharacterAttribute, CharacterPatch, CharacterRole, CharacterStatus, NewCharacter,
    Personality, PhysicalDescription,
};
pub use lock::{Attribute, CanonLockLevel, LockedAttributes};
pub use note::{ContinuityNote, NewNote, NotePatch};
pub use series::{
    ContentRating, NewSeries, Pacing, Series, SeriesPatch, SeriesStatus, TargetAudience, Tone,
};
pub use violation::{RuleCategory, Severity, SubjectRef, Violation, ViolationStatus};
pub use world_element::{
    ElementCategory, NewWorldElement, WorldElement, WorldElementAttribute, WorldElementPatch,
};

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of record the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Series,
    Book,
    Character,
    WorldElement,
    Note,
    Violation,
}

impl EntityKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Series => "Series",
            EntityKind::Book => "Book",
            EntityKind::Character => "Character",
            EntityKind::WorldElement => "World element",
            EntityKind::Note => "Note",
            EntityKind::Violation => "Violation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arc progress for a character or world element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcStatus {
    Planned,
    Active,
    Climax,
    Resolved,
    Abandoned,
}

impl ArcStatus {
    /// Resolved and abandoned arcs no longer need tracking.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ArcStatus::Resolved | ArcStatus::Abandoned)
    }
}

/// A lockable, identity-bearing entity (characters and world elements).
pub trait CanonEntity {
    type Attribute: Attribute;

    fn subject(&self) -> SubjectRef;
    fn series_id(&self) -> crate::id::SeriesId;
    fn name(&self) -> &str;
    fn aliases(&self) -> &[String];
    fn lock_level(&self) -> CanonLockLevel;
    fn locked_attributes(&self) -> &LockedAttributes<Self::Attribute>;
    fn first_appears_book(&self) -> Option<u32>;
    fn arc_status(&self) -> Option<ArcStatus>;

    /// Whether the entity has an arc that still needs tracking.
    fn has_active_arc(&self) -> bool {
        self.arc_status().is_some_and(|arc| !arc.is_terminal())
    }
}

/// Reject blank required text fields.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Missing { field })
    } else {
        Ok(())
    }
}

/// Trim aliases, drop blanks, and remove case-insensitive duplicates,
/// including any alias that repeats the entity's own name.
pub fn normalize_aliases(name: &str, aliases: &[String]) -> Vec<String> {
    let mut seen = vec![identity_key(name)];
    let mut out = Vec::with_capacity(aliases.len());
    for alias in aliases {
        let trimmed = alias.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = identity_key(trimmed);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(trimmed.to_string());
    }
    out
}

/// Key used for case-insensitive identity comparison.
pub fn identity_key(name: &str) -> String {
    name.trim().to_lowercase()
}

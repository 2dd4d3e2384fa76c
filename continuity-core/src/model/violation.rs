//! Continuity violations recorded by the checker.
//!
//! Violations are append-only from the engine's side. Only a human action
//! moves one from `pending` to `acknowledged` or `resolved`.

use super::EntityKind;
use crate::id::{BookId, CharacterId, SeriesId, ViolationId, WorldElementId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to the entity a violation or note is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubjectRef {
    Series(SeriesId),
    Book(BookId),
    Character(CharacterId),
    WorldElement(WorldElementId),
}

impl SubjectRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            SubjectRef::Series(_) => EntityKind::Series,
            SubjectRef::Book(_) => EntityKind::Book,
            SubjectRef::Character(_) => EntityKind::Character,
            SubjectRef::WorldElement(_) => EntityKind::WorldElement,
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectRef::Series(id) => write!(f, "series {id}"),
            SubjectRef::Book(id) => write!(f, "book {id}"),
            SubjectRef::Character(id) => write!(f, "character {id}"),
            SubjectRef::WorldElement(id) => write!(f, "world element {id}"),
        }
    }
}

/// The fixed catalog of continuity rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    /// Name or alias collides with another entity in the series.
    Identity,
    /// A deceased character returns to life.
    StatusRegression,
    /// A book's time window conflicts with another book's.
    TimelineOverlap,
    /// A locked attribute was changed.
    LockedAttributeMutation,
}

impl RuleCategory {
    pub fn name(&self) -> &'static str {
        match self {
            RuleCategory::Identity => "identity",
            RuleCategory::StatusRegression => "status-regression",
            RuleCategory::TimelineOverlap => "timeline-overlap",
            RuleCategory::LockedAttributeMutation => "locked-attribute-mutation",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a violation blocks the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Recorded, write proceeds.
    Soft,
    /// Write rejected.
    Hard,
}

/// Review state of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStatus {
    #[default]
    Pending,
    Acknowledged,
    Resolved,
}

impl ViolationStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ViolationStatus::Pending => "pending",
            ViolationStatus::Acknowledged => "acknowledged",
            ViolationStatus::Resolved => "resolved",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ViolationStatus::Pending)
    }

    /// Allowed moves: pending → acknowledged → resolved, pending → resolved.
    pub fn can_transition_to(&self, next: ViolationStatus) -> bool {
        matches!(
            (self, next),
            (ViolationStatus::Pending, ViolationStatus::Acknowledged)
                | (ViolationStatus::Pending, ViolationStatus::Resolved)
                | (ViolationStatus::Acknowledged, ViolationStatus::Resolved)
        )
    }
}

/// A detected inconsistency between a change and established canon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: ViolationId,
    pub series_id: SeriesId,
    pub subject: SubjectRef,
    /// Attribute the rule fired on, if the rule is attribute-scoped.
    pub attribute: Option<String>,
    pub category: RuleCategory,
    pub severity: Severity,
    pub description: String,
    pub status: ViolationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Violation {
    pub fn new(
        series_id: SeriesId,
        subject: SubjectRef,
        category: RuleCategory,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ViolationId::new(),
            series_id,
            subject,
            attribute: None,
            category,
            severity,
            description: description.into(),
            status: ViolationStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn on_attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    pub fn is_hard(&self) -> bool {
        self.severity == Severity::Hard
    }
}

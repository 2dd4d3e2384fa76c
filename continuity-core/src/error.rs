//! Error types for the continuity engine.
//!
//! Uses thiserror for ergonomic error definition.

use crate::model::{EntityKind, Violation};
use std::time::Duration;

/// Errors surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or malformed input, rejected before any rule runs
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A hard continuity rule failed; nothing was persisted
    #[error("Continuity violation: {}", describe(.violations))]
    ContinuityViolation { violations: Vec<Violation> },

    /// The id does not resolve
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Timeout or transient store failure; the whole operation may be retried
    #[error("Retryable conflict after {attempts} attempt(s): {reason}")]
    ConflictRetryable { reason: String, attempts: u32 },

    /// Non-transient store failure
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Attribute values could not be encoded for comparison
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl EngineError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Only timeouts and transient store failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ConflictRetryable { .. })
    }

    /// The violations carried by a continuity rejection.
    pub fn violations(&self) -> &[Violation] {
        match self {
            EngineError::ContinuityViolation { violations } => violations,
            _ => &[],
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => EngineError::NotFound { kind, id },
            err if err.is_transient() => EngineError::ConflictRetryable {
                reason: err.to_string(),
                attempts: 1,
            },
            err => EngineError::Store(err),
        }
    }
}

fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .filter(|v| v.is_hard())
        .map(|v| format!("[{}] {}", v.category, v.description))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required field absent or blank
    #[error("{field} is required")]
    Missing { field: &'static str },

    /// Field present but unusable
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing { field } | ValidationError::Invalid { field, .. } => field,
        }
    }
}

/// Entity store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Call exceeded the configured bound
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Optimistic revision check failed
    #[error("Revision conflict on {kind} {id}: expected {expected}, found {found}")]
    Conflict {
        kind: EntityKind,
        id: String,
        expected: u64,
        found: u64,
    },

    /// Backing store temporarily unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Referenced record is missing (e.g. a parent deleted concurrently)
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// The store answered a commit with a record of another kind
    #[error("Store returned a {found} record where a {expected} was expected")]
    UnexpectedRecord { expected: EntityKind, found: EntityKind },
}

impl StoreError {
    /// Errors that may clear up if the operation is repeated.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Timeout(_) | StoreError::Conflict { .. } | StoreError::Unavailable(_)
        )
    }
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

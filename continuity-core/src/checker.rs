//! Continuity checker: the second stage of the write pipeline.
//!
//! 1. The facade describes a proposed write as a [`Change`]
//! 2. [`ContinuityChecker`] evaluates it against the lock policy and a
//!    read snapshot of the series ([`SeriesContext`])
//! 3. The resulting [`Verdict`] lists violations; any hard one rejects the
//!    whole change
//!
//! The checker never touches the store, which keeps every rule testable on
//! plain values.

use crate::model::{
    identity_key, Attribute, Book, CanonEntity, CanonLockLevel, Character, CharacterAttribute,
    CharacterStatus, LockedAttributes, RuleCategory, Severity, SubjectRef, Timeline, Violation,
    WorldElement, WorldElementAttribute,
};
use crate::id::{BookId, SeriesId};
use crate::policy::{classify, LockClass};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One attribute of a proposed write, as old and new JSON values.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange<A> {
    pub attribute: A,
    pub old: Value,
    pub new: Value,
}

impl<A: Attribute> AttributeChange<A> {
    pub fn new<O, N>(attribute: A, old: &O, new: &N) -> serde_json::Result<Self>
    where
        O: Serialize + ?Sized,
        N: Serialize + ?Sized,
    {
        Ok(Self {
            attribute,
            old: serde_json::to_value(old)?,
            new: serde_json::to_value(new)?,
        })
    }

    /// An attribute established by a creation (no prior value).
    pub fn created<N: Serialize + ?Sized>(attribute: A, new: &N) -> serde_json::Result<Self> {
        Ok(Self {
            attribute,
            old: Value::Null,
            new: serde_json::to_value(new)?,
        })
    }

    pub fn is_mutation(&self) -> bool {
        if self.attribute.is_set() {
            as_set(&self.old) != as_set(&self.new)
        } else {
            self.old != self.new
        }
    }
}

/// Members of an array value in canonical order; other values are kept as is.
fn as_set(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut members: Vec<String> = items.iter().map(Value::to_string).collect();
            members.sort();
            members.dedup();
            Value::Array(members.into_iter().map(Value::String).collect())
        }
        other => other.clone(),
    }
}

/// Push a change for `attribute` if the patch supplies a new value.
pub(crate) fn record_change<A, O, N>(
    out: &mut Vec<AttributeChange<A>>,
    attribute: A,
    old: &O,
    new: Option<&N>,
) -> serde_json::Result<()>
where
    A: Attribute,
    O: Serialize + ?Sized,
    N: Serialize + ?Sized,
{
    if let Some(new) = new {
        out.push(AttributeChange::new(attribute, old, new)?);
    }
    Ok(())
}

/// Whether a change introduces an entity or edits an established one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Update,
}

/// A proposed write to a character or world element.
#[derive(Debug, Clone)]
pub struct EntityChange<A: Attribute> {
    pub series_id: SeriesId,
    pub subject: SubjectRef,
    pub kind: ChangeKind,
    /// Lock snapshot of the entity as currently stored.
    pub lock_level: CanonLockLevel,
    pub locked: LockedAttributes<A>,
    /// Lock settings the entity carries after the write.
    pub next_lock_level: CanonLockLevel,
    pub next_locked: LockedAttributes<A>,
    pub attributes: Vec<AttributeChange<A>>,
    /// Book being written when the edit was made.
    pub book_context: Option<u32>,
}

impl<A: Attribute> EntityChange<A> {
    pub fn creation<E>(entity: &E, attributes: Vec<AttributeChange<A>>) -> Self
    where
        E: CanonEntity<Attribute = A>,
    {
        Self {
            series_id: entity.series_id(),
            subject: entity.subject(),
            kind: ChangeKind::Create,
            lock_level: entity.lock_level(),
            locked: entity.locked_attributes().clone(),
            next_lock_level: entity.lock_level(),
            next_locked: entity.locked_attributes().clone(),
            attributes,
            book_context: None,
        }
    }

    pub fn update<E>(current: &E, attributes: Vec<AttributeChange<A>>) -> Self
    where
        E: CanonEntity<Attribute = A>,
    {
        Self {
            kind: ChangeKind::Update,
            ..Self::creation(current, attributes)
        }
    }

    /// Take the post-write lock settings from `next`.
    pub fn relocked<E>(mut self, next: &E) -> Self
    where
        E: CanonEntity<Attribute = A>,
    {
        self.next_lock_level = next.lock_level();
        self.next_locked = next.locked_attributes().clone();
        self
    }

    pub fn in_book(mut self, book_number: Option<u32>) -> Self {
        self.book_context = book_number;
        self
    }

    fn context_suffix(&self) -> String {
        self.book_context
            .map(|n| format!(" (while editing book {n})"))
            .unwrap_or_default()
    }
}

/// A book's place in series order and story time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookWindow {
    pub book_id: BookId,
    pub book_number: u32,
    pub timeline: Option<Timeline>,
    pub time_skip_from_previous: Option<i64>,
}

impl From<&Book> for BookWindow {
    fn from(book: &Book) -> Self {
        Self {
            book_id: book.id,
            book_number: book.book_number,
            timeline: book.timeline(),
            time_skip_from_previous: book.time_skip_from_previous,
        }
    }
}

/// A proposed creation or move of a book.
#[derive(Debug, Clone)]
pub struct BookChange {
    pub series_id: SeriesId,
    pub kind: ChangeKind,
    /// The book as it would be after the write.
    pub window: BookWindow,
}

impl BookChange {
    pub fn new(book: &Book, kind: ChangeKind) -> Self {
        Self {
            series_id: book.series_id,
            kind,
            window: BookWindow::from(book),
        }
    }
}

/// A proposed write, routed to the rules that apply to its entity type.
#[derive(Debug, Clone)]
pub enum Change {
    Character(EntityChange<CharacterAttribute>),
    WorldElement(EntityChange<WorldElementAttribute>),
    Book(BookChange),
}

/// A name or alias already claimed by an entity in the series.
#[derive(Debug, Clone)]
struct IdentityClaim {
    subject: SubjectRef,
    display_name: String,
    keys: Vec<String>,
}

/// Read snapshot of the series, taken at evaluation time.
#[derive(Debug, Clone, Default)]
pub struct SeriesContext {
    claims: Vec<IdentityClaim>,
    books: Vec<BookWindow>,
}

impl SeriesContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_characters(mut self, characters: &[Character]) -> Self {
        self.claims.extend(characters.iter().map(claim_of));
        self
    }

    pub fn with_world_elements(mut self, elements: &[WorldElement]) -> Self {
        self.claims.extend(elements.iter().map(claim_of));
        self
    }

    pub fn with_books(mut self, books: &[Book]) -> Self {
        self.books.extend(books.iter().map(BookWindow::from));
        self
    }

    fn claim_for(&self, key: &str, exclude: SubjectRef) -> Option<&IdentityClaim> {
        self.claims
            .iter()
            .filter(|c| c.subject != exclude)
            .find(|c| c.keys.iter().any(|k| k == key))
    }
}

fn claim_of<E: CanonEntity>(entity: &E) -> IdentityClaim {
    let mut keys = vec![identity_key(entity.name())];
    keys.extend(entity.aliases().iter().map(|a| identity_key(a)));
    IdentityClaim {
        subject: entity.subject(),
        display_name: entity.name().to_string(),
        keys,
    }
}

/// Outcome of evaluating a change.
#[derive(Debug, Clone, Default)]
pub struct Verdict {
    pub violations: Vec<Violation>,
}

impl Verdict {
    /// A single hard violation rejects the whole change.
    pub fn is_rejected(&self) -> bool {
        self.violations.iter().any(Violation::is_hard)
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self, category: RuleCategory, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.category == category && v.severity == severity)
            .count()
    }
}

/// Evaluates changes against the fixed rule catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuityChecker;

impl ContinuityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a change. Rules run per attribute in fixed order: lock,
    /// identity, status regression, timeline. The first hard result stops
    /// the remaining rules for that attribute; other attributes still run.
    pub fn evaluate(&self, change: &Change, context: &SeriesContext) -> Verdict {
        let verdict = match change {
            Change::Character(change) => self.evaluate_entity(change, context),
            Change::WorldElement(change) => self.evaluate_entity(change, context),
            Change::Book(change) => self.evaluate_book(change, context),
        };
        debug!(
            violations = verdict.violations.len(),
            rejected = verdict.is_rejected(),
            "continuity check complete"
        );
        verdict
    }

    fn evaluate_entity<A: Attribute>(
        &self,
        change: &EntityChange<A>,
        context: &SeriesContext,
    ) -> Verdict {
        let mut violations = Vec::new();
        for attribute in &change.attributes {
            self.evaluate_attribute(change, attribute, context, &mut violations);
        }
        if change.kind == ChangeKind::Update {
            self.check_lock_release(change, &mut violations);
        }
        Verdict { violations }
    }

    /// Loosening the lock on an attribute is itself a soft canon change.
    fn check_lock_release<A: Attribute>(&self, change: &EntityChange<A>, out: &mut Vec<Violation>) {
        for attribute in change.locked.iter() {
            let before = classify(change.lock_level, &change.locked, attribute);
            let after = classify(change.next_lock_level, &change.next_locked, attribute);
            if !before.is_locked() || after >= before {
                continue;
            }
            let name = attribute.name();
            out.push(
                Violation::new(
                    change.series_id,
                    change.subject,
                    RuleCategory::LockedAttributeMutation,
                    Severity::Soft,
                    format!(
                        "{name} was {} canon and is now {}{}",
                        before.name(),
                        after.name(),
                        change.context_suffix()
                    ),
                )
                .on_attribute(name),
            );
        }
    }

    fn evaluate_attribute<A: Attribute>(
        &self,
        change: &EntityChange<A>,
        attribute: &AttributeChange<A>,
        context: &SeriesContext,
        out: &mut Vec<Violation>,
    ) {
        let name = attribute.attribute.name();
        let mutated = attribute.is_mutation();

        if change.kind == ChangeKind::Update && mutated {
            match classify(change.lock_level, &change.locked, attribute.attribute) {
                LockClass::HardLocked => {
                    out.push(
                        Violation::new(
                            change.series_id,
                            change.subject,
                            RuleCategory::LockedAttributeMutation,
                            Severity::Hard,
                            format!(
                                "{name} is hard-locked canon: cannot change {} to {}{}",
                                attribute.old,
                                attribute.new,
                                change.context_suffix()
                            ),
                        )
                        .on_attribute(name),
                    );
                    return;
                }
                LockClass::SoftLocked => out.push(
                    Violation::new(
                        change.series_id,
                        change.subject,
                        RuleCategory::LockedAttributeMutation,
                        Severity::Soft,
                        format!(
                            "{name} is soft-locked canon and changed from {} to {}{}",
                            attribute.old,
                            attribute.new,
                            change.context_suffix()
                        ),
                    )
                    .on_attribute(name),
                ),
                LockClass::Free => {}
            }
        }

        if attribute.attribute.is_identity() && (change.kind == ChangeKind::Create || mutated) {
            if let Some(violation) = self.check_identity(change, attribute, context) {
                out.push(violation);
                return;
            }
        }

        if attribute.attribute.is_life_status() && is_revival(&attribute.old, &attribute.new) {
            out.push(
                Violation::new(
                    change.series_id,
                    change.subject,
                    RuleCategory::StatusRegression,
                    Severity::Soft,
                    format!(
                        "character returns from the dead{}; confirm the revival is intended",
                        change.context_suffix()
                    ),
                )
                .on_attribute(name),
            );
        }
    }

    fn check_identity<A: Attribute>(
        &self,
        change: &EntityChange<A>,
        attribute: &AttributeChange<A>,
        context: &SeriesContext,
    ) -> Option<Violation> {
        names_in(&attribute.new).into_iter().find_map(|candidate| {
            let claim = context.claim_for(&identity_key(&candidate), change.subject)?;
            Some(
                Violation::new(
                    change.series_id,
                    change.subject,
                    RuleCategory::Identity,
                    Severity::Hard,
                    format!(
                        "\"{}\" is already used by {} \"{}\"",
                        candidate.trim(),
                        claim.subject.kind().name().to_lowercase(),
                        claim.display_name
                    ),
                )
                .on_attribute(attribute.attribute.name()),
            )
        })
    }

    fn evaluate_book(&self, change: &BookChange, context: &SeriesContext) -> Verdict {
        let proposed = change.window;
        let Some(_) = proposed.timeline else {
            return Verdict::default();
        };

        let mut books: Vec<BookWindow> = context
            .books
            .iter()
            .filter(|b| b.book_id != proposed.book_id)
            .copied()
            .collect();
        books.push(proposed);
        books.sort_by_key(|b| b.book_number);

        for other in books.iter().filter(|b| b.book_id != proposed.book_id) {
            let (earlier, later) = if other.book_number < proposed.book_number {
                (other, &proposed)
            } else {
                (&proposed, other)
            };
            let (Some(early), Some(late)) = (earlier.timeline, later.timeline) else {
                continue;
            };
            let allowance = if is_immediate_predecessor(&books, earlier, later) {
                later.time_skip_from_previous.unwrap_or(0).min(0)
            } else {
                0
            };
            let earliest_start = early.end.saturating_add(allowance);
            if late.start < earliest_start {
                let description = if allowance < 0 {
                    format!(
                        "book {} starts at {}, more than {} before book {} ends at {}",
                        later.book_number, late.start, -allowance, earlier.book_number, early.end
                    )
                } else {
                    format!(
                        "book {} starts at {}, before book {} ends at {}",
                        later.book_number, late.start, earlier.book_number, early.end
                    )
                };
                return Verdict {
                    violations: vec![Violation::new(
                        change.series_id,
                        SubjectRef::Book(proposed.book_id),
                        RuleCategory::TimelineOverlap,
                        Severity::Hard,
                        description,
                    )
                    .on_attribute("timelineStart")],
                };
            }
        }
        Verdict::default()
    }
}

fn is_immediate_predecessor(sorted: &[BookWindow], earlier: &BookWindow, later: &BookWindow) -> bool {
    sorted
        .iter()
        .filter(|b| b.book_number < later.book_number)
        .max_by_key(|b| b.book_number)
        .is_some_and(|b| b.book_id == earlier.book_id)
}

fn is_revival(old: &Value, new: &Value) -> bool {
    let status = |v: &Value| CharacterStatus::deserialize(v).ok();
    status(old) == Some(CharacterStatus::Deceased) && status(new) == Some(CharacterStatus::Alive)
}

fn names_in(value: &Value) -> Vec<String> {
    match value {
        Value::String(name) => vec![name.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::AuthorId;
    use crate::model::{
        CharacterPatch, ElementCategory, NewBook, NewCharacter, NewWorldElement,
        WorldElementPatch,
    };

    fn character(series_id: SeriesId, name: &str) -> Character {
        NewCharacter::new(series_id, AuthorId::new(), name).into_character()
    }

    fn update(current: &Character, patch: CharacterPatch) -> Change {
        let attributes = patch.changes(current).unwrap();
        Change::Character(EntityChange::update(current, attributes))
    }

    fn book(series_id: SeriesId, number: u32, start: i64, end: i64) -> Book {
        NewBook::new(AuthorId::new(), number, format!("Book {number}"))
            .with_timeline(start, end)
            .into_book(series_id)
    }

    #[test]
    fn test_hard_lock_rejects_and_short_circuits() {
        let series = SeriesId::new();
        let vael = NewCharacter::new(series, AuthorId::new(), "Vael")
            .with_eye_color("amber")
            .with_lock(CanonLockLevel::Hard, [CharacterAttribute::EyeColor])
            .into_character();

        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &vael,
                CharacterPatch {
                    eye_color: Some("blue".into()),
                    ..Default::default()
                },
            ),
            &SeriesContext::new(),
        );
        assert!(verdict.is_rejected());
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(
            verdict.count(RuleCategory::LockedAttributeMutation, Severity::Hard),
            1
        );
        assert_eq!(verdict.violations[0].attribute.as_deref(), Some("eyeColor"));
    }

    #[test]
    fn test_hard_lock_allows_identical_value() {
        let series = SeriesId::new();
        let vael = NewCharacter::new(series, AuthorId::new(), "Vael")
            .with_eye_color("amber")
            .with_lock(CanonLockLevel::Hard, [CharacterAttribute::EyeColor])
            .into_character();
        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &vael,
                CharacterPatch {
                    eye_color: Some("amber".into()),
                    ..Default::default()
                },
            ),
            &SeriesContext::new(),
        );
        assert!(verdict.is_clean());
    }

    #[test]
    fn test_soft_lock_flags_without_rejecting() {
        let series = SeriesId::new();
        let vael = NewCharacter::new(series, AuthorId::new(), "Vael")
            .with_eye_color("amber")
            .with_lock(CanonLockLevel::Soft, [CharacterAttribute::EyeColor])
            .into_character();
        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &vael,
                CharacterPatch {
                    eye_color: Some("blue".into()),
                    hair_color: Some("black".into()),
                    ..Default::default()
                },
            ),
            &SeriesContext::new(),
        );
        assert!(!verdict.is_rejected());
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(
            verdict.count(RuleCategory::LockedAttributeMutation, Severity::Soft),
            1
        );
    }

    #[test]
    fn test_lock_ignored_on_creation() {
        let series = SeriesId::new();
        let vael = NewCharacter::new(series, AuthorId::new(), "Vael")
            .with_lock(CanonLockLevel::Hard, [CharacterAttribute::Name])
            .into_character();
        let change = Change::Character(EntityChange::creation(
            &vael,
            vael.creation_changes().unwrap(),
        ));
        assert!(ContinuityChecker::new()
            .evaluate(&change, &SeriesContext::new())
            .is_clean());
    }

    #[test]
    fn test_identity_collision_is_case_insensitive() {
        let series = SeriesId::new();
        let existing = character(series, "Vael");
        let newcomer = character(series, "VAEL");
        let context = SeriesContext::new().with_characters(&[existing]);
        let change = Change::Character(EntityChange::creation(
            &newcomer,
            newcomer.creation_changes().unwrap(),
        ));
        let verdict = ContinuityChecker::new().evaluate(&change, &context);
        assert!(verdict.is_rejected());
        assert_eq!(verdict.count(RuleCategory::Identity, Severity::Hard), 1);
    }

    #[test]
    fn test_alias_collides_with_world_element() {
        let series = SeriesId::new();
        let gate = NewWorldElement::new(series, AuthorId::new(), "Dusk Gate", ElementCategory::Location)
            .with_alias("The Black Ring")
            .into_world_element();
        let vael = character(series, "Vael");
        let context = SeriesContext::new()
            .with_characters(std::slice::from_ref(&vael))
            .with_world_elements(&[gate]);

        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &vael,
                CharacterPatch {
                    aliases: Some(vec!["the black ring".into()]),
                    ..Default::default()
                },
            ),
            &context,
        );
        assert!(verdict.is_rejected());
        assert!(verdict.violations[0].description.contains("Dusk Gate"));
    }

    #[test]
    fn test_identity_ignores_own_claim() {
        let series = SeriesId::new();
        let vael = character(series, "Vael");
        let context = SeriesContext::new().with_characters(std::slice::from_ref(&vael));
        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &vael,
                CharacterPatch {
                    name: Some("vael".into()),
                    ..Default::default()
                },
            ),
            &context,
        );
        assert!(verdict.is_clean());
    }

    #[test]
    fn test_identity_rejects_regardless_of_soft_lock() {
        let series = SeriesId::new();
        let other = character(series, "Elira");
        let vael = NewCharacter::new(series, AuthorId::new(), "Vael")
            .with_lock(CanonLockLevel::Soft, [CharacterAttribute::Name])
            .into_character();
        let context = SeriesContext::new().with_characters(&[other]);
        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &vael,
                CharacterPatch {
                    name: Some("Elira".into()),
                    ..Default::default()
                },
            ),
            &context,
        );
        assert!(verdict.is_rejected());
        assert_eq!(
            verdict.count(RuleCategory::LockedAttributeMutation, Severity::Soft),
            1
        );
        assert_eq!(verdict.count(RuleCategory::Identity, Severity::Hard), 1);
    }

    #[test]
    fn test_revival_is_flagged_once() {
        let series = SeriesId::new();
        let fallen = NewCharacter::new(series, AuthorId::new(), "Orren")
            .with_status(CharacterStatus::Deceased)
            .into_character();
        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &fallen,
                CharacterPatch {
                    current_status: Some(CharacterStatus::Alive),
                    ..Default::default()
                },
            ),
            &SeriesContext::new(),
        );
        assert!(!verdict.is_rejected());
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.count(RuleCategory::StatusRegression, Severity::Soft), 1);
    }

    #[test]
    fn test_other_status_moves_are_not_regressions() {
        let series = SeriesId::new();
        let fallen = NewCharacter::new(series, AuthorId::new(), "Orren")
            .with_status(CharacterStatus::Deceased)
            .into_character();
        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &fallen,
                CharacterPatch {
                    current_status: Some(CharacterStatus::Transformed),
                    ..Default::default()
                },
            ),
            &SeriesContext::new(),
        );
        assert!(verdict.is_clean());
    }

    #[test]
    fn test_hard_locked_status_blocks_revival() {
        let series = SeriesId::new();
        let fallen = NewCharacter::new(series, AuthorId::new(), "Orren")
            .with_status(CharacterStatus::Deceased)
            .with_lock(CanonLockLevel::Hard, [CharacterAttribute::CurrentStatus])
            .into_character();
        let verdict = ContinuityChecker::new().evaluate(
            &update(
                &fallen,
                CharacterPatch {
                    current_status: Some(CharacterStatus::Alive),
                    ..Default::default()
                },
            ),
            &SeriesContext::new(),
        );
        assert!(verdict.is_rejected());
        assert_eq!(verdict.count(RuleCategory::StatusRegression, Severity::Soft), 0);
    }

    #[test]
    fn test_world_element_soft_lock() {
        let series = SeriesId::new();
        let gate = NewWorldElement::new(series, AuthorId::new(), "Dusk Gate", ElementCategory::Location)
            .with_rule("opens only at dusk")
            .with_lock(CanonLockLevel::Soft, [WorldElementAttribute::Rules])
            .into_world_element();
        let patch = WorldElementPatch {
            rules: Some(vec!["opens at dawn".into()]),
            ..Default::default()
        };
        let change = Change::WorldElement(EntityChange::update(&gate, patch.changes(&gate).unwrap()));
        let verdict = ContinuityChecker::new().evaluate(&change, &SeriesContext::new());
        assert!(!verdict.is_rejected());
        assert_eq!(
            verdict.count(RuleCategory::LockedAttributeMutation, Severity::Soft),
            1
        );
    }

    #[test]
    fn test_timeline_overlap_rejected() {
        let series = SeriesId::new();
        let first = book(series, 1, 0, 100);
        let second = book(series, 2, 50, 150);
        let context = SeriesContext::new().with_books(&[first]);
        let verdict = ContinuityChecker::new()
            .evaluate(&Change::Book(BookChange::new(&second, ChangeKind::Create)), &context);
        assert!(verdict.is_rejected());
        assert_eq!(verdict.count(RuleCategory::TimelineOverlap, Severity::Hard), 1);
    }

    #[test]
    fn test_touching_timelines_allowed() {
        let series = SeriesId::new();
        let first = book(series, 1, 0, 100);
        let second = book(series, 2, 100, 200);
        let context = SeriesContext::new().with_books(&[first]);
        let verdict = ContinuityChecker::new()
            .evaluate(&Change::Book(BookChange::new(&second, ChangeKind::Create)), &context);
        assert!(verdict.is_clean());
    }

    #[test]
    fn test_negative_skip_permits_overlap_with_predecessor() {
        let series = SeriesId::new();
        let first = book(series, 1, 0, 100);
        let mut second = book(series, 2, 80, 150);
        second.time_skip_from_previous = Some(-20);
        let context = SeriesContext::new().with_books(&[first]);
        let verdict = ContinuityChecker::new()
            .evaluate(&Change::Book(BookChange::new(&second, ChangeKind::Create)), &context);
        assert!(verdict.is_clean());

        second.timeline_start = Some(70);
        let verdict = ContinuityChecker::new()
            .evaluate(&Change::Book(BookChange::new(&second, ChangeKind::Create)), &context);
        assert!(verdict.is_rejected());
    }

    #[test]
    fn test_positive_skip_does_not_permit_overlap() {
        let series = SeriesId::new();
        let first = book(series, 1, 0, 100);
        let mut second = book(series, 2, 90, 150);
        second.time_skip_from_previous = Some(30);
        let context = SeriesContext::new().with_books(&[first]);
        let verdict = ContinuityChecker::new()
            .evaluate(&Change::Book(BookChange::new(&second, ChangeKind::Create)), &context);
        assert!(verdict.is_rejected());
    }

    #[test]
    fn test_inserted_book_checked_against_successor() {
        let series = SeriesId::new();
        let first = book(series, 1, 0, 100);
        let third = book(series, 3, 200, 300);
        let second = book(series, 2, 100, 250);
        let context = SeriesContext::new().with_books(&[first, third]);
        let verdict = ContinuityChecker::new()
            .evaluate(&Change::Book(BookChange::new(&second, ChangeKind::Create)), &context);
        assert!(verdict.is_rejected());
        assert!(verdict.violations[0].description.contains("book 3"));
    }

    #[test]
    fn test_books_without_timeline_skip_rule() {
        let series = SeriesId::new();
        let first = book(series, 1, 0, 100);
        let second = NewBook::new(AuthorId::new(), 2, "Untimed").into_book(series);
        let context = SeriesContext::new().with_books(&[first]);
        let verdict = ContinuityChecker::new()
            .evaluate(&Change::Book(BookChange::new(&second, ChangeKind::Create)), &context);
        assert!(verdict.is_clean());
    }

    #[test]
    fn test_set_attributes_ignore_order() {
        let reordered = AttributeChange::new(
            CharacterAttribute::Aliases,
            &["Ember", "Knight"],
            &["Knight", "Ember"],
        )
        .unwrap();
        assert!(!reordered.is_mutation());

        let grown = AttributeChange::new(
            CharacterAttribute::Aliases,
            &["Ember"],
            &["Knight", "Ember"],
        )
        .unwrap();
        assert!(grown.is_mutation());

        // Rules are an ordered list.
        let rules = AttributeChange::new(
            WorldElementAttribute::Rules,
            &["opens at dusk", "closes at dawn"],
            &["closes at dawn", "opens at dusk"],
        )
        .unwrap();
        assert!(rules.is_mutation());
    }

    #[test]
    fn test_lock_release_is_soft_per_attribute() {
        let series = SeriesId::new();
        let vael = NewCharacter::new(series, AuthorId::new(), "Vael")
            .with_eye_color("amber")
            .with_lock(
                CanonLockLevel::Hard,
                [CharacterAttribute::EyeColor, CharacterAttribute::Height],
            )
            .into_character();
        let patch = CharacterPatch {
            canon_lock_level: Some(CanonLockLevel::None),
            ..Default::default()
        };
        let attributes = patch.changes(&vael).unwrap();
        let mut next = vael.clone();
        next.apply(patch);

        let verdict = ContinuityChecker::new().evaluate(
            &Change::Character(EntityChange::update(&vael, attributes).relocked(&next)),
            &SeriesContext::new(),
        );
        assert!(!verdict.is_rejected());
        assert_eq!(
            verdict.count(RuleCategory::LockedAttributeMutation, Severity::Soft),
            2
        );
    }

    #[test]
    fn test_creation_never_reports_lock_release() {
        let series = SeriesId::new();
        let vael = NewCharacter::new(series, AuthorId::new(), "Vael")
            .with_lock(CanonLockLevel::Hard, [CharacterAttribute::EyeColor])
            .into_character();
        let unlocked = NewCharacter::new(series, AuthorId::new(), "Vael").into_character();
        let change = EntityChange::creation(&vael, vael.creation_changes().unwrap())
            .relocked(&unlocked);
        let verdict =
            ContinuityChecker::new().evaluate(&Change::Character(change), &SeriesContext::new());
        assert!(verdict.is_clean());
    }
}

//! Series aggregator: read-only health overview of a series.

use crate::model::{
    Book, CanonEntity, Character, ContinuityNote, Series, Violation, WorldElement,
};
use serde::{Deserialize, Serialize};

/// Everything a series owns, as loaded from the store in one pass.
#[derive(Debug, Clone)]
pub struct SeriesContents {
    pub series: Series,
    pub books: Vec<Book>,
    pub characters: Vec<Character>,
    pub world_elements: Vec<WorldElement>,
    pub notes: Vec<ContinuityNote>,
    pub violations: Vec<Violation>,
}

impl SeriesContents {
    fn active_arc_count(&self) -> usize {
        let characters = self.characters.iter().filter(|c| c.has_active_arc()).count();
        let elements = self
            .world_elements
            .iter()
            .filter(|e| e.has_active_arc())
            .count();
        characters + elements
    }

    fn total_word_count(&self) -> u64 {
        self.books.iter().map(|b| b.word_count).sum()
    }

    fn pending_violations(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.status.is_pending())
            .count()
    }
}

/// Full overview of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesOverview {
    #[serde(flatten)]
    pub series: Series,
    /// Ordered by book number.
    pub books: Vec<Book>,
    pub character_count: usize,
    pub world_element_count: usize,
    /// Characters and world elements with a non-terminal arc.
    pub active_arc_count: usize,
    pub total_word_count: u64,
    pub continuity_notes: Vec<ContinuityNote>,
    pub pending_violations: usize,
}

/// Compact per-series figures for author listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    #[serde(flatten)]
    pub series: Series,
    pub book_count: usize,
    pub character_count: usize,
    pub world_element_count: usize,
    pub total_word_count: u64,
    pub pending_violations: usize,
}

/// Computes overviews. Never mutates anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesAggregator;

impl SeriesAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn overview(&self, contents: SeriesContents) -> SeriesOverview {
        let character_count = contents.characters.len();
        let world_element_count = contents.world_elements.len();
        let active_arc_count = contents.active_arc_count();
        let total_word_count = contents.total_word_count();
        let pending_violations = contents.pending_violations();

        let SeriesContents {
            series,
            mut books,
            notes,
            ..
        } = contents;
        books.sort_by_key(|b| b.book_number);

        SeriesOverview {
            series,
            books,
            character_count,
            world_element_count,
            active_arc_count,
            total_word_count,
            continuity_notes: notes,
            pending_violations,
        }
    }

    pub fn summary(&self, contents: SeriesContents) -> SeriesSummary {
        SeriesSummary {
            book_count: contents.books.len(),
            character_count: contents.characters.len(),
            world_element_count: contents.world_elements.len(),
            total_word_count: contents.total_word_count(),
            pending_violations: contents.pending_violations(),
            series: contents.series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::AuthorId;
    use crate::model::{
        ArcStatus, ElementCategory, NewBook, NewCharacter, NewNote, NewSeries, NewWorldElement,
        RuleCategory, Severity, SubjectRef, ViolationStatus,
    };

    fn contents() -> SeriesContents {
        let author = AuthorId::new();
        let series = NewSeries::new(author, "Embercrest", "fantasy", 3).into_series();
        let id = series.id;
        let mut resolved = Violation::new(
            id,
            SubjectRef::Series(id),
            RuleCategory::StatusRegression,
            Severity::Soft,
            "revived",
        );
        resolved.status = ViolationStatus::Resolved;

        SeriesContents {
            books: vec![
                NewBook::new(author, 2, "Emberfall")
                    .with_word_count(80_000)
                    .into_book(id),
                NewBook::new(author, 1, "Ashborn")
                    .with_word_count(95_000)
                    .into_book(id),
            ],
            characters: vec![
                NewCharacter::new(id, author, "Vael")
                    .with_arc(ArcStatus::Active)
                    .into_character(),
                NewCharacter::new(id, author, "Orren")
                    .with_arc(ArcStatus::Resolved)
                    .into_character(),
                NewCharacter::new(id, author, "Elira").into_character(),
            ],
            world_elements: vec![NewWorldElement::new(
                id,
                author,
                "Dusk Gate",
                ElementCategory::Location,
            )
            .with_arc(ArcStatus::Climax)
            .into_world_element()],
            notes: vec![NewNote::new(author, "Vael's scar is on the left hand").into_note(id)],
            violations: vec![
                Violation::new(
                    id,
                    SubjectRef::Series(id),
                    RuleCategory::LockedAttributeMutation,
                    Severity::Soft,
                    "eye color changed",
                ),
                resolved,
            ],
            series,
        }
    }

    #[test]
    fn test_overview_counts() {
        let overview = SeriesAggregator::new().overview(contents());
        assert_eq!(overview.character_count, 3);
        assert_eq!(overview.world_element_count, 1);
        assert_eq!(overview.active_arc_count, 2);
        assert_eq!(overview.total_word_count, 175_000);
        assert_eq!(overview.pending_violations, 1);
        assert_eq!(overview.continuity_notes.len(), 1);
        let numbers: Vec<u32> = overview.books.iter().map(|b| b.book_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_overview_wire_shape_is_flat() {
        let overview = SeriesAggregator::new().overview(contents());
        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["title"], "Embercrest");
        assert_eq!(json["characterCount"], 3);
        assert_eq!(json["pendingViolations"], 1);
    }

    #[test]
    fn test_summary() {
        let summary = SeriesAggregator::new().summary(contents());
        assert_eq!(summary.book_count, 2);
        assert_eq!(summary.total_word_count, 175_000);
        assert_eq!(summary.pending_violations, 1);
    }
}

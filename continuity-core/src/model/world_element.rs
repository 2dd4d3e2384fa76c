//! World elements: named facts about the story world.

use super::lock::{Attribute, CanonLockLevel, LockedAttributes};
use super::{normalize_aliases, require_text, ArcStatus, CanonEntity, SubjectRef};
use crate::checker::{record_change, AttributeChange};
use crate::error::ValidationError;
use crate::id::{AuthorId, SeriesId, WorldElementId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of world fact an element records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    Location,
    Artifact,
    MagicRule,
    Faction,
    Creature,
    Event,
    #[default]
    Other,
}

/// Attributes of a world element the continuity checker tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorldElementAttribute {
    Name,
    Aliases,
    Category,
    Description,
    Rules,
    FirstAppearsBook,
    ArcStatus,
}

impl Attribute for WorldElementAttribute {
    fn name(&self) -> &'static str {
        match self {
            WorldElementAttribute::Name => "name",
            WorldElementAttribute::Aliases => "aliases",
            WorldElementAttribute::Category => "category",
            WorldElementAttribute::Description => "description",
            WorldElementAttribute::Rules => "rules",
            WorldElementAttribute::FirstAppearsBook => "firstAppearsBook",
            WorldElementAttribute::ArcStatus => "arcStatus",
        }
    }

    fn is_identity(&self) -> bool {
        matches!(self, WorldElementAttribute::Name | WorldElementAttribute::Aliases)
    }

    fn is_set(&self) -> bool {
        matches!(self, WorldElementAttribute::Aliases)
    }
}

/// A location, artifact, rule of magic, faction or similar world fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldElement {
    pub id: WorldElementId,
    pub series_id: SeriesId,
    pub author_id: AuthorId,
    pub name: String,
    pub aliases: Vec<String>,
    pub category: ElementCategory,
    pub description: Option<String>,
    /// Canon rules the element obeys ("the gate opens only at dusk").
    pub rules: Vec<String>,
    pub first_appears_book: Option<u32>,
    pub arc_status: Option<ArcStatus>,
    pub canon_lock_level: CanonLockLevel,
    pub locked_attributes: LockedAttributes<WorldElementAttribute>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl WorldElement {
    pub fn creation_changes(
        &self,
    ) -> serde_json::Result<Vec<AttributeChange<WorldElementAttribute>>> {
        Ok(vec![
            AttributeChange::created(WorldElementAttribute::Name, &self.name)?,
            AttributeChange::created(WorldElementAttribute::Aliases, &self.aliases)?,
        ])
    }

    pub fn apply(&mut self, patch: WorldElementPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(aliases) = patch.aliases {
            self.aliases = aliases;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(rules) = patch.rules {
            self.rules = rules;
        }
        if let Some(book) = patch.first_appears_book {
            self.first_appears_book = Some(book);
        }
        if let Some(arc) = patch.arc_status {
            self.arc_status = Some(arc);
        }
        if let Some(level) = patch.canon_lock_level {
            self.canon_lock_level = level;
        }
        if let Some(locked) = patch.locked_attributes {
            self.locked_attributes = locked;
        }
        self.updated_at = Utc::now();
    }
}

impl CanonEntity for WorldElement {
    type Attribute = WorldElementAttribute;

    fn subject(&self) -> SubjectRef {
        SubjectRef::WorldElement(self.id)
    }

    fn series_id(&self) -> SeriesId {
        self.series_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn lock_level(&self) -> CanonLockLevel {
        self.canon_lock_level
    }

    fn locked_attributes(&self) -> &LockedAttributes<WorldElementAttribute> {
        &self.locked_attributes
    }

    fn first_appears_book(&self) -> Option<u32> {
        self.first_appears_book
    }

    fn arc_status(&self) -> Option<ArcStatus> {
        self.arc_status
    }
}

/// Request to create a world element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorldElement {
    pub series_id: SeriesId,
    pub author_id: AuthorId,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub category: ElementCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub first_appears_book: Option<u32>,
    #[serde(default)]
    pub arc_status: Option<ArcStatus>,
    #[serde(default)]
    pub canon_lock_level: CanonLockLevel,
    #[serde(default)]
    pub locked_attributes: LockedAttributes<WorldElementAttribute>,
    #[serde(default)]
    pub book_context: Option<u32>,
}

impl NewWorldElement {
    pub fn new(
        series_id: SeriesId,
        author_id: AuthorId,
        name: impl Into<String>,
        category: ElementCategory,
    ) -> Self {
        Self {
            series_id,
            author_id,
            name: name.into(),
            aliases: Vec::new(),
            category,
            description: None,
            rules: Vec::new(),
            first_appears_book: None,
            arc_status: None,
            canon_lock_level: CanonLockLevel::None,
            locked_attributes: LockedAttributes::new(),
            book_context: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(rule.into());
        self
    }

    pub fn with_arc(mut self, arc: ArcStatus) -> Self {
        self.arc_status = Some(arc);
        self
    }

    pub fn with_lock(
        mut self,
        level: CanonLockLevel,
        attributes: impl IntoIterator<Item = WorldElementAttribute>,
    ) -> Self {
        self.canon_lock_level = level;
        self.locked_attributes = attributes.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)
    }

    pub fn into_world_element(self) -> WorldElement {
        let now = Utc::now();
        let name = self.name.trim().to_string();
        let aliases = normalize_aliases(&name, &self.aliases);
        WorldElement {
            id: WorldElementId::new(),
            series_id: self.series_id,
            author_id: self.author_id,
            name,
            aliases,
            category: self.category,
            description: self.description,
            rules: self.rules,
            first_appears_book: self.first_appears_book,
            arc_status: self.arc_status,
            canon_lock_level: self.canon_lock_level,
            locked_attributes: self.locked_attributes,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }
}

/// Partial update of a world element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldElementPatch {
    pub name: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub category: Option<ElementCategory>,
    pub description: Option<String>,
    pub rules: Option<Vec<String>>,
    pub first_appears_book: Option<u32>,
    pub arc_status: Option<ArcStatus>,
    pub canon_lock_level: Option<CanonLockLevel>,
    pub locked_attributes: Option<LockedAttributes<WorldElementAttribute>>,
    pub book_context: Option<u32>,
}

impl WorldElementPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        Ok(())
    }

    pub fn normalize(&mut self, current: &WorldElement) {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
        }
        let name = self.name.as_deref().unwrap_or(&current.name);
        if let Some(aliases) = &self.aliases {
            self.aliases = Some(normalize_aliases(name, aliases));
        } else if self.name.is_some() {
            let kept = normalize_aliases(name, &current.aliases);
            if kept != current.aliases {
                self.aliases = Some(kept);
            }
        }
    }

    pub fn changes(
        &self,
        current: &WorldElement,
    ) -> serde_json::Result<Vec<AttributeChange<WorldElementAttribute>>> {
        use WorldElementAttribute as A;
        let mut out = Vec::new();
        record_change(&mut out, A::Name, &current.name, self.name.as_ref())?;
        record_change(&mut out, A::Aliases, &current.aliases, self.aliases.as_ref())?;
        record_change(&mut out, A::Category, &current.category, self.category.as_ref())?;
        record_change(&mut out, A::Description, &current.description, self.description.as_ref())?;
        record_change(&mut out, A::Rules, &current.rules, self.rules.as_ref())?;
        record_change(
            &mut out,
            A::FirstAppearsBook,
            &current.first_appears_book,
            self.first_appears_book.as_ref(),
        )?;
        record_change(&mut out, A::ArcStatus, &current.arc_status, self.arc_status.as_ref())?;
        Ok(out)
    }
}

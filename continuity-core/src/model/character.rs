//! Characters: series-scoped, persist across books.

use super::lock::{Attribute, CanonLockLevel, LockedAttributes};
use super::{normalize_aliases, require_text, ArcStatus, CanonEntity, SubjectRef};
use crate::checker::{record_change, AttributeChange};
use crate::error::ValidationError;
use crate::id::{AuthorId, CharacterId, SeriesId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Narrative role of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterRole {
    Protagonist,
    Antagonist,
    #[default]
    Supporting,
    Minor,
}

/// Life status of a character at the latest point of the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterStatus {
    #[default]
    Alive,
    Deceased,
    Missing,
    Unknown,
    Transformed,
}

/// Attributes of a character the continuity checker tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CharacterAttribute {
    Name,
    Aliases,
    Title,
    Role,
    CurrentStatus,
    FirstAppearsBook,
    Personality,
    Backstory,
    EyeColor,
    HairColor,
    Height,
    Build,
    DistinguishingMarks,
    DialogueStyle,
    ArcStatus,
}

impl Attribute for CharacterAttribute {
    fn name(&self) -> &'static str {
        match self {
            CharacterAttribute::Name => "name",
            CharacterAttribute::Aliases => "aliases",
            CharacterAttribute::Title => "title",
            CharacterAttribute::Role => "role",
            CharacterAttribute::CurrentStatus => "currentStatus",
            CharacterAttribute::FirstAppearsBook => "firstAppearsBook",
            CharacterAttribute::Personality => "personality",
            CharacterAttribute::Backstory => "backstory",
            CharacterAttribute::EyeColor => "eyeColor",
            CharacterAttribute::HairColor => "hairColor",
            CharacterAttribute::Height => "height",
            CharacterAttribute::Build => "build",
            CharacterAttribute::DistinguishingMarks => "distinguishingMarks",
            CharacterAttribute::DialogueStyle => "dialogueStyle",
            CharacterAttribute::ArcStatus => "arcStatus",
        }
    }

    fn is_identity(&self) -> bool {
        matches!(self, CharacterAttribute::Name | CharacterAttribute::Aliases)
    }

    fn is_life_status(&self) -> bool {
        matches!(self, CharacterAttribute::CurrentStatus)
    }

    fn is_set(&self) -> bool {
        matches!(
            self,
            CharacterAttribute::Aliases | CharacterAttribute::DistinguishingMarks
        )
    }
}

/// Inner life of a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Personality {
    pub core_traits: Vec<String>,
    pub motivations: Vec<String>,
    pub fears: Vec<String>,
    pub flaws: Vec<String>,
}

/// Outward appearance of a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicalDescription {
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub height: Option<String>,
    pub build: Option<String>,
    pub distinguishing_marks: Vec<String>,
}

/// A character in a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub series_id: SeriesId,
    pub author_id: AuthorId,
    pub name: String,
    pub aliases: Vec<String>,
    pub title: Option<String>,
    pub role: CharacterRole,
    pub current_status: CharacterStatus,
    pub first_appears_book: Option<u32>,
    pub personality: Personality,
    pub backstory: Option<String>,
    pub physical_description: PhysicalDescription,
    pub dialogue_style: Option<String>,
    pub arc_status: Option<ArcStatus>,
    pub canon_lock_level: CanonLockLevel,
    pub locked_attributes: LockedAttributes<CharacterAttribute>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl Character {
    /// Identity attributes as they appear to the checker on creation.
    pub fn creation_changes(&self) -> serde_json::Result<Vec<AttributeChange<CharacterAttribute>>> {
        Ok(vec![
            AttributeChange::created(CharacterAttribute::Name, &self.name)?,
            AttributeChange::created(CharacterAttribute::Aliases, &self.aliases)?,
        ])
    }

    pub fn apply(&mut self, patch: CharacterPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(aliases) = patch.aliases {
            self.aliases = aliases;
        }
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(status) = patch.current_status {
            self.current_status = status;
        }
        if let Some(book) = patch.first_appears_book {
            self.first_appears_book = Some(book);
        }
        if let Some(personality) = patch.personality {
            self.personality = personality;
        }
        if let Some(backstory) = patch.backstory {
            self.backstory = Some(backstory);
        }
        let body = &mut self.physical_description;
        if let Some(eyes) = patch.eye_color {
            body.eye_color = Some(eyes);
        }
        if let Some(hair) = patch.hair_color {
            body.hair_color = Some(hair);
        }
        if let Some(height) = patch.height {
            body.height = Some(height);
        }
        if let Some(build) = patch.build {
            body.build = Some(build);
        }
        if let Some(marks) = patch.distinguishing_marks {
            body.distinguishing_marks = marks;
        }
        if let Some(style) = patch.dialogue_style {
            self.dialogue_style = Some(style);
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

impl CanonEntity for Character {
    type Attribute = CharacterAttribute;

    fn subject(&self) -> SubjectRef {
        SubjectRef::Character(self.id)
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

    fn locked_attributes(&self) -> &LockedAttributes<CharacterAttribute> {
        &self.locked_attributes
    }

    fn first_appears_book(&self) -> Option<u32> {
        self.first_appears_book
    }

    fn arc_status(&self) -> Option<ArcStatus> {
        self.arc_status
    }
}

/// Request to create a character.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCharacter {
    pub series_id: SeriesId,
    pub author_id: AuthorId,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "characterRole")]
    pub role: CharacterRole,
    #[serde(default)]
    pub current_status: CharacterStatus,
    #[serde(default)]
    pub first_appears_book: Option<u32>,
    #[serde(default, alias = "corePersonality")]
    pub personality: Personality,
    #[serde(default)]
    pub backstory: Option<String>,
    #[serde(default)]
    pub physical_description: PhysicalDescription,
    #[serde(default)]
    pub dialogue_style: Option<String>,
    #[serde(default)]
    pub arc_status: Option<ArcStatus>,
    #[serde(default)]
    pub canon_lock_level: CanonLockLevel,
    #[serde(default)]
    pub locked_attributes: LockedAttributes<CharacterAttribute>,
    /// Book being written when the character is introduced.
    #[serde(default)]
    pub book_context: Option<u32>,
}

impl NewCharacter {
    pub fn new(series_id: SeriesId, author_id: AuthorId, name: impl Into<String>) -> Self {
        Self {
            series_id,
            author_id,
            name: name.into(),
            aliases: Vec::new(),
            title: None,
            role: CharacterRole::default(),
            current_status: CharacterStatus::default(),
            first_appears_book: None,
            personality: Personality::default(),
            backstory: None,
            physical_description: PhysicalDescription::default(),
            dialogue_style: None,
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

    pub fn with_role(mut self, role: CharacterRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_status(mut self, status: CharacterStatus) -> Self {
        self.current_status = status;
        self
    }

    pub fn with_eye_color(mut self, color: impl Into<String>) -> Self {
        self.physical_description.eye_color = Some(color.into());
        self
    }

    pub fn with_hair_color(mut self, color: impl Into<String>) -> Self {
        self.physical_description.hair_color = Some(color.into());
        self
    }

    pub fn with_first_appearance(mut self, book_number: u32) -> Self {
        self.first_appears_book = Some(book_number);
        self
    }

    pub fn with_arc(mut self, arc: ArcStatus) -> Self {
        self.arc_status = Some(arc);
        self
    }

    /// Set the lock level and the attributes it governs.
    pub fn with_lock(
        mut self,
        level: CanonLockLevel,
        attributes: impl IntoIterator<Item = CharacterAttribute>,
    ) -> Self {
        self.canon_lock_level = level;
        self.locked_attributes = attributes.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)
    }

    pub fn into_character(self) -> Character {
        let now = Utc::now();
        let name = self.name.trim().to_string();
        let aliases = normalize_aliases(&name, &self.aliases);
        Character {
            id: CharacterId::new(),
            series_id: self.series_id,
            author_id: self.author_id,
            name,
            aliases,
            title: self.title,
            role: self.role,
            current_status: self.current_status,
            first_appears_book: self.first_appears_book,
            personality: self.personality,
            backstory: self.backstory,
            physical_description: self.physical_description,
            dialogue_style: self.dialogue_style,
            arc_status: self.arc_status,
            canon_lock_level: self.canon_lock_level,
            locked_attributes: self.locked_attributes,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }
}

/// Partial update of a character.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterPatch {
    pub name: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub title: Option<String>,
    #[serde(alias = "characterRole")]
    pub role: Option<CharacterRole>,
    pub current_status: Option<CharacterStatus>,
    pub first_appears_book: Option<u32>,
    pub personality: Option<Personality>,
    pub backstory: Option<String>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub height: Option<String>,
    pub build: Option<String>,
    pub distinguishing_marks: Option<Vec<String>>,
    pub dialogue_style: Option<String>,
    pub arc_status: Option<ArcStatus>,
    pub canon_lock_level: Option<CanonLockLevel>,
    pub locked_attributes: Option<LockedAttributes<CharacterAttribute>>,
    /// Book being written when the edit is made.
    pub book_context: Option<u32>,
}

impl CharacterPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        Ok(())
    }

    /// Trim the new name and normalize aliases against the final name.
    pub fn normalize(&mut self, current: &Character) {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
        }
        let name = self.name.as_deref().unwrap_or(&current.name);
        if let Some(aliases) = &self.aliases {
            self.aliases = Some(normalize_aliases(name, aliases));
        } else if self.name.is_some() {
            // A rename can collide with an existing alias of the same entity.
            let kept = normalize_aliases(name, &current.aliases);
            if kept != current.aliases {
                self.aliases = Some(kept);
            }
        }
    }

    /// Attribute-level differences between the patch and the stored character.
    pub fn changes(
        &self,
        current: &Character,
    ) -> serde_json::Result<Vec<AttributeChange<CharacterAttribute>>> {
        use CharacterAttribute as A;
        let body = &current.physical_description;
        let mut out = Vec::new();
        record_change(&mut out, A::Name, &current.name, self.name.as_ref())?;
        record_change(&mut out, A::Aliases, &current.aliases, self.aliases.as_ref())?;
        record_change(&mut out, A::Title, &current.title, self.title.as_ref())?;
        record_change(&mut out, A::Role, &current.role, self.role.as_ref())?;
        record_change(
            &mut out,
            A::CurrentStatus,
            &current.current_status,
            self.current_status.as_ref(),
        )?;
        record_change(
            &mut out,
            A::FirstAppearsBook,
            &current.first_appears_book,
            self.first_appears_book.as_ref(),
        )?;
        record_change(&mut out, A::Personality, &current.personality, self.personality.as_ref())?;
        record_change(&mut out, A::Backstory, &current.backstory, self.backstory.as_ref())?;
        record_change(&mut out, A::EyeColor, &body.eye_color, self.eye_color.as_ref())?;
        record_change(&mut out, A::HairColor, &body.hair_color, self.hair_color.as_ref())?;
        record_change(&mut out, A::Height, &body.height, self.height.as_ref())?;
        record_change(&mut out, A::Build, &body.build, self.build.as_ref())?;
        record_change(
            &mut out,
            A::DistinguishingMarks,
            &body.distinguishing_marks,
            self.distinguishing_marks.as_ref(),
        )?;
        record_change(
            &mut out,
            A::DialogueStyle,
            &current.dialogue_style,
            self.dialogue_style.as_ref(),
        )?;
        record_change(&mut out, A::ArcStatus, &current.arc_status, self.arc_status.as_ref())?;
        Ok(out)
    }
}

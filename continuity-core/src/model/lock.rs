//! Canon lock levels and typed sets of lockable attributes.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

/// How freely an entity's established attributes may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonLockLevel {
    /// Attributes change freely.
    #[default]
    None,
    /// Locked attributes may change, but each change is flagged.
    Soft,
    /// Locked attributes may not change.
    Hard,
}

/// A named field of an entity that the continuity checker knows about.
///
/// Implemented by closed per-entity enums so lock lists are checked at
/// compile time. Unknown names on the wire are dropped, since the policy
/// would classify them as free anyway.
pub trait Attribute: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Wire name of the attribute (camelCase).
    fn name(&self) -> &'static str;

    /// Whether this attribute carries the entity's name or aliases.
    fn is_identity(&self) -> bool {
        false
    }

    /// Whether this attribute is the life status of a character.
    fn is_life_status(&self) -> bool {
        false
    }

    /// Whether the attribute holds a set, so reordering is not a change.
    fn is_set(&self) -> bool {
        false
    }
}

/// Set of attributes subject to an entity's lock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LockedAttributes<A: Ord>(BTreeSet<A>);

#[derive(Deserialize)]
#[serde(untagged)]
enum LockEntry<A> {
    Known(A),
    Unknown(serde_json::Value),
}

impl<'de, A> Deserialize<'de> for LockedAttributes<A>
where
    A: Attribute + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<LockEntry<A>>::deserialize(deserializer)?;
        let mut set = BTreeSet::new();
        for entry in entries {
            match entry {
                LockEntry::Known(attribute) => {
                    set.insert(attribute);
                }
                LockEntry::Unknown(name) => {
                    tracing::warn!(attribute = %name, "ignoring unknown locked attribute");
                }
            }
        }
        Ok(Self(set))
    }
}

impl<A: Ord> Default for LockedAttributes<A> {
    fn default() -> Self {
        Self(BTreeSet::new())
    }
}

impl<A: Attribute> LockedAttributes<A> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute to the set.
    pub fn with(mut self, attribute: A) -> Self {
        self.0.insert(attribute);
        self
    }

    pub fn contains(&self, attribute: A) -> bool {
        self.0.contains(&attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = A> + '_ {
        self.0.iter().copied()
    }
}

impl<A: Attribute> FromIterator<A> for LockedAttributes<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

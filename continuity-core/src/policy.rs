//! Canon lock policy: the first stage of the write pipeline.
//!
//! Pure classification of a single attribute against an entity's lock
//! snapshot. No side effects.

use crate::model::{Attribute, CanonLockLevel, LockedAttributes};
use serde::{Deserialize, Serialize};

/// How a write to one attribute is governed.
///
/// Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockClass {
    /// Change freely.
    Free,
    /// Change allowed, but flagged.
    SoftLocked,
    /// Change rejected.
    HardLocked,
}

impl LockClass {
    pub fn is_locked(&self) -> bool {
        !matches!(self, LockClass::Free)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LockClass::Free => "free",
            LockClass::SoftLocked => "soft-locked",
            LockClass::HardLocked => "hard-locked",
        }
    }
}

/// Classify a write to `attribute` under the given lock snapshot.
pub fn classify<A: Attribute>(
    level: CanonLockLevel,
    locked: &LockedAttributes<A>,
    attribute: A,
) -> LockClass {
    match level {
        CanonLockLevel::None => LockClass::Free,
        CanonLockLevel::Soft if locked.contains(attribute) => LockClass::SoftLocked,
        CanonLockLevel::Hard if locked.contains(attribute) => LockClass::HardLocked,
        CanonLockLevel::Soft | CanonLockLevel::Hard => LockClass::Free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CharacterAttribute, WorldElementAttribute};

    fn eyes_locked() -> LockedAttributes<CharacterAttribute> {
        LockedAttributes::new().with(CharacterAttribute::EyeColor)
    }

    #[test]
    fn test_none_is_always_free() {
        let locked = eyes_locked();
        assert_eq!(
            classify(CanonLockLevel::None, &locked, CharacterAttribute::EyeColor),
            LockClass::Free
        );
    }

    #[test]
    fn test_soft_lock_applies_to_listed_attributes() {
        let locked = eyes_locked();
        assert_eq!(
            classify(CanonLockLevel::Soft, &locked, CharacterAttribute::EyeColor),
            LockClass::SoftLocked
        );
        assert_eq!(
            classify(CanonLockLevel::Soft, &locked, CharacterAttribute::HairColor),
            LockClass::Free
        );
    }

    #[test]
    fn test_hard_lock_applies_to_listed_attributes() {
        let locked = eyes_locked();
        assert_eq!(
            classify(CanonLockLevel::Hard, &locked, CharacterAttribute::EyeColor),
            LockClass::HardLocked
        );
        assert_eq!(
            classify(CanonLockLevel::Hard, &locked, CharacterAttribute::Name),
            LockClass::Free
        );
    }

    #[test]
    fn test_empty_lock_list_is_free() {
        let locked = LockedAttributes::<WorldElementAttribute>::new();
        let class = classify(CanonLockLevel::Hard, &locked, WorldElementAttribute::Rules);
        assert_eq!(class, LockClass::Free);
        assert!(!class.is_locked());
    }

    #[test]
    fn test_classes_order_by_strength() {
        assert!(LockClass::Free < LockClass::SoftLocked);
        assert!(LockClass::SoftLocked < LockClass::HardLocked);
        assert_eq!(LockClass::HardLocked.name(), "hard-locked");
    }
}

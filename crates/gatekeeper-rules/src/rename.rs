//! Nickname changes applied alongside role grants.

use serde::{Deserialize, Serialize};

/// Longest nickname the platform accepts.
pub const MAX_NICKNAME_CHARS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenameType {
    FullName,
    FirstName,
}

impl RenameType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FULL_NAME" => Some(Self::FullName),
            "FIRST_NAME" => Some(Self::FirstName),
            _ => None,
        }
    }
}

/// What to do with a verified member's nickname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePlan {
    pub kind: RenameType,
    /// Overwrite a nickname the member already set
    pub force: bool,
}

impl RenamePlan {
    /// Whether to touch the nickname of a member who does or does not have one.
    pub fn should_apply(&self, has_nickname: bool) -> bool {
        self.force || !has_nickname
    }

    /// The nickname to set for `full_name`, or `None` if the name is blank.
    pub fn nickname_for(&self, full_name: &str) -> Option<String> {
        let full_name = full_name.trim();
        let name = match self.kind {
            RenameType::FullName => full_name,
            RenameType::FirstName => full_name.split_whitespace().next()?,
        };
        if name.is_empty() {
            return None;
        }
        Some(name.chars().take(MAX_NICKNAME_CHARS).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_kinds() {
        let full = RenamePlan { kind: RenameType::FullName, force: false };
        let first = RenamePlan { kind: RenameType::FirstName, force: false };
        assert_eq!(full.nickname_for("  Ada Lovelace "), Some("Ada Lovelace".into()));
        assert_eq!(first.nickname_for("Ada Lovelace"), Some("Ada".into()));
        assert_eq!(first.nickname_for("   "), None);
        assert_eq!(full.nickname_for(""), None);
    }

    #[test]
    fn test_nickname_is_truncated() {
        let full = RenamePlan { kind: RenameType::FullName, force: false };
        let nick = full.nickname_for(&"é".repeat(40)).unwrap();
        assert_eq!(nick.chars().count(), MAX_NICKNAME_CHARS);
    }

    #[test]
    fn test_force_overrides_existing_nickname() {
        let soft = RenamePlan { kind: RenameType::FirstName, force: false };
        let hard = RenamePlan { kind: RenameType::FirstName, force: true };
        assert!(soft.should_apply(false));
        assert!(!soft.should_apply(true));
        assert!(hard.should_apply(true));
    }

    #[test]
    fn test_parse() {
        assert_eq!(RenameType::parse("FIRST_NAME"), Some(RenameType::FirstName));
        assert_eq!(RenameType::parse("first_name"), None);
    }
}

//! Ordered, versioned rule collections.

use serde::Serialize;

use crate::rename::{RenamePlan, RenameType};
use crate::rule::{Rule, YearMatch};

/// Schema version written by [`crate::serializer::export`].
pub const CURRENT_VERSION: u64 = 2;

/// A guild's verification rules. Order is significant: the first matching rule
/// wins. Updates replace the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    /// Year copied into legacy rules that were stored without one
    pub base_year: i32,
    pub rules: Vec<Rule>,
    pub rename: Option<RenameType>,
    pub force_rename: bool,
}

impl RuleSet {
    pub fn new(base_year: i32, rules: Vec<Rule>) -> Self {
        Self {
            base_year,
            rules,
            rename: None,
            force_rename: false,
        }
    }

    pub fn with_rename(mut self, kind: RenameType, force: bool) -> Self {
        self.rename = Some(kind);
        self.force_rename = force;
        self
    }

    /// Rename instruction attached to every match, if renaming is configured.
    pub fn rename_plan(&self) -> Option<RenamePlan> {
        self.rename.map(|kind| RenamePlan {
            kind,
            force: self.force_rename,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A rule set in the legacy (v1) shape: non-`all` rules may lack a year.
///
/// `base_year` is always known here; the importer falls back to the configured
/// default when the payload has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetV1 {
    pub base_year: i32,
    pub rules: Vec<Rule>,
    pub rename: Option<RenameType>,
    pub force_rename: bool,
}

/// A rule set tagged with the schema version it was read as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedRuleSet {
    V1(RuleSetV1),
    V2(RuleSet),
}

impl VersionedRuleSet {
    /// Bring the set up to the current schema. The flag is `true` when a
    /// migration ran, meaning the stored copy should be rewritten.
    pub fn into_current(self) -> (RuleSet, bool) {
        match self {
            Self::V1(legacy) => (migrate(legacy), true),
            Self::V2(current) => (current, false),
        }
    }
}

/// Fill in `year` from `base_year` for every non-`all` rule that lacks one.
///
/// Rules that already carry a year are left untouched, so migrating a set
/// that was already migrated changes nothing.
pub fn migrate(legacy: RuleSetV1) -> RuleSet {
    let base_year = legacy.base_year;
    let rules = legacy
        .rules
        .into_iter()
        .map(|mut rule| {
            if rule.year.is_none() && rule.year_match != YearMatch::All {
                rule.year = Some(base_year);
            }
            rule
        })
        .collect();

    RuleSet {
        base_year,
        rules,
        rename: legacy.rename,
        force_rename: legacy.force_rename,
    }
}

impl From<RuleSet> for RuleSetV1 {
    /// Re-tag a current set as legacy, as happens when a v2 export is
    /// re-imported with its version field stripped.
    fn from(current: RuleSet) -> Self {
        Self {
            base_year: current.base_year,
            rules: current.rules,
            rename: current.rename,
            force_rename: current.force_rename,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MatchType;

    fn legacy_rule(year_match: YearMatch, year: Option<i32>) -> Rule {
        Rule::normalized(
            vec!["SE".into()],
            "VPA/Software Engineering".into(),
            MatchType::Exact,
            year_match,
            year,
        )
    }

    fn legacy_set() -> RuleSetV1 {
        RuleSetV1 {
            base_year: 2021,
            rules: vec![
                legacy_rule(YearMatch::Equal, None),
                legacy_rule(YearMatch::Upper, Some(2019)),
                legacy_rule(YearMatch::All, None),
            ],
            rename: None,
            force_rename: false,
        }
    }

    #[test]
    fn test_migrate_fills_only_missing_years() {
        let migrated = migrate(legacy_set());
        let years: Vec<_> = migrated.rules.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![Some(2021), Some(2019), None]);
        assert_eq!(migrated.base_year, 2021);
    }

    #[test]
    fn test_migrate_twice_equals_once() {
        let once = migrate(legacy_set());
        let twice = migrate(RuleSetV1::from(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_current_sets_are_not_migrated() {
        let current = migrate(legacy_set());
        let (same, migrated) = VersionedRuleSet::V2(current.clone()).into_current();
        assert!(!migrated);
        assert_eq!(same, current);

        let (_, migrated) = VersionedRuleSet::V1(legacy_set()).into_current();
        assert!(migrated);
    }

    #[test]
    fn test_rename_plan_follows_settings() {
        let set = RuleSet::new(2021, vec![]);
        assert_eq!(set.rename_plan(), None);
        let set = set.with_rename(RenameType::FullName, true);
        assert_eq!(
            set.rename_plan(),
            Some(RenamePlan { kind: RenameType::FullName, force: true })
        );
    }
}

//! Rule evaluation.
//!
//! One pass over the rules in order; the first rule whose department and year
//! conditions both hold decides the outcome. Rules that fail validation are
//! skipped rather than trusted, so a corrupt entry can neither grant broad
//! access nor abort verification for the whole guild.

use serde::Serialize;
use tracing::debug;

use crate::rename::RenamePlan;
use crate::ruleset::RuleSet;

/// Outcome of evaluating a rule set for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Index of the rule that fired, `None` if nothing matched
    pub matched_index: Option<usize>,
    /// Roles to grant, in application order
    pub roles: Vec<String>,
    pub rename_plan: Option<RenamePlan>,
}

impl Decision {
    pub fn no_match() -> Self {
        Self {
            matched_index: None,
            roles: Vec::new(),
            rename_plan: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched_index.is_some()
    }
}

/// Decide which roles a member with `department` and `account_year` receives.
pub fn evaluate(ruleset: &RuleSet, department: &str, account_year: i32) -> Decision {
    for (index, rule) in ruleset.rules.iter().enumerate() {
        if let Err(reason) = rule.validate() {
            debug!(index, %reason, "Skipping malformed rule");
            continue;
        }

        if rule.matches(department, account_year) {
            debug!(index, department, account_year, "Rule matched");
            return Decision {
                matched_index: Some(index),
                roles: rule.roles.clone(),
                rename_plan: ruleset.rename_plan(),
            };
        }
    }

    debug!(department, account_year, "No rule matched");
    Decision::no_match()
}

//! Turns a member profile into the concrete changes to apply in a guild.

use gatekeeper_common::error::RoleValidationError;
use gatekeeper_common::models::{MemberProfile, RoleDirectory};
use serde::Serialize;
use tracing::{info, warn};

use crate::matcher::evaluate;
use crate::resolver::{resolve, ResolvedRole};
use crate::ruleset::RuleSet;

/// Everything the bot should do for one verified member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPlan {
    pub matched_index: Option<usize>,
    pub roles: Vec<ResolvedRole>,
    /// New nickname, if one should be set
    pub nickname: Option<String>,
}

impl VerificationPlan {
    /// True when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.nickname.is_none()
    }
}

/// Evaluate `ruleset` for `profile` and resolve the result against `directory`.
///
/// A member no rule matches gets an empty plan. A matched rule whose roles
/// cannot be granted yields the resolver's error and nothing is applied.
pub fn plan_verification(
    ruleset: &RuleSet,
    profile: &MemberProfile,
    directory: &RoleDirectory,
) -> Result<VerificationPlan, RoleValidationError> {
    let decision = evaluate(ruleset, &profile.department, profile.account_year);
    let roles = resolve(&decision.roles, directory)?;

    let nickname = decision.rename_plan.and_then(|plan| {
        if !plan.should_apply(profile.nickname.is_some()) {
            return None;
        }
        if !directory.bot().permissions.can_manage_nicknames() {
            warn!("Rename configured but the bot cannot manage nicknames");
            return None;
        }
        plan.nickname_for(profile.full_name.as_deref()?)
    });

    info!(
        matched = ?decision.matched_index,
        roles = roles.len(),
        rename = nickname.is_some(),
        "Verification planned"
    );

    Ok(VerificationPlan {
        matched_index: decision.matched_index,
        roles,
        nickname,
    })
}

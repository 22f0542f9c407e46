//! Role name resolution against a guild's live role directory.
//!
//! Checks run in a fixed order so the member sees one deterministic message
//! when several things are wrong: duplicates first, then, name by name in
//! input order, existence and assignability.

use std::collections::HashSet;

use gatekeeper_common::error::RoleValidationError;
use gatekeeper_common::models::RoleDirectory;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::ruleset::RuleSet;

/// A role name paired with the role it refers to in the guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRole {
    pub name: String,
    pub id: Uuid,
}

pub type RoleValidationResult = Result<Vec<ResolvedRole>, RoleValidationError>;

/// Resolve `role_names` to role IDs, in input order.
pub fn resolve<S: AsRef<str>>(role_names: &[S], directory: &RoleDirectory) -> RoleValidationResult {
    let names: Vec<&str> = role_names.iter().map(|n| n.as_ref().trim()).collect();

    let mut seen = HashSet::with_capacity(names.len());
    if let Some(dup) = names.iter().find(|name| !seen.insert(**name)) {
        return Err(RoleValidationError::DuplicateRole {
            name: (*dup).to_owned(),
        });
    }

    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        let Some(role) = directory.get(name) else {
            warn!(role = name, "Role not found in directory");
            return Err(RoleValidationError::RoleNotFound {
                name: name.to_owned(),
            });
        };
        if !directory.is_assignable(role) {
            warn!(role = name, position = role.position, "Role is not assignable by the bot");
            return Err(RoleValidationError::RoleNotAssignable {
                name: name.to_owned(),
            });
        }
        resolved.push(ResolvedRole {
            name: name.to_owned(),
            id: role.id,
        });
    }

    Ok(resolved)
}

/// A rule in a set refers to roles that cannot be granted in this guild.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Rule {rule}: {error}")]
pub struct RuleRoleError {
    /// 1-based position of the rule
    pub rule: usize,
    #[source]
    pub error: RoleValidationError,
}

/// Check every rule's roles against `directory`, stopping at the first rule
/// that fails.
pub fn validate_against_directory(
    ruleset: &RuleSet,
    directory: &RoleDirectory,
) -> Result<(), RuleRoleError> {
    for (index, rule) in ruleset.rules.iter().enumerate() {
        resolve(&rule.roles, directory).map_err(|error| RuleRoleError {
            rule: index + 1,
            error,
        })?;
    }
    Ok(())
}

//! Input validation utilities.
//!
//! Centralized validation helpers used by rule authoring.

use validator::Validate;

use crate::error::GatekeeperError;

/// Validate a request body, returning a GatekeeperError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), GatekeeperError> {
    body.validate().map_err(|e| GatekeeperError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect();
    // field_errors() iterates a HashMap
    messages.sort();
    messages.join("; ")
}

/// Validate that a role name is usable in a rule.
pub fn validate_role_name(name: &str) -> Result<(), GatekeeperError> {
    if name.trim().is_empty() {
        return Err(GatekeeperError::Validation {
            message: "Role name cannot be empty or whitespace only".into(),
        });
    }

    if name.trim().chars().count() > 100 {
        return Err(GatekeeperError::Validation {
            message: "Role name must be at most 100 characters".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_rules() {
        assert!(validate_role_name("Upper-Year").is_ok());
        assert!(validate_role_name("   ").is_err());
        assert!(validate_role_name(&"x".repeat(101)).is_err());
    }
}

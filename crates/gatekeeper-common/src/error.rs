//! Centralized error types for Gatekeeper.
//!
//! Uses `thiserror` for ergonomic error definitions. Authoring and role-validation
//! errors are user-facing: their `Display` output is shown verbatim to the guild
//! administrator, and `error_code()` gives callers a stable string to branch on.

use serde::Serialize;

/// A single rule failed authoring-time validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("a rule must be an object")]
    NotAnObject,

    #[error("a rule must grant at least one role")]
    EmptyRoles,

    #[error("role names cannot be blank")]
    BlankRoleName,

    #[error("roles must be a list of role names")]
    RolesNotStrings,

    #[error("role '{name}' is listed more than once")]
    DuplicateRole { name: String },

    #[error("a rule cannot grant more than {max} roles")]
    TooManyRoles { max: usize },

    #[error("missing match type")]
    MissingMatch,

    #[error("unknown match type '{value}'")]
    UnknownMatch { value: String },

    #[error("missing year match")]
    MissingYearMatch,

    #[error("unknown year match '{value}'")]
    UnknownYearMatch { value: String },

    #[error("a department is required unless the match type is 'anything'")]
    MissingDepartment,

    #[error("a numeric year is required unless the year match is 'all'")]
    MissingYear,
}

/// Rule set import or construction failed. Imports are all-or-nothing, so a
/// single error means nothing was imported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthoringError {
    #[error("Rule set is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Rule set must be an object with a 'rules' array")]
    MissingRules,

    #[error("Unsupported rule set version {0}")]
    UnsupportedVersion(String),

    #[error("baseYear must be an integer year, got {0}")]
    InvalidBaseYear(String),

    #[error("Legacy rule set needs a baseYear to fill in missing rule years")]
    MissingBaseYear,

    #[error("Unknown rename type '{0}'")]
    UnknownRenameType(String),

    #[error("Rule set has {count} rules; at most {max} are allowed")]
    TooManyRules { count: usize, max: usize },

    /// `rule` is the 1-based position of the offending rule.
    #[error("Rule {rule}: {source}")]
    Rule {
        rule: usize,
        #[source]
        source: RuleError,
    },
}

impl AuthoringError {
    pub fn rule(index: usize, source: RuleError) -> Self {
        Self::Rule { rule: index + 1, source }
    }
}

/// A proposed role list cannot be applied in the current guild.
///
/// Only the first offending role is reported: duplicates are checked before
/// existence, and existence before assignability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleValidationError {
    #[error("Duplicate role name in rule: '{name}'")]
    DuplicateRole { name: String },

    #[error("Role '{name}' does not exist in this server")]
    RoleNotFound { name: String },

    #[error("Role '{name}' is above the bot's highest role and cannot be assigned")]
    RoleNotAssignable { name: String },
}

impl RoleValidationError {
    /// The role name the error is about.
    pub fn role_name(&self) -> &str {
        match self {
            Self::DuplicateRole { name }
            | Self::RoleNotFound { name }
            | Self::RoleNotAssignable { name } => name,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateRole { .. } => "DUPLICATE_ROLE",
            Self::RoleNotFound { .. } => "ROLE_NOT_FOUND",
            Self::RoleNotAssignable { .. } => "ROLE_NOT_ASSIGNABLE",
        }
    }
}

/// Core application error type used across all Gatekeeper crates.
#[derive(Debug, thiserror::Error)]
pub enum GatekeeperError {
    // === User-facing errors ===
    #[error(transparent)]
    Authoring(#[from] AuthoringError),

    #[error(transparent)]
    RoleValidation(#[from] RoleValidationError),

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatekeeperError {
    /// Error code string for programmatic handling by callers.
    pub fn error_code(&self) -> &str {
        match self {
            Self::Authoring(_) => "AUTHORING_ERROR",
            Self::RoleValidation(e) => e.error_code(),
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Database(_) | Self::Migration(_) => "DATABASE_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the message is safe to show to the person who triggered it.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Authoring(_)
                | Self::RoleValidation(_)
                | Self::Validation { .. }
                | Self::NotFound { .. }
        )
    }

    /// Message to render for an end user. Internal details are logged, not shown.
    pub fn user_message(&self) -> String {
        if self.is_user_facing() {
            return self.to_string();
        }
        tracing::error!(code = self.error_code(), "{self}");
        "An internal error occurred".to_string()
    }
}

/// Convenience type alias for Results using GatekeeperError.
pub type GatekeeperResult<T> = Result<T, GatekeeperError>;

//! Versioned JSON import/export for rule sets.
//!
//! The same document format is used by the export/import commands, the
//! external rule-builder and guild configuration storage:
//!
//! ```json
//! { "v": 2, "baseYear": 2021, "rules": [
//!     { "roles": ["SE"], "department": "VPA/Software Engineering",
//!       "match": "exact", "yearMatch": "equal", "year": 2020 } ] }
//! ```
//!
//! Documents without `v` (or with `v: 1`) are legacy: non-`all` rules may omit
//! `year` and are migrated on load from `baseYear`. An import that needs
//! migration must carry `baseYear` or be given one in [`ImportOptions`].
//!
//! Imports are strict and all-or-nothing. Stored documents are read leniently:
//! a damaged rule is kept in place as a rule the matcher will skip.

use gatekeeper_common::config::VerificationConfig;
use gatekeeper_common::error::{AuthoringError, RuleError};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::rename::RenameType;
use crate::rule::{MatchType, Rule, YearMatch, ANY_DEPARTMENT};
use crate::ruleset::{RuleSet, RuleSetV1, VersionedRuleSet, CURRENT_VERSION};

/// Knobs for reading rule set documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Base year supplied alongside an imported document. The document's own
    /// `baseYear` takes precedence.
    pub base_year: Option<i32>,
    /// Base year for stored documents that carry none
    pub default_base_year: i32,
    pub max_rules: usize,
    pub max_roles_per_rule: usize,
}

impl ImportOptions {
    pub fn with_base_year(self, base_year: i32) -> Self {
        Self {
            base_year: Some(base_year),
            ..self
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from(&VerificationConfig::default())
    }
}

impl From<&VerificationConfig> for ImportOptions {
    fn from(cfg: &VerificationConfig) -> Self {
        Self {
            base_year: None,
            default_base_year: cfg.default_base_year,
            max_rules: cfg.max_rules,
            max_roles_per_rule: cfg.max_roles_per_rule,
        }
    }
}

// ============================================================
// Export
// ============================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleSetDocument<'a> {
    v: u64,
    base_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    rename_type: Option<RenameType>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    force_rename: bool,
    rules: Vec<RuleDocument<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuleDocument<'a> {
    roles: &'a [String],
    department: &'a str,
    #[serde(rename = "match")]
    match_type: &'a str,
    year_match: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
}

impl<'a> From<&'a Rule> for RuleDocument<'a> {
    fn from(rule: &'a Rule) -> Self {
        let department = match rule.match_type {
            MatchType::Anything => ANY_DEPARTMENT,
            _ => rule.department.as_str(),
        };
        let year = match rule.year_match {
            YearMatch::All => None,
            _ => rule.year,
        };
        Self {
            roles: &rule.roles,
            department,
            match_type: rule.match_type.as_str(),
            year_match: rule.year_match.as_str(),
            year,
        }
    }
}

/// Render `ruleset` as a current-version JSON document.
pub fn export(ruleset: &RuleSet) -> Result<String, serde_json::Error> {
    let doc = RuleSetDocument {
        v: CURRENT_VERSION,
        base_year: ruleset.base_year,
        rename_type: ruleset.rename,
        force_rename: ruleset.force_rename,
        rules: ruleset.rules.iter().map(RuleDocument::from).collect(),
    };
    serde_json::to_string_pretty(&doc)
}

// ============================================================
// Import
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Strict,
    Lenient,
}

/// Parse an administrator-supplied document with default limits.
pub fn parse(text: &str) -> Result<RuleSet, AuthoringError> {
    parse_with(text, &ImportOptions::default())
}

/// Parse an administrator-supplied document, migrating legacy documents.
///
/// Every rule must pass [`Rule::validate`]; any failure rejects the whole
/// document.
pub fn parse_with(text: &str, options: &ImportOptions) -> Result<RuleSet, AuthoringError> {
    let versioned = read_document(text, options, Mode::Strict)?;
    let (ruleset, migrated) = versioned.into_current();

    if ruleset.rules.len() > options.max_rules {
        return Err(AuthoringError::TooManyRules {
            count: ruleset.rules.len(),
            max: options.max_rules,
        });
    }
    for (index, rule) in ruleset.rules.iter().enumerate() {
        if rule.roles.len() > options.max_roles_per_rule {
            return Err(AuthoringError::rule(
                index,
                RuleError::TooManyRoles {
                    max: options.max_roles_per_rule,
                },
            ));
        }
        rule.validate().map_err(|e| AuthoringError::rule(index, e))?;
    }

    info!(rules = ruleset.rules.len(), migrated, "Rule set imported");
    Ok(ruleset)
}

/// A rule set read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRuleSet {
    pub ruleset: RuleSet,
    /// The stored copy was legacy and should be written back in current form
    pub migrated: bool,
}

/// Read a stored document. Only documents that are not recognisable as a rule
/// set fail; damaged rules are kept and left for the matcher to skip.
pub fn load_stored(text: &str, options: &ImportOptions) -> Result<StoredRuleSet, AuthoringError> {
    let (ruleset, migrated) = read_document(text, options, Mode::Lenient)?.into_current();
    if migrated {
        info!(rules = ruleset.rules.len(), base_year = ruleset.base_year, "Migrated legacy rule set");
    }
    Ok(StoredRuleSet { ruleset, migrated })
}

fn read_document(
    text: &str,
    options: &ImportOptions,
    mode: Mode,
) -> Result<VersionedRuleSet, AuthoringError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| AuthoringError::InvalidJson(e.to_string()))?;
    let doc = value.as_object().ok_or(AuthoringError::MissingRules)?;
    let raw_rules = doc
        .get("rules")
        .and_then(Value::as_array)
        .ok_or(AuthoringError::MissingRules)?;

    let version = match doc.get("v") {
        None | Some(Value::Null) => 1,
        Some(v) => match v.as_u64() {
            Some(n @ 1..=CURRENT_VERSION) => n,
            _ => return Err(AuthoringError::UnsupportedVersion(raw_text(v))),
        },
    };

    let document_year = match doc.get("baseYear") {
        None | Some(Value::Null) => None,
        Some(v) => match (v.as_i64().and_then(|y| i32::try_from(y).ok()), mode) {
            (Some(year), _) => Some(year),
            (None, Mode::Strict) => return Err(AuthoringError::InvalidBaseYear(raw_text(v))),
            (None, Mode::Lenient) => {
                warn!(base_year = %v, "Ignoring malformed stored base year");
                None
            }
        },
    };

    let rename = match doc.get("renameType") {
        None | Some(Value::Null) => None,
        Some(v) => match (v.as_str().and_then(RenameType::parse), mode) {
            (Some(kind), _) => Some(kind),
            (None, Mode::Strict) => {
                return Err(AuthoringError::UnknownRenameType(raw_text(v)));
            }
            (None, Mode::Lenient) => {
                warn!(rename_type = %v, "Ignoring unknown stored rename type");
                None
            }
        },
    };
    let force_rename = doc.get("forceRename").and_then(Value::as_bool).unwrap_or(false);

    let mut rules = Vec::with_capacity(raw_rules.len());
    for (index, raw) in raw_rules.iter().enumerate() {
        match read_rule(raw) {
            Ok(rule) => rules.push(rule),
            Err(e) if mode == Mode::Strict => return Err(AuthoringError::rule(index, e)),
            Err(e) => {
                warn!(index, reason = %e, "Stored rule is unreadable; it will never match");
                rules.push(unreadable_rule());
            }
        }
    }

    let base_year = match (document_year.or(options.base_year), mode) {
        (Some(year), _) => year,
        (None, Mode::Strict) if version == 1 && rules.iter().any(needs_year) => {
            return Err(AuthoringError::MissingBaseYear);
        }
        (None, _) => options.default_base_year,
    };

    Ok(match version {
        1 => VersionedRuleSet::V1(RuleSetV1 {
            base_year,
            rules,
            rename,
            force_rename,
        }),
        _ => VersionedRuleSet::V2(RuleSet {
            base_year,
            rules,
            rename,
            force_rename,
        }),
    })
}

/// Legacy rule that migration would fill in from the base year.
fn needs_year(rule: &Rule) -> bool {
    rule.year.is_none() && rule.year_match != YearMatch::All
}

/// String values verbatim, anything else as JSON text.
fn raw_text(v: &Value) -> String {
    v.as_str().map(str::to_owned).unwrap_or_else(|| v.to_string())
}

/// Decode one rule's fields. Semantic checks happen after migration.
fn read_rule(raw: &Value) -> Result<Rule, RuleError> {
    let obj: &Map<String, Value> = raw.as_object().ok_or(RuleError::NotAnObject)?;

    let roles = match obj.get("roles") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect::<Option<Vec<_>>>()
            .ok_or(RuleError::RolesNotStrings)?,
        Some(_) => return Err(RuleError::RolesNotStrings),
    };

    let match_type = obj
        .get("match")
        .and_then(Value::as_str)
        .map(MatchType::from)
        .ok_or(RuleError::MissingMatch)?;
    let year_match = obj
        .get("yearMatch")
        .and_then(Value::as_str)
        .map(YearMatch::from)
        .ok_or(RuleError::MissingYearMatch)?;

    let department = obj
        .get("department")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let year = match (&year_match, obj.get("year")) {
        (YearMatch::All, _) | (_, None | Some(Value::Null)) => None,
        (_, Some(v)) => Some(
            v.as_i64()
                .and_then(|y| i32::try_from(y).ok())
                .ok_or(RuleError::MissingYear)?,
        ),
    };

    Ok(Rule::normalized(roles, department, match_type, year_match, year))
}

/// Placeholder for a stored rule that could not be decoded. It fails
/// validation, so the matcher skips it, and it keeps later rules at their index.
fn unreadable_rule() -> Rule {
    Rule::normalized(
        Vec::new(),
        String::new(),
        MatchType::Unknown(String::new()),
        YearMatch::Unknown(String::new()),
        None,
    )
}

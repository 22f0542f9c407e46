//! A single verification rule: a department/year condition and the roles it grants.

use std::collections::HashSet;
use std::fmt;

use gatekeeper_common::error::{GatekeeperError, GatekeeperResult, RuleError};
use gatekeeper_common::validation::{validate_request, validate_role_name};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Department value stored for rules that match any department.
pub const ANY_DEPARTMENT: &str = "any";

/// How a rule's department pattern is compared against a member's department.
///
/// Comparisons are case-sensitive and neither side is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchType {
    /// Department equals the pattern
    Exact,
    /// Department starts with the pattern
    Begins,
    /// Department contains the pattern
    Contains,
    /// Any department
    Anything,
    /// A value this version does not recognise. Never matches.
    Unknown(String),
}

impl MatchType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact => "exact",
            Self::Begins => "begins",
            Self::Contains => "contains",
            Self::Anything => "anything",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn matches(&self, pattern: &str, department: &str) -> bool {
        match self {
            Self::Exact => department == pattern,
            Self::Begins => department.starts_with(pattern),
            Self::Contains => department.contains(pattern),
            Self::Anything => true,
            Self::Unknown(_) => false,
        }
    }
}

impl From<&str> for MatchType {
    fn from(value: &str) -> Self {
        match value {
            "exact" => Self::Exact,
            "begins" => Self::Begins,
            "contains" => Self::Contains,
            "anything" => Self::Anything,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for MatchType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<MatchType> for String {
    fn from(value: MatchType) -> Self {
        match value {
            MatchType::Unknown(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a member's account year is compared against a rule's year.
///
/// An earlier account year means a more senior member, so `Upper` matches years
/// strictly before the rule's year and `Lower` matches years strictly after it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum YearMatch {
    Equal,
    Upper,
    Lower,
    All,
    /// A value this version does not recognise. Never matches.
    Unknown(String),
}

impl YearMatch {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equal => "equal",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::All => "all",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Compare `account_year` against the rule year. A missing rule year only
    /// matches under `All`.
    pub fn matches(&self, rule_year: Option<i32>, account_year: i32) -> bool {
        match (self, rule_year) {
            (Self::All, _) => true,
            (Self::Equal, Some(year)) => account_year == year,
            (Self::Upper, Some(year)) => account_year < year,
            (Self::Lower, Some(year)) => account_year > year,
            _ => false,
        }
    }
}

impl From<&str> for YearMatch {
    fn from(value: &str) -> Self {
        match value {
            "equal" => Self::Equal,
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            "all" => Self::All,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for YearMatch {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<YearMatch> for String {
    fn from(value: YearMatch) -> Self {
        match value {
            YearMatch::Unknown(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for YearMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a guild's ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Roles granted on match, in application order
    pub roles: Vec<String>,

    /// Department pattern; `"any"` when `match_type` is `Anything`
    pub department: String,

    #[serde(rename = "match")]
    pub match_type: MatchType,

    pub year_match: YearMatch,

    /// Required unless `year_match` is `All`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Rule {
    /// Build a rule for authoring, rejecting anything [`Rule::validate`] would.
    pub fn new(
        roles: Vec<String>,
        department: impl Into<String>,
        match_type: MatchType,
        year_match: YearMatch,
        year: Option<i32>,
    ) -> Result<Self, RuleError> {
        let rule = Self::normalized(roles, department.into(), match_type, year_match, year);
        rule.validate()?;
        Ok(rule)
    }

    /// Build a rule without validating it. `Anything` rules get the `"any"`
    /// department and `All` rules drop their year, so equal rules compare equal.
    pub(crate) fn normalized(
        roles: Vec<String>,
        department: String,
        match_type: MatchType,
        year_match: YearMatch,
        year: Option<i32>,
    ) -> Self {
        let department = if match_type == MatchType::Anything {
            ANY_DEPARTMENT.to_owned()
        } else {
            department
        };
        let year = if year_match == YearMatch::All { None } else { year };
        Self {
            roles,
            department,
            match_type,
            year_match,
            year,
        }
    }

    /// Check the authoring invariants of a single rule.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.roles.is_empty() {
            return Err(RuleError::EmptyRoles);
        }

        let mut seen = HashSet::with_capacity(self.roles.len());
        for name in &self.roles {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(RuleError::BlankRoleName);
            }
            if !seen.insert(trimmed) {
                return Err(RuleError::DuplicateRole {
                    name: trimmed.to_owned(),
                });
            }
        }

        if let MatchType::Unknown(value) = &self.match_type {
            return Err(RuleError::UnknownMatch {
                value: value.clone(),
            });
        }
        if self.match_type != MatchType::Anything && self.department.is_empty() {
            return Err(RuleError::MissingDepartment);
        }

        if let YearMatch::Unknown(value) = &self.year_match {
            return Err(RuleError::UnknownYearMatch {
                value: value.clone(),
            });
        }
        if self.year_match != YearMatch::All && self.year.is_none() {
            return Err(RuleError::MissingYear);
        }

        Ok(())
    }

    /// Whether this rule's condition holds for the given member attributes.
    ///
    /// Only meaningful for rules that pass [`Rule::validate`]; the matcher skips
    /// the rest.
    pub fn matches(&self, department: &str, account_year: i32) -> bool {
        self.match_type.matches(&self.department, department)
            && self.year_match.matches(self.year, account_year)
    }
}

/// A rule as submitted by an administrator through a bot command.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    #[validate(length(min = 1, max = 25, message = "A rule must grant between 1 and 25 roles"))]
    pub roles: Vec<String>,

    #[serde(default)]
    #[validate(length(max = 200, message = "Department must be at most 200 characters"))]
    pub department: String,

    #[serde(rename = "match")]
    pub match_type: String,

    pub year_match: String,

    #[serde(default)]
    pub year: Option<i32>,
}

impl RuleDraft {
    /// Validate the draft and turn it into a rule.
    pub fn into_rule(self) -> GatekeeperResult<Rule> {
        validate_request(&self)?;
        for name in &self.roles {
            validate_role_name(name)?;
        }

        let roles = self.roles.iter().map(|r| r.trim().to_owned()).collect();
        Rule::new(
            roles,
            self.department,
            MatchType::from(self.match_type),
            YearMatch::from(self.year_match),
            self.year,
        )
        .map_err(|e| GatekeeperError::Validation {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_year_comparisons() {
        for year in [2019, 2000] {
            assert!(YearMatch::Upper.matches(Some(2020), year));
        }
        assert!(!YearMatch::Upper.matches(Some(2020), 2020));

        for year in [2021, 2022] {
            assert!(YearMatch::Lower.matches(Some(2020), year));
        }
        assert!(!YearMatch::Lower.matches(Some(2020), 2020));

        assert!(YearMatch::Equal.matches(Some(2020), 2020));
        assert!(!YearMatch::Equal.matches(Some(2020), 2019));
        assert!(!YearMatch::Equal.matches(Some(2020), 2021));
    }

    #[test]
    fn test_missing_year_never_matches() {
        assert!(!YearMatch::Equal.matches(None, 2020));
        assert!(!YearMatch::Upper.matches(None, 1900));
        assert!(YearMatch::All.matches(None, 2020));
    }

    #[test]
    fn test_department_matching_is_case_sensitive() {
        assert!(MatchType::Exact.matches("VPA/Software Engineering", "VPA/Software Engineering"));
        assert!(!MatchType::Exact.matches("VPA/Software Engineering", "vpa/software engineering"));
        assert!(MatchType::Begins.matches("VPA/", "VPA/Software Engineering"));
        assert!(!MatchType::Begins.matches("Software", "VPA/Software Engineering"));
        assert!(MatchType::Contains.matches("Software", "VPA/Software Engineering"));
        assert!(!MatchType::Exact.matches("VPA ", "VPA"));
        assert!(MatchType::Anything.matches("", "whatever"));
    }

    #[test]
    fn test_unknown_operators_never_match() {
        let unknown = MatchType::from("regex");
        assert_eq!(unknown, MatchType::Unknown("regex".into()));
        assert!(!unknown.matches("", ""));
        assert!(!YearMatch::from("between").matches(Some(2020), 2020));
    }

    #[test]
    fn test_operator_strings_round_trip() {
        for raw in ["exact", "begins", "contains", "anything", "weird"] {
            assert_eq!(String::from(MatchType::from(raw)), raw);
        }
        for raw in ["equal", "upper", "lower", "all", "weird"] {
            assert_eq!(String::from(YearMatch::from(raw)), raw);
        }
    }

    #[test]
    fn test_new_rejects_authoring_mistakes() {
        assert_eq!(
            Rule::new(vec![], "VPA", MatchType::Exact, YearMatch::All, None),
            Err(RuleError::EmptyRoles)
        );
        assert_eq!(
            Rule::new(roles(&["SE", " SE "]), "VPA", MatchType::Exact, YearMatch::All, None),
            Err(RuleError::DuplicateRole { name: "SE".into() })
        );
        assert_eq!(
            Rule::new(roles(&["SE"]), "", MatchType::Begins, YearMatch::All, None),
            Err(RuleError::MissingDepartment)
        );
        assert_eq!(
            Rule::new(roles(&["SE"]), "VPA", MatchType::Exact, YearMatch::Upper, None),
            Err(RuleError::MissingYear)
        );
    }

    #[test]
    fn test_whitespace_department_is_a_literal_pattern() {
        let rule = Rule::new(roles(&["Blank"]), " ", MatchType::Exact, YearMatch::All, None)
            .expect("only an empty department is missing");
        assert_eq!(rule.department, " ");
        assert!(rule.matches(" ", 2020));
        assert!(!rule.matches("", 2020));
        assert!(!rule.matches("VPA", 2020));

        let spaced = Rule::new(roles(&["Spaced"]), " ", MatchType::Contains, YearMatch::All, None).unwrap();
        assert!(spaced.matches("VPA/Software Engineering", 2020));
        assert!(!spaced.matches("VPA", 2020));
    }

    #[test]
    fn test_new_normalizes_wildcards() {
        let rule = Rule::new(roles(&["Any"]), "", MatchType::Anything, YearMatch::All, Some(2020))
            .expect("wildcard rule is valid");
        assert_eq!(rule.department, ANY_DEPARTMENT);
        assert_eq!(rule.year, None);
    }

    #[test]
    fn test_draft_into_rule() {
        let draft: RuleDraft = serde_json::from_value(serde_json::json!({
            "roles": [" SE "],
            "department": "VPA/Software Engineering",
            "match": "exact",
            "yearMatch": "equal",
            "year": 2020
        }))
        .unwrap();
        let rule = draft.into_rule().expect("draft is valid");
        assert_eq!(rule.roles, roles(&["SE"]));
        assert_eq!(rule.year, Some(2020));
    }

    #[test]
    fn test_draft_reports_validation_message() {
        let draft = RuleDraft {
            roles: vec![],
            department: "VPA".into(),
            match_type: "exact".into(),
            year_match: "all".into(),
            year: None,
        };
        let err = draft.into_rule().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: A rule must grant between 1 and 25 roles"
        );
    }

    #[test]
    fn test_draft_rejects_unknown_operator() {
        let draft = RuleDraft {
            roles: roles(&["SE"]),
            department: "VPA".into(),
            match_type: "fuzzy".into(),
            year_match: "all".into(),
            year: None,
        };
        assert!(matches!(
            draft.into_rule(),
            Err(GatekeeperError::Validation { .. })
        ));
    }
}

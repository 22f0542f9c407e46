//! # gatekeeper-rules
//!
//! The verification rule engine. Given a member's department and account year,
//! an ordered [`RuleSet`] decides which roles to grant and whether to rename the
//! member; the [`resolver`] then checks those roles against the guild's live
//! role directory before anything is applied.
//!
//! Everything here is pure and synchronous. Callers own I/O: fetching role
//! directories, persisting rule sets, applying roles.

pub mod matcher;
pub mod planner;
pub mod rename;
pub mod resolver;
pub mod rule;
pub mod ruleset;
pub mod serializer;

pub use matcher::{evaluate, Decision};
pub use planner::{plan_verification, VerificationPlan};
pub use rename::{RenamePlan, RenameType};
pub use resolver::{resolve, validate_against_directory, ResolvedRole, RoleValidationResult};
pub use rule::{MatchType, Rule, RuleDraft, YearMatch};
pub use ruleset::RuleSet;
pub use serializer::{export, load_stored, parse, parse_with, ImportOptions, StoredRuleSet};

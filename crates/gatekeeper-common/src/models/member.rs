//! Member attributes supplied by the account-linking flow.

use serde::{Deserialize, Serialize};

/// What verification knows about a member once their organisational account is linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    /// Organisational department, compared exactly as reported
    pub department: String,

    /// Year the organisational account was created
    pub account_year: i32,

    /// Display name from the organisation, used for renaming
    #[serde(default)]
    pub full_name: Option<String>,

    /// Current guild nickname, if any
    #[serde(default)]
    pub nickname: Option<String>,
}

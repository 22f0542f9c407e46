//! Permission bits the verification bot cares about.
//!
//! Mirrors the platform's permission bitfield closely enough to decide whether
//! the bot may hand out a role or change a nickname. Bits that verification never
//! inspects are not modelled; `from_bits_truncate` drops them on the way in.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Guild-level permissions held by the bot member.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Permissions: i64 {
        /// Manage roles below your highest role
        const MANAGE_ROLES          = 1 << 3;
        /// Change other members' nicknames
        const MANAGE_NICKNAMES      = 1 << 9;
        /// Server owner / administrator (all permissions)
        const ADMINISTRATOR         = 1 << 40;
    }
}

impl Permissions {
    /// Check if administrator (overrides all other checks).
    pub fn is_admin(&self) -> bool {
        self.contains(Self::ADMINISTRATOR)
    }

    /// Check if a member with these permissions can perform an action.
    pub fn has(&self, required: Permissions) -> bool {
        self.is_admin() || self.contains(required)
    }

    pub fn can_manage_roles(&self) -> bool {
        self.has(Self::MANAGE_ROLES)
    }

    pub fn can_manage_nicknames(&self) -> bool {
        self.has(Self::MANAGE_NICKNAMES)
    }
}

//! Role model and the role directory snapshot used for assignment checks.
//!
//! The directory is a point-in-time view of a guild's roles plus the bot's own
//! standing in that guild. It must be fetched no earlier than the moment roles
//! are about to be granted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::permissions::Permissions;

/// A role within a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,

    /// Role name
    pub name: String,

    /// Position in the role hierarchy (higher = more power)
    pub position: i32,

    /// Whether the role is owned by an integration and cannot be granted by hand
    #[serde(default)]
    pub managed: bool,

    /// Whether this is the @everyone role (one per guild)
    #[serde(default)]
    pub is_default: bool,
}

/// The bot's own standing in a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotMember {
    /// Position of the bot's highest role
    pub highest_position: i32,

    /// Effective guild permissions of the bot
    pub permissions: Permissions,
}

/// Name-indexed snapshot of a guild's roles.
#[derive(Debug, Clone)]
pub struct RoleDirectory {
    roles: HashMap<String, Role>,
    bot: BotMember,
}

impl RoleDirectory {
    /// Build a directory from a role listing.
    ///
    /// When several roles share a name, the highest-positioned one is kept.
    pub fn new(roles: impl IntoIterator<Item = Role>, bot: BotMember) -> Self {
        let mut by_name: HashMap<String, Role> = HashMap::new();
        for role in roles {
            match by_name.get(&role.name) {
                Some(existing) if existing.position >= role.position => {}
                _ => {
                    by_name.insert(role.name.clone(), role);
                }
            }
        }
        Self { roles: by_name, bot }
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn bot(&self) -> &BotMember {
        &self.bot
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Whether the bot is allowed to grant `role` to a member.
    ///
    /// Requires MANAGE_ROLES, a role strictly below the bot's highest role, and a
    /// role that is neither integration-managed nor @everyone.
    pub fn is_assignable(&self, role: &Role) -> bool {
        self.bot.permissions.can_manage_roles()
            && !role.managed
            && !role.is_default
            && role.position < self.bot.highest_position
    }
}

//! In-memory cache of guild rule sets, fronting the `guild_verification` table.
//!
//! Reads go cache → database. Writes go to the database first and then replace
//! the cached entry, so a failed write never leaves the cache ahead of storage.
//! Concurrent updates to the same guild are last-write-wins. A load never
//! overwrites what a concurrent `store` wrote: the migration write-back only
//! applies if the row still holds the document that was read, and a loaded set
//! is only cached when no entry exists yet.

use std::collections::HashMap;
use std::sync::Arc;

use gatekeeper_common::error::{GatekeeperError, GatekeeperResult};
use gatekeeper_rules::serializer::{
    export, load_stored, parse_with, ImportOptions, StoredRuleSet,
};
use gatekeeper_rules::RuleSet;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::repository::guild_configs;
use crate::Database;

/// A stored document as read, before write-back.
pub(crate) struct Fetched {
    text: String,
    stored: StoredRuleSet,
}

#[derive(Clone)]
pub struct GuildConfigCache {
    db: Database,
    options: ImportOptions,
    inner: Arc<RwLock<HashMap<String, Arc<RuleSet>>>>,
}

impl GuildConfigCache {
    pub fn new(db: Database, options: ImportOptions) -> Self {
        Self {
            db,
            options,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Rule set for `guild_id`, or `None` if the guild has not configured one.
    ///
    /// A legacy document is migrated on first load and the migrated form is
    /// written back, so migration only ever runs once per guild.
    pub async fn load(&self, guild_id: &str) -> GatekeeperResult<Option<Arc<RuleSet>>> {
        if let Some(hit) = self.inner.read().await.get(guild_id) {
            debug!(guild_id, "Rule set cache hit");
            return Ok(Some(Arc::clone(hit)));
        }

        loop {
            let Some(fetched) = self.fetch(guild_id).await? else {
                return Ok(None);
            };
            if let Some(ruleset) = self.settle(guild_id, fetched).await? {
                return Ok(Some(ruleset));
            }
            debug!(guild_id, "Stored rule set changed while migrating; reloading");
        }
    }

    /// Read and decode the stored document.
    pub(crate) async fn fetch(&self, guild_id: &str) -> GatekeeperResult<Option<Fetched>> {
        let Some(text) = guild_configs::get_ruleset_text(&self.db.pool, guild_id).await? else {
            return Ok(None);
        };
        let stored = load_stored(&text, &self.options)?;
        Ok(Some(Fetched { text, stored }))
    }

    /// Write back a migrated document and cache the result.
    ///
    /// Returns `None` when the row changed after it was fetched and the newer
    /// rule set is not cached yet; the caller fetches again.
    pub(crate) async fn settle(
        &self,
        guild_id: &str,
        fetched: Fetched,
    ) -> GatekeeperResult<Option<Arc<RuleSet>>> {
        let Fetched { text, stored } = fetched;
        if stored.migrated {
            let document = export(&stored.ruleset)?;
            let replaced =
                guild_configs::replace_ruleset_if(&self.db.pool, guild_id, &text, &document)
                    .await?;
            if !replaced {
                return Ok(self.inner.read().await.get(guild_id).cloned());
            }
            info!(guild_id, "Persisted migrated rule set");
        }

        let mut inner = self.inner.write().await;
        let cached = inner
            .entry(guild_id.to_owned())
            .or_insert_with(|| Arc::new(stored.ruleset));
        Ok(Some(Arc::clone(cached)))
    }

    /// Replace the guild's rule set (write-through).
    pub async fn store(&self, guild_id: &str, ruleset: RuleSet) -> GatekeeperResult<Arc<RuleSet>> {
        let document = export(&ruleset)?;
        guild_configs::upsert_ruleset(&self.db.pool, guild_id, &document).await?;

        let ruleset = Arc::new(ruleset);
        self.inner
            .write()
            .await
            .insert(guild_id.to_owned(), Arc::clone(&ruleset));
        info!(guild_id, rules = ruleset.len(), "Rule set stored");
        Ok(ruleset)
    }

    /// Validate an administrator's document and store it. Nothing is written
    /// if any rule is invalid.
    pub async fn import(&self, guild_id: &str, document: &str) -> GatekeeperResult<Arc<RuleSet>> {
        let ruleset = parse_with(document, &self.options)?;
        self.store(guild_id, ruleset).await
    }

    /// Current-version document for the guild's rule set.
    pub async fn export(&self, guild_id: &str) -> GatekeeperResult<String> {
        let ruleset = self
            .load(guild_id)
            .await?
            .ok_or_else(|| GatekeeperError::NotFound {
                resource: format!("Rule set for guild {guild_id}"),
            })?;
        Ok(export(&ruleset)?)
    }

    /// Drop the cached entry; the next load reads from the database.
    pub async fn invalidate(&self, guild_id: &str) {
        self.inner.write().await.remove(guild_id);
    }

    /// Guilds with a stored rule set, sorted by id.
    pub async fn guilds(&self) -> GatekeeperResult<Vec<String>> {
        Ok(guild_configs::list_guilds(&self.db.pool).await?)
    }

    /// Delete the guild's rule set. Returns whether one existed.
    pub async fn clear(&self, guild_id: &str) -> GatekeeperResult<bool> {
        let existed = guild_configs::delete_ruleset(&self.db.pool, guild_id).await?;
        self.invalidate(guild_id).await;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_common::error::AuthoringError;
    use gatekeeper_rules::{evaluate, MatchType, Rule, YearMatch};

    const LEGACY: &str = r#"{"rules":[{"roles":["SE"],"department":"VPA/Software Engineering","match":"exact","yearMatch":"equal"}]}"#;
    const AUTHORED: &str = r#"{"baseYear":2021,"rules":[{"roles":["SE"],"department":"VPA/Software Engineering","match":"exact","yearMatch":"equal"}]}"#;

    async fn cache() -> GuildConfigCache {
        let db = Database::in_memory().await.unwrap();
        let options = ImportOptions {
            default_base_year: 2021,
            ..ImportOptions::default()
        };
        GuildConfigCache::new(db, options)
    }

    #[tokio::test]
    async fn test_missing_guild_loads_none() {
        let cache = cache().await;
        assert!(cache.load("nobody").await.unwrap().is_none());
        assert!(matches!(
            cache.export("nobody").await,
            Err(GatekeeperError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_legacy_rows_are_migrated_and_written_back() {
        let cache = cache().await;
        guild_configs::upsert_ruleset(&cache.db.pool, "g", LEGACY).await.unwrap();

        let ruleset = cache.load("g").await.unwrap().expect("configured");
        assert_eq!(ruleset.rules[0].year, Some(2021));

        let text = guild_configs::get_ruleset_text(&cache.db.pool, "g")
            .await
            .unwrap()
            .unwrap();
        assert!(text.contains("\"v\": 2"));
        assert!(text.contains("\"year\": 2021"));
    }

    #[tokio::test]
    async fn test_import_rejects_legacy_without_base_year() {
        let cache = cache().await;
        assert!(matches!(
            cache.import("g", LEGACY).await,
            Err(GatekeeperError::Authoring(AuthoringError::MissingBaseYear))
        ));
        assert!(cache.load("g").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_migration_write_back_keeps_concurrent_store() {
        let cache = cache().await;
        guild_configs::upsert_ruleset(&cache.db.pool, "g", LEGACY).await.unwrap();

        let fetched = cache.fetch("g").await.unwrap().expect("configured");
        assert!(fetched.stored.migrated);

        let rule = Rule::new(vec!["Admin-Pick".into()], "", MatchType::Anything, YearMatch::All, None).unwrap();
        cache.store("g", RuleSet::new(2021, vec![rule])).await.unwrap();

        let settled = cache.settle("g", fetched).await.unwrap().expect("newer set is cached");
        assert_eq!(settled.rules[0].roles, vec!["Admin-Pick".to_string()]);

        let text = guild_configs::get_ruleset_text(&cache.db.pool, "g")
            .await
            .unwrap()
            .unwrap();
        assert!(text.contains("Admin-Pick"));
        assert!(!text.contains("VPA/Software Engineering"));
    }

    #[tokio::test]
    async fn test_migration_write_back_rereads_uncached_change() {
        let cache = cache().await;
        guild_configs::upsert_ruleset(&cache.db.pool, "g", LEGACY).await.unwrap();
        let fetched = cache.fetch("g").await.unwrap().expect("configured");

        let replacement = r#"{"v":2,"baseYear":2021,"rules":[{"roles":["Other"],"department":"any","match":"anything","yearMatch":"all"}]}"#;
        guild_configs::upsert_ruleset(&cache.db.pool, "g", replacement).await.unwrap();

        assert!(cache.settle("g", fetched).await.unwrap().is_none());
        let text = guild_configs::get_ruleset_text(&cache.db.pool, "g")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, replacement);

        let loaded = cache.load("g").await.unwrap().expect("configured");
        assert_eq!(loaded.rules[0].roles, vec!["Other".to_string()]);
    }

    #[tokio::test]
    async fn test_late_load_does_not_replace_cached_store() {
        let cache = cache().await;
        cache.import("g", AUTHORED).await.unwrap();
        cache.invalidate("g").await;
        let fetched = cache.fetch("g").await.unwrap().expect("configured");
        assert!(!fetched.stored.migrated);

        let rule = Rule::new(vec!["Newer".into()], "", MatchType::Anything, YearMatch::All, None).unwrap();
        cache.store("g", RuleSet::new(2021, vec![rule])).await.unwrap();

        let settled = cache.settle("g", fetched).await.unwrap().unwrap();
        assert_eq!(settled.rules[0].roles, vec!["Newer".to_string()]);
        let cached = cache.load("g").await.unwrap().unwrap();
        assert_eq!(cached.rules[0].roles, vec!["Newer".to_string()]);
    }

    #[tokio::test]
    async fn test_guilds_lists_configured() {
        let cache = cache().await;
        cache.import("b", AUTHORED).await.unwrap();
        cache.import("a", AUTHORED).await.unwrap();
        assert_eq!(cache.guilds().await.unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_store_is_write_through() {
        let cache = cache().await;
        let rule = Rule::new(vec!["Member".into()], "", MatchType::Anything, YearMatch::All, None).unwrap();
        cache.store("g", RuleSet::new(2021, vec![rule])).await.unwrap();

        cache.invalidate("g").await;
        let reloaded = cache.load("g").await.unwrap().expect("persisted");
        assert_eq!(evaluate(&reloaded, "MAT/Mathematics", 2022).roles, vec!["Member".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_import_keeps_previous_rules() {
        let cache = cache().await;
        cache.import("g", AUTHORED).await.unwrap();

        let bad = r#"{"v":2,"baseYear":2021,"rules":[{"roles":[],"department":"any","match":"anything","yearMatch":"all"}]}"#;
        assert!(matches!(
            cache.import("g", bad).await,
            Err(GatekeeperError::Authoring(_))
        ));

        cache.invalidate("g").await;
        let kept = cache.load("g").await.unwrap().expect("still configured");
        assert_eq!(kept.rules[0].roles, vec!["SE".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_entry_served_until_invalidated() {
        let cache = cache().await;
        cache.import("g", AUTHORED).await.unwrap();

        let replacement = r#"{"v":2,"baseYear":2021,"rules":[{"roles":["Other"],"department":"any","match":"anything","yearMatch":"all"}]}"#;
        guild_configs::upsert_ruleset(&cache.db.pool, "g", replacement).await.unwrap();

        let cached = cache.load("g").await.unwrap().unwrap();
        assert_eq!(cached.rules[0].roles, vec!["SE".to_string()]);

        cache.invalidate("g").await;
        let fresh = cache.load("g").await.unwrap().unwrap();
        assert_eq!(fresh.rules[0].roles, vec!["Other".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_removes_rules() {
        let cache = cache().await;
        cache.import("g", AUTHORED).await.unwrap();
        assert!(cache.clear("g").await.unwrap());
        assert!(cache.load("g").await.unwrap().is_none());
        assert!(!cache.clear("g").await.unwrap());
    }
}

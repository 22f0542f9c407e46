//! Guild verification config repository.

use sqlx::SqlitePool;

/// Fetch the stored rule set document for a guild.
pub async fn get_ruleset_text(
    pool: &SqlitePool,
    guild_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT ruleset FROM guild_verification WHERE guild_id = ?")
        .bind(guild_id)
        .fetch_optional(pool)
        .await
}

/// Replace a guild's rule set document wholesale.
pub async fn upsert_ruleset(
    pool: &SqlitePool,
    guild_id: &str,
    document: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO guild_verification (guild_id, ruleset, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT (guild_id) DO UPDATE SET
            ruleset = excluded.ruleset,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(guild_id)
    .bind(document)
    .execute(pool)
    .await?;
    Ok(())
}

/// Replace a guild's document only if it still reads `expected`. Returns
/// whether the row was updated.
pub async fn replace_ruleset_if(
    pool: &SqlitePool,
    guild_id: &str,
    expected: &str,
    document: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE guild_verification
        SET ruleset = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guild_id = ? AND ruleset = ?
        "#,
    )
    .bind(document)
    .bind(guild_id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a guild's rule set. Returns whether one existed.
pub async fn delete_ruleset(pool: &SqlitePool, guild_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM guild_verification WHERE guild_id = ?")
        .bind(guild_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// List guilds that have a rule set configured.
pub async fn list_guilds(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT guild_id FROM guild_verification ORDER BY guild_id")
        .fetch_all(pool)
        .await
}

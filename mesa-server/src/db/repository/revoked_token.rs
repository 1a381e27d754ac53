//! Revoked Token Repository
//!
//! The auth collaborator writes revocations; the engine only purges rows
//! whose tokens have expired on their own.

use super::RepoResult;
use sqlx::{Sqlite, SqlitePool};

pub async fn revoke(pool: &SqlitePool, token_hash: &str, expires_at: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    // Re-revoking the same token is a no-op
    sqlx::query(
        "INSERT OR IGNORE INTO revoked_token (id, token_hash, expires_at, revoked_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(token_hash)
    .bind(expires_at)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn is_revoked(pool: &SqlitePool, token_hash: &str) -> RepoResult<bool> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM revoked_token WHERE token_hash = ?")
        .bind(token_hash)
        .fetch_one(pool)
        .await?;
    Ok(row.0 > 0)
}

/// Purge entries whose token expiry is already in the past.
pub async fn purge_expired<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM revoked_token WHERE expires_at < ?")
        .bind(now)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected())
}

//! Channel membership repository for SQLite operations
//!
//! Backs the membership-gating check on `channel.subscribe`/`message.send`:
//! a role lookup here is cached with a short TTL since membership changes
//! are rare but must take effect promptly once they do.

use std::time::Duration;

use sqlx::SqlitePool;

use crate::core::constants::{CACHE_TTL_MEMBERSHIP, CACHE_TTL_NEGATIVE};
use crate::data::cache::{CacheKey, CacheService, invalidate_channel_membership_caches};
use crate::data::sqlite::SqliteError;
use crate::data::types::ChannelMemberRow;

/// Get a user's membership role in a channel, if any (with optional caching)
pub async fn get_channel_member(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    channel_id: &str,
    user_id: &str,
) -> Result<Option<ChannelMemberRow>, SqliteError> {
    if let Some(cache) = cache {
        let key = CacheKey::channel_member(channel_id, user_id);
        let neg_key = CacheKey::channel_member_negative(channel_id, user_id);

        match cache.get::<ChannelMemberRow>(&key).await {
            Ok(Some(member)) => {
                tracing::trace!(%channel_id, %user_id, "Channel member cache hit");
                return Ok(Some(member));
            }
            Err(e) => tracing::warn!(%channel_id, %user_id, error = %e, "Cache get error"),
            Ok(None) => {}
        }

        if cache.exists(&neg_key).await.unwrap_or(false) {
            tracing::trace!(%channel_id, %user_id, "Channel member negative cache hit");
            return Ok(None);
        }

        let result = get_channel_member_from_db(pool, channel_id, user_id).await?;

        match &result {
            Some(m) => {
                if let Err(e) = cache
                    .set(&key, m, Some(Duration::from_secs(CACHE_TTL_MEMBERSHIP)))
                    .await
                {
                    tracing::warn!(%channel_id, %user_id, error = %e, "Cache set error");
                }
            }
            None => {
                if let Err(e) = cache
                    .set_raw(
                        &neg_key,
                        vec![],
                        Some(Duration::from_secs(CACHE_TTL_NEGATIVE)),
                    )
                    .await
                {
                    tracing::warn!(%channel_id, %user_id, error = %e, "Cache set (negative) error");
                }
            }
        }

        Ok(result)
    } else {
        get_channel_member_from_db(pool, channel_id, user_id).await
    }
}

async fn get_channel_member_from_db(
    pool: &SqlitePool,
    channel_id: &str,
    user_id: &str,
) -> Result<Option<ChannelMemberRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, String, i64)>(
        "SELECT channel_id, user_id, role, created_at FROM channel_members
         WHERE channel_id = ? AND user_id = ?",
    )
    .bind(channel_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(channel_id, user_id, role, created_at)| ChannelMemberRow {
            channel_id,
            user_id,
            role,
            created_at,
        },
    ))
}

/// Add (or update the role of) a channel member.
pub async fn add_channel_member(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    channel_id: &str,
    user_id: &str,
    role: &str,
) -> Result<ChannelMemberRow, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO channel_members (channel_id, user_id, role, created_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(channel_id, user_id) DO UPDATE SET role = excluded.role",
    )
    .bind(channel_id)
    .bind(user_id)
    .bind(role)
    .bind(now)
    .execute(pool)
    .await?;

    if let Some(cache) = cache {
        invalidate_channel_membership_caches(cache, channel_id, user_id).await;
    }

    get_channel_member_from_db(pool, channel_id, user_id)
        .await?
        .ok_or_else(|| {
            SqliteError::Conflict(format!(
                "channel member ({channel_id}, {user_id}) missing immediately after insert"
            ))
        })
}

/// Remove a channel member.
pub async fn remove_channel_member(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    channel_id: &str,
    user_id: &str,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM channel_members WHERE channel_id = ? AND user_id = ?")
        .bind(channel_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    let removed = result.rows_affected() > 0;

    if removed && let Some(cache) = cache {
        invalidate_channel_membership_caches(cache, channel_id, user_id).await;
    }

    Ok(removed)
}

/// List all members of a channel.
pub async fn list_channel_members(
    pool: &SqlitePool,
    channel_id: &str,
) -> Result<Vec<ChannelMemberRow>, SqliteError> {
    let rows = sqlx::query_as::<_, (String, String, String, i64)>(
        "SELECT channel_id, user_id, role, created_at FROM channel_members
         WHERE channel_id = ? ORDER BY created_at ASC",
    )
    .bind(channel_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(channel_id, user_id, role, created_at)| ChannelMemberRow {
                channel_id,
                user_id,
                role,
                created_at,
            },
        )
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_add_and_get_channel_member() {
        let pool = setup_test_pool().await;
        let member = add_channel_member(&pool, None, "c1", "u1", "member")
            .await
            .unwrap();
        assert_eq!(member.role, "member");

        let fetched = get_channel_member(&pool, None, "c1", "u1").await.unwrap();
        assert_eq!(fetched.unwrap().role, "member");
    }

    #[tokio::test]
    async fn test_add_channel_member_updates_role() {
        let pool = setup_test_pool().await;
        add_channel_member(&pool, None, "c1", "u1", "member")
            .await
            .unwrap();
        let updated = add_channel_member(&pool, None, "c1", "u1", "admin")
            .await
            .unwrap();
        assert_eq!(updated.role, "admin");
    }

    #[tokio::test]
    async fn test_remove_channel_member() {
        let pool = setup_test_pool().await;
        add_channel_member(&pool, None, "c1", "u1", "member")
            .await
            .unwrap();
        let removed = remove_channel_member(&pool, None, "c1", "u1")
            .await
            .unwrap();
        assert!(removed);

        let fetched = get_channel_member(&pool, None, "c1", "u1").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_list_channel_members() {
        let pool = setup_test_pool().await;
        add_channel_member(&pool, None, "c1", "u1", "owner")
            .await
            .unwrap();
        add_channel_member(&pool, None, "c1", "u2", "member")
            .await
            .unwrap();

        let members = list_channel_members(&pool, "c1").await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn test_default_membership_exists() {
        let pool = setup_test_pool().await;
        let member = get_channel_member(&pool, None, "general", "local")
            .await
            .unwrap();
        assert_eq!(member.unwrap().role, "owner");
    }
}

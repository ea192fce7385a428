//! Channel membership repository for PostgreSQL operations
//!
//! Backs the membership-gating check on `channel.subscribe`/`message.send`:
//! a role lookup here is cached with a short TTL since membership changes
//! are rare but must take effect promptly once they do.

use std::time::Duration;

use sqlx::PgPool;

use crate::core::constants::{CACHE_TTL_MEMBERSHIP, CACHE_TTL_NEGATIVE};
use crate::data::cache::{CacheKey, CacheService, invalidate_channel_membership_caches};
use crate::data::postgres::PostgresError;
use crate::data::types::ChannelMemberRow;

/// Get a user's membership role in a channel, if any (with optional caching)
pub async fn get_channel_member(
    pool: &PgPool,
    cache: Option<&CacheService>,
    channel_id: &str,
    user_id: &str,
) -> Result<Option<ChannelMemberRow>, PostgresError> {
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
    pool: &PgPool,
    channel_id: &str,
    user_id: &str,
) -> Result<Option<ChannelMemberRow>, PostgresError> {
    let row = sqlx::query_as::<_, (String, String, String, i64)>(
        "SELECT channel_id, user_id, role, created_at FROM channel_members
         WHERE channel_id = $1 AND user_id = $2",
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
    pool: &PgPool,
    cache: Option<&CacheService>,
    channel_id: &str,
    user_id: &str,
    role: &str,
) -> Result<ChannelMemberRow, PostgresError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO channel_members (channel_id, user_id, role, created_at) VALUES ($1, $2, $3, $4)
         ON CONFLICT (channel_id, user_id) DO UPDATE SET role = excluded.role",
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
            PostgresError::Conflict(format!(
                "channel member ({channel_id}, {user_id}) missing immediately after insert"
            ))
        })
}

/// Remove a channel member.
pub async fn remove_channel_member(
    pool: &PgPool,
    cache: Option<&CacheService>,
    channel_id: &str,
    user_id: &str,
) -> Result<bool, PostgresError> {
    let result = sqlx::query("DELETE FROM channel_members WHERE channel_id = $1 AND user_id = $2")
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
    pool: &PgPool,
    channel_id: &str,
) -> Result<Vec<ChannelMemberRow>, PostgresError> {
    let rows = sqlx::query_as::<_, (String, String, String, i64)>(
        "SELECT channel_id, user_id, role, created_at FROM channel_members
         WHERE channel_id = $1 ORDER BY created_at ASC",
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
    // Exercised against SQLite in data::sqlite::repositories::channel_member.
}

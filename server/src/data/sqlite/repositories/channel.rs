//! Channel repository for SQLite operations

use std::time::Duration;

use sqlx::SqlitePool;

use crate::core::constants::{CACHE_TTL_CHANNEL, CACHE_TTL_NEGATIVE};
use crate::data::cache::{CacheKey, CacheService};
use crate::data::sqlite::SqliteError;
use crate::data::types::ChannelRow;

/// Create a channel, or return the existing row unchanged if one already
/// exists for this id.
pub async fn create_channel(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    id: &str,
    name: &str,
) -> Result<ChannelRow, SqliteError> {
    if let Some(existing) = get_channel_from_db(pool, id).await? {
        return Ok(existing);
    }

    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO channels (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
    )
    .bind(id)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    if let Some(cache) = cache
        && let Err(e) = cache.delete(&CacheKey::channel_negative(id)).await
    {
        tracing::warn!(%id, error = %e, "Cache invalidation error");
    }

    get_channel_from_db(pool, id).await?.ok_or_else(|| {
        SqliteError::Conflict(format!("channel {id} missing immediately after insert"))
    })
}

/// Get a channel by ID (with optional caching)
pub async fn get_channel(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    id: &str,
) -> Result<Option<ChannelRow>, SqliteError> {
    if let Some(cache) = cache {
        let key = CacheKey::channel(id);
        let neg_key = CacheKey::channel_negative(id);

        match cache.get::<ChannelRow>(&key).await {
            Ok(Some(channel)) => {
                tracing::trace!(%id, "Channel cache hit");
                return Ok(Some(channel));
            }
            Err(e) => tracing::warn!(%id, error = %e, "Cache get error"),
            Ok(None) => {}
        }

        if cache.exists(&neg_key).await.unwrap_or(false) {
            tracing::trace!(%id, "Channel negative cache hit");
            return Ok(None);
        }

        let result = get_channel_from_db(pool, id).await?;

        match &result {
            Some(c) => {
                if let Err(e) = cache
                    .set(&key, c, Some(Duration::from_secs(CACHE_TTL_CHANNEL)))
                    .await
                {
                    tracing::warn!(%id, error = %e, "Cache set error");
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
                    tracing::warn!(%id, error = %e, "Cache set (negative) error");
                }
            }
        }

        Ok(result)
    } else {
        get_channel_from_db(pool, id).await
    }
}

async fn get_channel_from_db(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<ChannelRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, i64, i64)>(
        "SELECT id, name, created_at, updated_at FROM channels WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, name, created_at, updated_at)| ChannelRow {
        id,
        name,
        created_at,
        updated_at,
    }))
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
    async fn test_create_channel() {
        let pool = setup_test_pool().await;
        let channel = create_channel(&pool, None, "c1", "random").await.unwrap();
        assert_eq!(channel.id, "c1");
        assert_eq!(channel.name, "random");
    }

    #[tokio::test]
    async fn test_create_channel_is_idempotent() {
        let pool = setup_test_pool().await;
        let first = create_channel(&pool, None, "c1", "random").await.unwrap();
        let second = create_channel(&pool, None, "c1", "renamed").await.unwrap();
        assert_eq!(first.name, second.name);
    }

    #[tokio::test]
    async fn test_get_channel_not_found() {
        let pool = setup_test_pool().await;
        let fetched = get_channel(&pool, None, "nonexistent").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_default_channel_exists() {
        let pool = setup_test_pool().await;
        let channel = get_channel(&pool, None, "general").await.unwrap();
        assert!(channel.is_some());
    }
}

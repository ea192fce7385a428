//! Channel repository for PostgreSQL operations

use std::time::Duration;

use sqlx::PgPool;

use crate::core::constants::{CACHE_TTL_CHANNEL, CACHE_TTL_NEGATIVE};
use crate::data::cache::{CacheKey, CacheService};
use crate::data::postgres::PostgresError;
use crate::data::types::ChannelRow;

/// Create a channel, or return the existing row unchanged if one already
/// exists for this id.
pub async fn create_channel(
    pool: &PgPool,
    cache: Option<&CacheService>,
    id: &str,
    name: &str,
) -> Result<ChannelRow, PostgresError> {
    if let Some(existing) = get_channel_from_db(pool, id).await? {
        return Ok(existing);
    }

    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO channels (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO NOTHING",
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
        PostgresError::Conflict(format!("channel {id} missing immediately after insert"))
    })
}

/// Get a channel by ID (with optional caching)
pub async fn get_channel(
    pool: &PgPool,
    cache: Option<&CacheService>,
    id: &str,
) -> Result<Option<ChannelRow>, PostgresError> {
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

async fn get_channel_from_db(pool: &PgPool, id: &str) -> Result<Option<ChannelRow>, PostgresError> {
    let row = sqlx::query_as::<_, (String, String, i64, i64)>(
        "SELECT id, name, created_at, updated_at FROM channels WHERE id = $1",
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
    // Exercised against SQLite in data::sqlite::repositories::channel; these
    // queries require a live PostgreSQL instance to run here.
}

//! User repository for PostgreSQL operations
//!
//! All read operations support optional caching. Pass `Some(cache)` to enable caching,
//! or `None` to bypass cache. Mutations automatically invalidate relevant cache keys.

use std::time::Duration;

use sqlx::PgPool;

use crate::core::constants::{CACHE_TTL_NEGATIVE, CACHE_TTL_USER};
use crate::data::cache::{CacheKey, CacheService};
use crate::data::postgres::PostgresError;
use crate::data::types::UserRow;

/// Create a user row on first sight of a validated token, or return the
/// existing row unchanged if one already exists for this id.
pub async fn create_user(
    pool: &PgPool,
    cache: Option<&CacheService>,
    id: &str,
    username: &str,
) -> Result<UserRow, PostgresError> {
    if let Some(existing) = get_user_from_db(pool, id).await? {
        return Ok(existing);
    }

    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO users (id, username, created_at, updated_at) VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(id)
    .bind(username)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    if let Some(cache) = cache
        && let Err(e) = cache.delete(&CacheKey::user_negative(id)).await
    {
        tracing::warn!(%id, error = %e, "Cache invalidation error");
    }

    get_user_from_db(pool, id).await?.ok_or_else(|| {
        PostgresError::Conflict(format!("user {id} missing immediately after insert"))
    })
}

/// Get a user by ID (with optional caching)
pub async fn get_user(
    pool: &PgPool,
    cache: Option<&CacheService>,
    id: &str,
) -> Result<Option<UserRow>, PostgresError> {
    if let Some(cache) = cache {
        let key = CacheKey::user(id);
        let neg_key = CacheKey::user_negative(id);

        match cache.get::<UserRow>(&key).await {
            Ok(Some(user)) => {
                tracing::trace!(%id, "User cache hit");
                return Ok(Some(user));
            }
            Err(e) => tracing::warn!(%id, error = %e, "Cache get error"),
            Ok(None) => {}
        }

        if cache.exists(&neg_key).await.unwrap_or(false) {
            tracing::trace!(%id, "User negative cache hit");
            return Ok(None);
        }

        let result = get_user_from_db(pool, id).await?;

        match &result {
            Some(u) => {
                if let Err(e) = cache
                    .set(&key, u, Some(Duration::from_secs(CACHE_TTL_USER)))
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
        get_user_from_db(pool, id).await
    }
}

/// Get a user by ID directly from database (no caching)
async fn get_user_from_db(pool: &PgPool, id: &str) -> Result<Option<UserRow>, PostgresError> {
    let row = sqlx::query_as::<_, (String, String, i64, i64)>(
        "SELECT id, username, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, username, created_at, updated_at)| UserRow {
        id,
        username,
        created_at,
        updated_at,
    }))
}

#[cfg(test)]
mod tests {
    // PostgreSQL repository tests require a running PostgreSQL instance and
    // are run as integration tests; see data::sqlite::repositories::user for
    // the exercised equivalents against an in-memory backend.
}

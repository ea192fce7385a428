//! User repository for SQLite operations
//!
//! All read operations support optional caching. Pass `Some(cache)` to enable caching,
//! or `None` to bypass cache. Mutations automatically invalidate relevant cache keys.

use std::time::Duration;

use sqlx::SqlitePool;

use crate::core::constants::{CACHE_TTL_NEGATIVE, CACHE_TTL_USER};
use crate::data::cache::{CacheKey, CacheService};
use crate::data::sqlite::SqliteError;
use crate::data::types::UserRow;

/// Create a user row on first sight of a validated token, or return the
/// existing row unchanged if one already exists for this id.
pub async fn create_user(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    id: &str,
    username: &str,
) -> Result<UserRow, SqliteError> {
    if let Some(existing) = get_user_from_db(pool, id).await? {
        return Ok(existing);
    }

    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO users (id, username, created_at, updated_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
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
        SqliteError::Conflict(format!("user {id} missing immediately after insert"))
    })
}

/// Get a user by ID (with optional caching)
pub async fn get_user(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    id: &str,
) -> Result<Option<UserRow>, SqliteError> {
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
async fn get_user_from_db(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, i64, i64)>(
        "SELECT id, username, created_at, updated_at FROM users WHERE id = ?",
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
    async fn test_create_user() {
        let pool = setup_test_pool().await;
        let user = create_user(&pool, None, "u1", "alice").await.unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_create_user_is_idempotent() {
        let pool = setup_test_pool().await;
        let first = create_user(&pool, None, "u1", "alice").await.unwrap();
        let second = create_user(&pool, None, "u1", "alice-renamed").await.unwrap();

        // Second call to an existing id returns the original row untouched.
        assert_eq!(first.username, second.username);
    }

    #[tokio::test]
    async fn test_get_user() {
        let pool = setup_test_pool().await;
        create_user(&pool, None, "u1", "alice").await.unwrap();

        let fetched = get_user(&pool, None, "u1").await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let pool = setup_test_pool().await;
        let fetched = get_user(&pool, None, "nonexistent").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_default_user_exists() {
        let pool = setup_test_pool().await;
        let user = get_user(&pool, None, "local").await.unwrap();
        assert!(user.is_some());
        assert_eq!(user.unwrap().username, "local");
    }
}

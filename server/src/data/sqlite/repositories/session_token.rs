//! Session token repository for SQLite operations
//!
//! Issuance happens upstream; this crate only ever reads the table, to
//! check whether a token's `jti` was revoked before its natural expiry.
//! Revocations are rare and expected to propagate quickly, so the cached
//! TTL here is short.

use std::time::Duration;

use sqlx::SqlitePool;

use crate::core::constants::CACHE_TTL_SESSION_TOKEN;
use crate::data::cache::{CacheKey, CacheService};
use crate::data::sqlite::SqliteError;
use crate::data::types::SessionTokenRow;

/// Get a session token record by `jti` (with optional caching).
pub async fn get_session_token(
    pool: &SqlitePool,
    cache: Option<&CacheService>,
    jti: &str,
) -> Result<Option<SessionTokenRow>, SqliteError> {
    if let Some(cache) = cache {
        let key = CacheKey::session_token(jti);

        match cache.get::<SessionTokenRow>(&key).await {
            Ok(Some(token)) => {
                tracing::trace!(%jti, "Session token cache hit");
                return Ok(Some(token));
            }
            Err(e) => tracing::warn!(%jti, error = %e, "Cache get error"),
            Ok(None) => {}
        }

        let result = get_session_token_from_db(pool, jti).await?;

        if let Some(token) = &result
            && let Err(e) = cache
                .set(
                    &key,
                    token,
                    Some(Duration::from_secs(CACHE_TTL_SESSION_TOKEN)),
                )
                .await
        {
            tracing::warn!(%jti, error = %e, "Cache set error");
        }

        Ok(result)
    } else {
        get_session_token_from_db(pool, jti).await
    }
}

async fn get_session_token_from_db(
    pool: &SqlitePool,
    jti: &str,
) -> Result<Option<SessionTokenRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, i64, Option<i64>, i64)>(
        "SELECT jti, user_id, expires_at, revoked_at, created_at FROM session_tokens WHERE jti = ?",
    )
    .bind(jti)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(jti, user_id, expires_at, revoked_at, created_at)| SessionTokenRow {
            jti,
            user_id,
            expires_at,
            revoked_at,
            created_at,
        },
    ))
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
    async fn test_get_session_token_not_found() {
        let pool = setup_test_pool().await;
        let result = get_session_token(&pool, None, "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_session_token_found() {
        let pool = setup_test_pool().await;
        sqlx::query(
            "INSERT INTO session_tokens (jti, user_id, expires_at, revoked_at, created_at)
             VALUES ('jti1', 'local', 9999999999, NULL, 1000)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let token = get_session_token(&pool, None, "jti1").await.unwrap().unwrap();
        assert_eq!(token.user_id, "local");
        assert!(token.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_get_session_token_revoked() {
        let pool = setup_test_pool().await;
        sqlx::query(
            "INSERT INTO session_tokens (jti, user_id, expires_at, revoked_at, created_at)
             VALUES ('jti2', 'local', 9999999999, 5000, 1000)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let token = get_session_token(&pool, None, "jti2").await.unwrap().unwrap();
        assert_eq!(token.revoked_at, Some(5000));
    }
}

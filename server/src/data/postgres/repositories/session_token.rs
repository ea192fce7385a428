//! Session token repository for PostgreSQL operations
//!
//! Issuance happens upstream; this crate only ever reads the table, to
//! check whether a token's `jti` was revoked before its natural expiry.
//! Revocations are rare and expected to propagate quickly, so the cached
//! TTL here is short.

use std::time::Duration;

use sqlx::PgPool;

use crate::core::constants::CACHE_TTL_SESSION_TOKEN;
use crate::data::cache::{CacheKey, CacheService};
use crate::data::postgres::PostgresError;
use crate::data::types::SessionTokenRow;

/// Get a session token record by `jti` (with optional caching).
pub async fn get_session_token(
    pool: &PgPool,
    cache: Option<&CacheService>,
    jti: &str,
) -> Result<Option<SessionTokenRow>, PostgresError> {
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
    pool: &PgPool,
    jti: &str,
) -> Result<Option<SessionTokenRow>, PostgresError> {
    let row = sqlx::query_as::<_, (String, String, i64, Option<i64>, i64)>(
        "SELECT jti, user_id, expires_at, revoked_at, created_at FROM session_tokens WHERE jti = $1",
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
    // Exercised against SQLite in data::sqlite::repositories::session_token.
}

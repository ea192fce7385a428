//! Message repository for PostgreSQL operations
//!
//! Messages are not cached: history reads are paginated and cache churn
//! would outweigh any hit rate. Only the write path and single-message
//! lookups (used for edit/delete ownership checks) live here.

use sqlx::PgPool;

use crate::data::postgres::PostgresError;
use crate::data::types::MessageRow;

/// Insert a new message.
#[allow(clippy::too_many_arguments)]
pub async fn insert_message(
    pool: &PgPool,
    id: &str,
    channel_id: &str,
    user_id: &str,
    content: &str,
    message_type: &str,
    metadata: Option<&str>,
) -> Result<MessageRow, PostgresError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO messages
            (id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, FALSE, FALSE, $7, $8)",
    )
    .bind(id)
    .bind(channel_id)
    .bind(user_id)
    .bind(content)
    .bind(message_type)
    .bind(metadata)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_message(pool, id).await?.ok_or_else(|| {
        PostgresError::Conflict(format!("message {id} missing immediately after insert"))
    })
}

/// Get a message by ID, regardless of its deleted state.
pub async fn get_message(pool: &PgPool, id: &str) -> Result<Option<MessageRow>, PostgresError> {
    let row = sqlx::query_as::<_, (String, String, String, String, String, Option<String>, bool, bool, i64, i64)>(
        "SELECT id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at
         FROM messages WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at)| {
            MessageRow {
                id,
                channel_id,
                user_id,
                content,
                message_type,
                metadata,
                is_edited,
                is_deleted,
                created_at,
                updated_at,
            }
        },
    ))
}

/// Edit a message's content. Returns `None` if the message doesn't exist,
/// is already deleted, or isn't owned by `user_id`.
pub async fn edit_message(
    pool: &PgPool,
    id: &str,
    user_id: &str,
    content: &str,
) -> Result<Option<MessageRow>, PostgresError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "UPDATE messages SET content = $1, is_edited = TRUE, updated_at = $2
         WHERE id = $3 AND user_id = $4 AND is_deleted = FALSE",
    )
    .bind(content)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_message(pool, id).await
}

/// Soft-delete a message. Returns `false` if the message doesn't exist,
/// is already deleted, or isn't owned by `user_id`.
pub async fn soft_delete_message(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<bool, PostgresError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "UPDATE messages SET is_deleted = TRUE, updated_at = $1
         WHERE id = $2 AND user_id = $3 AND is_deleted = FALSE",
    )
    .bind(now)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// List non-deleted messages for a channel, most recent first, optionally
/// paginated backward from a `before` timestamp (exclusive).
pub async fn list_messages_for_channel(
    pool: &PgPool,
    channel_id: &str,
    before: Option<i64>,
    limit: u32,
) -> Result<Vec<MessageRow>, PostgresError> {
    let rows = match before {
        Some(before) => {
            sqlx::query_as::<_, (String, String, String, String, String, Option<String>, bool, bool, i64, i64)>(
                "SELECT id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at
                 FROM messages
                 WHERE channel_id = $1 AND is_deleted = FALSE AND created_at < $2
                 ORDER BY created_at DESC
                 LIMIT $3",
            )
            .bind(channel_id)
            .bind(before)
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, (String, String, String, String, String, Option<String>, bool, bool, i64, i64)>(
                "SELECT id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at
                 FROM messages
                 WHERE channel_id = $1 AND is_deleted = FALSE
                 ORDER BY created_at DESC
                 LIMIT $2",
            )
            .bind(channel_id)
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows
        .into_iter()
        .map(
            |(id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at)| {
                MessageRow {
                    id,
                    channel_id,
                    user_id,
                    content,
                    message_type,
                    metadata,
                    is_edited,
                    is_deleted,
                    created_at,
                    updated_at,
                }
            },
        )
        .collect())
}

#[cfg(test)]
mod tests {
    // Exercised against SQLite in data::sqlite::repositories::message.
}

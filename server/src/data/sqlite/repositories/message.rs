//! Message repository for SQLite operations
//!
//! Messages are not cached: history reads are paginated and cache churn
//! would outweigh any hit rate. Only the write path and single-message
//! lookups (used for edit/delete ownership checks) live here.

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::MessageRow;

/// Insert a new message.
#[allow(clippy::too_many_arguments)]
pub async fn insert_message(
    pool: &SqlitePool,
    id: &str,
    channel_id: &str,
    user_id: &str,
    content: &str,
    message_type: &str,
    metadata: Option<&str>,
) -> Result<MessageRow, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO messages
            (id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, FALSE, FALSE, ?, ?)",
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

    get_message(pool, id)
        .await?
        .ok_or_else(|| SqliteError::Conflict(format!("message {id} missing immediately after insert")))
}

/// Get a message by ID, regardless of its deleted state.
pub async fn get_message(pool: &SqlitePool, id: &str) -> Result<Option<MessageRow>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String, String, String, String, Option<String>, bool, bool, i64, i64)>(
        "SELECT id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at
         FROM messages WHERE id = ?",
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
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    content: &str,
) -> Result<Option<MessageRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "UPDATE messages SET content = ?, is_edited = TRUE, updated_at = ?
         WHERE id = ? AND user_id = ? AND is_deleted = FALSE",
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
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "UPDATE messages SET is_deleted = TRUE, updated_at = ?
         WHERE id = ? AND user_id = ? AND is_deleted = FALSE",
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
    pool: &SqlitePool,
    channel_id: &str,
    before: Option<i64>,
    limit: u32,
) -> Result<Vec<MessageRow>, SqliteError> {
    let rows = match before {
        Some(before) => {
            sqlx::query_as::<_, (String, String, String, String, String, Option<String>, bool, bool, i64, i64)>(
                "SELECT id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at
                 FROM messages
                 WHERE channel_id = ? AND is_deleted = FALSE AND created_at < ?
                 ORDER BY created_at DESC
                 LIMIT ?",
            )
            .bind(channel_id)
            .bind(before)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, (String, String, String, String, String, Option<String>, bool, bool, i64, i64)>(
                "SELECT id, channel_id, user_id, content, message_type, metadata, is_edited, is_deleted, created_at, updated_at
                 FROM messages
                 WHERE channel_id = ? AND is_deleted = FALSE
                 ORDER BY created_at DESC
                 LIMIT ?",
            )
            .bind(channel_id)
            .bind(limit)
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
    async fn test_insert_and_get_message() {
        let pool = setup_test_pool().await;
        let msg = insert_message(&pool, "m1", "general", "local", "hello", "text", None)
            .await
            .unwrap();
        assert_eq!(msg.content, "hello");
        assert!(!msg.is_edited);
        assert!(!msg.is_deleted);

        let fetched = get_message(&pool, "m1").await.unwrap();
        assert_eq!(fetched.unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_edit_message() {
        let pool = setup_test_pool().await;
        insert_message(&pool, "m1", "general", "local", "hello", "text", None)
            .await
            .unwrap();

        let edited = edit_message(&pool, "m1", "local", "hello edited")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.content, "hello edited");
        assert!(edited.is_edited);
    }

    #[tokio::test]
    async fn test_edit_message_wrong_owner() {
        let pool = setup_test_pool().await;
        insert_message(&pool, "m1", "general", "local", "hello", "text", None)
            .await
            .unwrap();

        let result = edit_message(&pool, "m1", "someone-else", "hacked")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_message() {
        let pool = setup_test_pool().await;
        insert_message(&pool, "m1", "general", "local", "hello", "text", None)
            .await
            .unwrap();

        let deleted = soft_delete_message(&pool, "m1", "local").await.unwrap();
        assert!(deleted);

        let list = list_messages_for_channel(&pool, "general", None, 10)
            .await
            .unwrap();
        assert!(list.iter().all(|m| m.id != "m1"));
    }

    #[tokio::test]
    async fn test_list_messages_for_channel_pagination() {
        let pool = setup_test_pool().await;
        for i in 0..5 {
            insert_message(
                &pool,
                &format!("m{i}"),
                "general",
                "local",
                "hello",
                "text",
                None,
            )
            .await
            .unwrap();
        }

        let page = list_messages_for_channel(&pool, "general", None, 2)
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
    }
}

//! Metrics rollup repository for SQLite operations
//!
//! Each `insert_*` is an upsert keyed on the window: the aggregator flushes
//! once per tumbling window, but a crash-and-replay must not double count.

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{ChannelMetricsRow, MessageMetricsRow, UserMetricsRow};

/// Upsert a global message-lifecycle metrics row for a window.
pub async fn insert_message_metrics(
    pool: &SqlitePool,
    row: MessageMetricsRow,
) -> Result<(), SqliteError> {
    sqlx::query(
        "INSERT INTO message_metrics (window_start, messages_sent, messages_edited, messages_deleted, messages_per_second)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(window_start) DO UPDATE SET
            messages_sent = excluded.messages_sent,
            messages_edited = excluded.messages_edited,
            messages_deleted = excluded.messages_deleted,
            messages_per_second = excluded.messages_per_second",
    )
    .bind(row.window_start)
    .bind(row.messages_sent)
    .bind(row.messages_edited)
    .bind(row.messages_deleted)
    .bind(row.messages_per_second)
    .execute(pool)
    .await?;

    Ok(())
}

/// Upsert a per-channel metrics row for a window.
pub async fn insert_channel_metrics(
    pool: &SqlitePool,
    row: ChannelMetricsRow,
) -> Result<(), SqliteError> {
    sqlx::query(
        "INSERT INTO channel_metrics (channel_id, window_start, message_count, active_users)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(channel_id, window_start) DO UPDATE SET
            message_count = excluded.message_count,
            active_users = excluded.active_users",
    )
    .bind(&row.channel_id)
    .bind(row.window_start)
    .bind(row.message_count)
    .bind(row.active_users)
    .execute(pool)
    .await?;

    Ok(())
}

/// Upsert a per-user metrics row for a window.
pub async fn insert_user_metrics(
    pool: &SqlitePool,
    row: UserMetricsRow,
) -> Result<(), SqliteError> {
    sqlx::query(
        "INSERT INTO user_metrics (user_id, window_start, messages_sent)
         VALUES (?, ?, ?)
         ON CONFLICT(user_id, window_start) DO UPDATE SET
            messages_sent = excluded.messages_sent",
    )
    .bind(&row.user_id)
    .bind(row.window_start)
    .bind(row.messages_sent)
    .execute(pool)
    .await?;

    Ok(())
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
    async fn test_insert_message_metrics_upserts() {
        let pool = setup_test_pool().await;
        insert_message_metrics(
            &pool,
            MessageMetricsRow {
                window_start: 60,
                messages_sent: 5,
                messages_edited: 1,
                messages_deleted: 0,
                messages_per_second: 0.0833,
            },
        )
        .await
        .unwrap();

        insert_message_metrics(
            &pool,
            MessageMetricsRow {
                window_start: 60,
                messages_sent: 10,
                messages_edited: 2,
                messages_deleted: 1,
                messages_per_second: 0.1667,
            },
        )
        .await
        .unwrap();

        let row: (i64, i64, i64, i64, f64) =
            sqlx::query_as("SELECT window_start, messages_sent, messages_edited, messages_deleted, messages_per_second FROM message_metrics WHERE window_start = 60")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(row.1, 10);
        assert!((row.4 - 0.1667).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_insert_channel_metrics() {
        let pool = setup_test_pool().await;
        insert_channel_metrics(
            &pool,
            ChannelMetricsRow {
                channel_id: "general".to_string(),
                window_start: 60,
                message_count: 3,
                active_users: 2,
            },
        )
        .await
        .unwrap();

        let row: (String, i64, i64, i64) = sqlx::query_as(
            "SELECT channel_id, window_start, message_count, active_users FROM channel_metrics WHERE channel_id = 'general' AND window_start = 60",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(row.2, 3);
    }

    #[tokio::test]
    async fn test_insert_user_metrics() {
        let pool = setup_test_pool().await;
        insert_user_metrics(
            &pool,
            UserMetricsRow {
                user_id: "local".to_string(),
                window_start: 60,
                messages_sent: 7,
            },
        )
        .await
        .unwrap();

        let row: (String, i64, i64) = sqlx::query_as(
            "SELECT user_id, window_start, messages_sent FROM user_metrics WHERE user_id = 'local' AND window_start = 60",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(row.2, 7);
    }
}

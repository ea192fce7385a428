//! Metrics rollup repository for PostgreSQL operations
//!
//! Each `insert_*` is an upsert keyed on the window: the aggregator flushes
//! once per tumbling window, but a crash-and-replay must not double count.

use sqlx::PgPool;

use crate::data::postgres::PostgresError;
use crate::data::types::{ChannelMetricsRow, MessageMetricsRow, UserMetricsRow};

/// Upsert a global message-lifecycle metrics row for a window.
pub async fn insert_message_metrics(
    pool: &PgPool,
    row: MessageMetricsRow,
) -> Result<(), PostgresError> {
    sqlx::query(
        "INSERT INTO message_metrics (window_start, messages_sent, messages_edited, messages_deleted, messages_per_second)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (window_start) DO UPDATE SET
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
    pool: &PgPool,
    row: ChannelMetricsRow,
) -> Result<(), PostgresError> {
    sqlx::query(
        "INSERT INTO channel_metrics (channel_id, window_start, message_count, active_users)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (channel_id, window_start) DO UPDATE SET
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
    pool: &PgPool,
    row: UserMetricsRow,
) -> Result<(), PostgresError> {
    sqlx::query(
        "INSERT INTO user_metrics (user_id, window_start, messages_sent)
         VALUES ($1, $2, $3)
         ON CONFLICT (user_id, window_start) DO UPDATE SET
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
    // Exercised against SQLite in data::sqlite::repositories::metrics.
}

//! TransactionalRepository trait implementation for PostgreSQL
//!
//! Mirrors `data::sqlite::repository_impl` query-for-query so both backends
//! stay behaviorally identical behind `TransactionalRepository`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::cache::CacheService;
use crate::data::error::DataError;
use crate::data::traits::TransactionalRepository;
use crate::data::types::{
    ChannelMemberRow, ChannelMetricsRow, ChannelRow, MessageMetricsRow, MessageRow,
    SessionTokenRow, UserMetricsRow, UserRow,
};

use super::PostgresService;
use super::repositories::{channel, channel_member, message, metrics, session_token, user};

#[async_trait]
impl TransactionalRepository for Arc<PostgresService> {
    async fn create_user(
        &self,
        cache: Option<&CacheService>,
        id: &str,
        username: &str,
    ) -> Result<UserRow, DataError> {
        user::create_user(self.pool(), cache, id, username)
            .await
            .map_err(Into::into)
    }

    async fn get_user(
        &self,
        cache: Option<&CacheService>,
        id: &str,
    ) -> Result<Option<UserRow>, DataError> {
        user::get_user(self.pool(), cache, id).await.map_err(Into::into)
    }

    async fn create_channel(
        &self,
        cache: Option<&CacheService>,
        id: &str,
        name: &str,
    ) -> Result<ChannelRow, DataError> {
        channel::create_channel(self.pool(), cache, id, name)
            .await
            .map_err(Into::into)
    }

    async fn get_channel(
        &self,
        cache: Option<&CacheService>,
        id: &str,
    ) -> Result<Option<ChannelRow>, DataError> {
        channel::get_channel(self.pool(), cache, id)
            .await
            .map_err(Into::into)
    }

    async fn get_channel_member(
        &self,
        cache: Option<&CacheService>,
        channel_id: &str,
        user_id: &str,
    ) -> Result<Option<ChannelMemberRow>, DataError> {
        channel_member::get_channel_member(self.pool(), cache, channel_id, user_id)
            .await
            .map_err(Into::into)
    }

    async fn add_channel_member(
        &self,
        cache: Option<&CacheService>,
        channel_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<ChannelMemberRow, DataError> {
        channel_member::add_channel_member(self.pool(), cache, channel_id, user_id, role)
            .await
            .map_err(Into::into)
    }

    async fn remove_channel_member(
        &self,
        cache: Option<&CacheService>,
        channel_id: &str,
        user_id: &str,
    ) -> Result<bool, DataError> {
        channel_member::remove_channel_member(self.pool(), cache, channel_id, user_id)
            .await
            .map_err(Into::into)
    }

    async fn list_channel_members(
        &self,
        channel_id: &str,
    ) -> Result<Vec<ChannelMemberRow>, DataError> {
        channel_member::list_channel_members(self.pool(), channel_id)
            .await
            .map_err(Into::into)
    }

    async fn insert_message(
        &self,
        id: &str,
        channel_id: &str,
        user_id: &str,
        content: &str,
        message_type: &str,
        metadata: Option<&str>,
    ) -> Result<MessageRow, DataError> {
        message::insert_message(self.pool(), id, channel_id, user_id, content, message_type, metadata)
            .await
            .map_err(Into::into)
    }

    async fn get_message(&self, id: &str) -> Result<Option<MessageRow>, DataError> {
        message::get_message(self.pool(), id).await.map_err(Into::into)
    }

    async fn edit_message(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<Option<MessageRow>, DataError> {
        message::edit_message(self.pool(), id, user_id, content)
            .await
            .map_err(Into::into)
    }

    async fn soft_delete_message(&self, id: &str, user_id: &str) -> Result<bool, DataError> {
        message::soft_delete_message(self.pool(), id, user_id)
            .await
            .map_err(Into::into)
    }

    async fn list_messages_for_channel(
        &self,
        channel_id: &str,
        before: Option<i64>,
        limit: u32,
    ) -> Result<Vec<MessageRow>, DataError> {
        message::list_messages_for_channel(self.pool(), channel_id, before, limit)
            .await
            .map_err(Into::into)
    }

    async fn insert_message_metrics(&self, row: MessageMetricsRow) -> Result<(), DataError> {
        metrics::insert_message_metrics(self.pool(), row)
            .await
            .map_err(Into::into)
    }

    async fn insert_channel_metrics(&self, row: ChannelMetricsRow) -> Result<(), DataError> {
        metrics::insert_channel_metrics(self.pool(), row)
            .await
            .map_err(Into::into)
    }

    async fn insert_user_metrics(&self, row: UserMetricsRow) -> Result<(), DataError> {
        metrics::insert_user_metrics(self.pool(), row)
            .await
            .map_err(Into::into)
    }

    async fn get_session_token(&self, jti: &str) -> Result<Option<SessionTokenRow>, DataError> {
        session_token::get_session_token(self.pool(), None, jti)
            .await
            .map_err(Into::into)
    }
}

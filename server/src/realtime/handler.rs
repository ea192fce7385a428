//! Session Handler: per-connection state machine. Translates parsed client
//! frames into durable-store writes and broker publishes, and is the single
//! place the asymmetric echo/exclude rule (message fan-out includes the
//! sender, typing fan-out excludes it) is decided against the *publish*
//! side — the local dispatcher in `connection::ConnectionManager` decides it
//! again on the *delivery* side for cross-instance frames.

use std::sync::Arc;

use crate::core::constants::{CHANNEL_ROLE_MEMBER, MESSAGE_CONTENT_MAX_LEN};
use crate::data::TransactionalService;
use crate::data::cache::CacheService;
use crate::data::traits::has_min_role_level;
use crate::domain::events::{ClientFrame, DomainEvent, FanoutEvent, ServerFrame};

use super::broker::BrokerAdapter;
use super::connection::ConnectionManager;
use super::session::Session;

const MESSAGE_TYPES: [&str; 4] = ["text", "image", "file", "system"];

pub struct SessionHandler {
    connections: Arc<ConnectionManager>,
    broker: Arc<BrokerAdapter>,
    database: Arc<TransactionalService>,
    cache: Arc<CacheService>,
    session: Arc<Session>,
}

impl SessionHandler {
    pub fn new(
        connections: Arc<ConnectionManager>,
        broker: Arc<BrokerAdapter>,
        database: Arc<TransactionalService>,
        cache: Arc<CacheService>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            connections,
            broker,
            database,
            cache,
            session,
        }
    }

    /// `Authenticated -> Active`: register the session with the manager.
    pub async fn on_connect(&self) {
        self.connections.attach(Arc::clone(&self.session)).await;
    }

    /// `Closing -> Closed`: clear typing on every subscribed channel, then
    /// detach (which itself releases channel subscriptions and, if this was
    /// the user's last session, presence).
    pub async fn on_disconnect(&self) {
        for channel_id in self.session.subscribed_channels() {
            if let Err(error) = self.broker.clear_typing(&channel_id, &self.session.user_id).await {
                tracing::warn!(%channel_id, user_id = %self.session.user_id, %error, "failed to clear typing on disconnect");
            }
        }
        self.connections.detach(&self.session.session_id).await;
    }

    /// Parse and dispatch one inbound text frame. A frame that fails to
    /// parse as JSON, or whose `type` is unrecognized, yields an `error`
    /// frame rather than closing the session (spec: unknown types never
    /// close the connection).
    pub async fn handle_raw(&self, raw: &str) -> Option<ServerFrame> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => {
                return Some(ServerFrame::Error {
                    error: "malformed frame: not valid JSON".to_string(),
                    code: Some("validation".to_string()),
                    timestamp: chrono::Utc::now().timestamp(),
                });
            }
        };

        match serde_json::from_value::<ClientFrame>(value.clone()) {
            Ok(frame) => self.handle_frame(frame).await,
            Err(_) => Some(ServerFrame::Error {
                error: format!("unknown frame type: {}", ClientFrame::type_name(&value)),
                code: Some("validation".to_string()),
                timestamp: chrono::Utc::now().timestamp(),
            }),
        }
    }

    async fn handle_frame(&self, frame: ClientFrame) -> Option<ServerFrame> {
        self.session.touch();
        match frame {
            ClientFrame::Ping { .. } => self.handle_ping().await,
            ClientFrame::ChannelSubscribe { channel_id, .. } => self.handle_subscribe(channel_id).await,
            ClientFrame::ChannelUnsubscribe { channel_id, .. } => self.handle_unsubscribe(channel_id).await,
            ClientFrame::MessageSend {
                channel_id,
                content,
                message_type,
                metadata,
                ..
            } => self.handle_message_send(channel_id, content, message_type, metadata).await,
            ClientFrame::MessageEdit { message_id, content, .. } => {
                self.handle_message_edit(message_id, content).await
            }
            ClientFrame::MessageDelete { message_id, .. } => self.handle_message_delete(message_id).await,
            ClientFrame::TypingStart { channel_id, .. } => self.handle_typing_start(channel_id).await,
            ClientFrame::TypingStop { channel_id, .. } => self.handle_typing_stop(channel_id).await,
        }
    }

    async fn handle_ping(&self) -> Option<ServerFrame> {
        if let Err(error) = self.broker.mark_online(&self.session.user_id).await {
            tracing::warn!(user_id = %self.session.user_id, %error, "failed to refresh presence on ping");
        }
        Some(ServerFrame::Pong {
            timestamp: chrono::Utc::now().timestamp(),
        })
    }

    async fn handle_subscribe(&self, channel_id: String) -> Option<ServerFrame> {
        if channel_id.trim().is_empty() {
            return Some(Self::validation_error("channel_id must not be empty"));
        }

        match self.is_member(&channel_id).await {
            Ok(true) => {}
            Ok(false) => return Some(Self::authorization_error("not a member of this channel")),
            Err(error) => return Some(Self::store_error(error)),
        }

        self.connections.subscribe_local(&self.session, &channel_id).await;
        Some(ServerFrame::Success {
            message: "subscribed".to_string(),
            data: None,
            timestamp: chrono::Utc::now().timestamp(),
        })
    }

    async fn handle_unsubscribe(&self, channel_id: String) -> Option<ServerFrame> {
        self.connections.unsubscribe_local(&self.session, &channel_id).await;
        Some(ServerFrame::Success {
            message: "unsubscribed".to_string(),
            data: None,
            timestamp: chrono::Utc::now().timestamp(),
        })
    }

    async fn handle_message_send(
        &self,
        channel_id: String,
        content: String,
        message_type: String,
        metadata: Option<serde_json::Value>,
    ) -> Option<ServerFrame> {
        if content.trim().is_empty() {
            return Some(Self::validation_error("content must not be empty"));
        }
        if content.len() > MESSAGE_CONTENT_MAX_LEN {
            return Some(Self::validation_error("content exceeds maximum length"));
        }
        if !MESSAGE_TYPES.contains(&message_type.as_str()) {
            return Some(Self::validation_error("message_type must be one of text, image, file, system"));
        }

        match self.is_member(&channel_id).await {
            Ok(true) => {}
            Ok(false) => return Some(Self::authorization_error("not a member of this channel")),
            Err(error) => return Some(Self::store_error(error)),
        }

        let id = cuid2::create_id();
        let metadata_json = metadata.as_ref().map(|v| v.to_string());
        let metadata_for_event = metadata.clone();
        let row = match self
            .database
            .repository()
            .insert_message(&id, &channel_id, &self.session.user_id, &content, &message_type, metadata_json.as_deref())
            .await
        {
            Ok(row) => row,
            Err(error) => return Some(Self::store_error(error)),
        };

        let event = FanoutEvent::MessageReceive {
            message_id: row.id.clone(),
            channel_id: row.channel_id.clone(),
            user_id: row.user_id.clone(),
            username: self.session.username.clone(),
            content: row.content.clone(),
            message_type: row.message_type.clone(),
            metadata,
            created_at: row.created_at,
        };
        self.broker.publish_fanout(&self.broker.channel_topic(&channel_id), &event).await;

        let domain_event = DomainEvent {
            event_id: cuid2::create_id(),
            event_type: DomainEvent::TYPE_CREATED.to_string(),
            timestamp: row.created_at,
            user_id: Some(row.user_id.clone()),
            channel_id: Some(row.channel_id.clone()),
            message_id: Some(row.id.clone()),
            message_type: Some(row.message_type.clone()),
            content: Some(row.content.clone()),
            metadata: metadata_for_event,
            is_edited: false,
            is_deleted: false,
        };
        self.broker.publish_domain_event(&domain_event).await;

        None
    }

    async fn handle_message_edit(&self, message_id: String, content: String) -> Option<ServerFrame> {
        if content.trim().is_empty() {
            return Some(Self::validation_error("content must not be empty"));
        }
        if content.len() > MESSAGE_CONTENT_MAX_LEN {
            return Some(Self::validation_error("content exceeds maximum length"));
        }

        let row = match self
            .database
            .repository()
            .edit_message(&message_id, &self.session.user_id, &content)
            .await
        {
            Ok(Some(row)) => row,
            Ok(None) => return Some(Self::authorization_error("message not found or not authored by you")),
            Err(error) => return Some(Self::store_error(error)),
        };

        let event = FanoutEvent::MessageEdited {
            message_id: row.id.clone(),
            channel_id: row.channel_id.clone(),
            content: row.content.clone(),
            updated_at: row.updated_at,
        };
        self.broker.publish_fanout(&self.broker.channel_topic(&row.channel_id), &event).await;

        let domain_event = DomainEvent {
            event_id: cuid2::create_id(),
            event_type: DomainEvent::TYPE_EDITED.to_string(),
            timestamp: row.updated_at,
            user_id: Some(row.user_id.clone()),
            channel_id: Some(row.channel_id.clone()),
            message_id: Some(row.id.clone()),
            message_type: Some(row.message_type.clone()),
            content: Some(row.content.clone()),
            metadata: None,
            is_edited: true,
            is_deleted: false,
        };
        self.broker.publish_domain_event(&domain_event).await;

        None
    }

    async fn handle_message_delete(&self, message_id: String) -> Option<ServerFrame> {
        let existing = match self.database.repository().get_message(&message_id).await {
            Ok(Some(row)) => row,
            Ok(None) => return Some(Self::authorization_error("message not found")),
            Err(error) => return Some(Self::store_error(error)),
        };

        match self.database.repository().soft_delete_message(&message_id, &self.session.user_id).await {
            Ok(true) => {}
            Ok(false) => return Some(Self::authorization_error("message not found or not authored by you")),
            Err(error) => return Some(Self::store_error(error)),
        }

        let event = FanoutEvent::MessageDeleted {
            message_id: existing.id.clone(),
            channel_id: existing.channel_id.clone(),
        };
        self.broker.publish_fanout(&self.broker.channel_topic(&existing.channel_id), &event).await;

        let domain_event = DomainEvent {
            event_id: cuid2::create_id(),
            event_type: DomainEvent::TYPE_DELETED.to_string(),
            timestamp: existing.updated_at,
            user_id: Some(existing.user_id.clone()),
            channel_id: Some(existing.channel_id.clone()),
            message_id: Some(existing.id.clone()),
            message_type: Some(existing.message_type.clone()),
            content: None,
            metadata: None,
            is_edited: existing.is_edited,
            is_deleted: true,
        };
        self.broker.publish_domain_event(&domain_event).await;

        None
    }

    async fn handle_typing_start(&self, channel_id: String) -> Option<ServerFrame> {
        if let Err(error) = self.broker.set_typing(&channel_id, &self.session.user_id, &self.session.username).await {
            return Some(Self::store_error(error));
        }

        let event = FanoutEvent::TypingIndicator {
            channel_id: channel_id.clone(),
            user_id: self.session.user_id.clone(),
            username: self.session.username.clone(),
            is_typing: true,
        };
        self.broker.publish_fanout(&self.broker.channel_typing_topic(&channel_id), &event).await;
        None
    }

    async fn handle_typing_stop(&self, channel_id: String) -> Option<ServerFrame> {
        if let Err(error) = self.broker.clear_typing(&channel_id, &self.session.user_id).await {
            return Some(Self::store_error(error));
        }

        let event = FanoutEvent::TypingIndicator {
            channel_id: channel_id.clone(),
            user_id: self.session.user_id.clone(),
            username: self.session.username.clone(),
            is_typing: false,
        };
        self.broker.publish_fanout(&self.broker.channel_typing_topic(&channel_id), &event).await;
        None
    }

    async fn is_member(&self, channel_id: &str) -> Result<bool, crate::data::error::DataError> {
        let member = self
            .database
            .repository()
            .get_channel_member(Some(&self.cache), channel_id, &self.session.user_id)
            .await?;
        Ok(member.is_some_and(|row| has_min_role_level(&row.role, CHANNEL_ROLE_MEMBER)))
    }

    fn validation_error(message: &str) -> ServerFrame {
        ServerFrame::Error {
            error: message.to_string(),
            code: Some("validation".to_string()),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn authorization_error(message: &str) -> ServerFrame {
        ServerFrame::Error {
            error: message.to_string(),
            code: Some("authorization".to_string()),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn store_error(error: crate::data::error::DataError) -> ServerFrame {
        tracing::warn!(%error, "durable-store operation failed");
        ServerFrame::Error {
            error: "a server error occurred processing your request".to_string(),
            code: Some("durable-store".to_string()),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CacheBackendType, CacheConfig, EvictionPolicy, TransactionalBackend};
    use crate::core::storage::AppStorage;
    use crate::data::topics::TopicService;
    use tokio::sync::mpsc;

    async fn test_handler() -> (SessionHandler, mpsc::Receiver<ServerFrame>) {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.keep();
        std::fs::create_dir_all(data_dir.join("sqlite")).unwrap();
        let storage = AppStorage::init_for_test(data_dir);
        let database = Arc::new(
            TransactionalService::init(TransactionalBackend::Sqlite, &storage, None)
                .await
                .unwrap(),
        );

        let cache_config = CacheConfig {
            backend: CacheBackendType::Memory,
            max_entries: 1000,
            eviction_policy: EvictionPolicy::TinyLfu,
            redis_url: String::new(),
        };
        let cache = Arc::new(CacheService::new(&cache_config).await.unwrap());
        let topics = Arc::new(TopicService::new());
        let broker = Arc::new(BrokerAdapter::new(topics, Arc::clone(&cache), "events.messages".to_string()));
        let connections = ConnectionManager::new(Arc::clone(&broker));

        let (tx, rx) = mpsc::channel(16);
        let session = Session::new("s1".to_string(), "alice".to_string(), "alice".to_string(), tx);

        (
            SessionHandler::new(connections, broker, database, cache, session),
            rx,
        )
    }

    #[tokio::test]
    async fn test_ping_replies_pong() {
        let (handler, _rx) = test_handler().await;
        let reply = handler.handle_raw(r#"{"type":"ping"}"#).await;
        assert!(matches!(reply, Some(ServerFrame::Pong { .. })));
    }

    #[tokio::test]
    async fn test_unknown_type_yields_error_without_closing() {
        let (handler, _rx) = test_handler().await;
        let reply = handler.handle_raw(r#"{"type":"bogus.frame"}"#).await;
        match reply {
            Some(ServerFrame::Error { error, .. }) => assert!(error.contains("bogus.frame")),
            _ => panic!("expected error frame"),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_yields_error() {
        let (handler, _rx) = test_handler().await;
        let reply = handler.handle_raw("not json at all").await;
        assert!(matches!(reply, Some(ServerFrame::Error { .. })));
    }

    #[tokio::test]
    async fn test_subscribe_without_membership_is_rejected() {
        let (handler, _rx) = test_handler().await;
        let reply = handler
            .handle_raw(r#"{"type":"channel.subscribe","channel_id":"c1"}"#)
            .await;
        match reply {
            Some(ServerFrame::Error { code, .. }) => assert_eq!(code.as_deref(), Some("authorization")),
            _ => panic!("expected authorization error"),
        }
    }

    #[tokio::test]
    async fn test_subscribe_with_membership_succeeds() {
        let (handler, _rx) = test_handler().await;
        handler
            .database
            .repository()
            .create_channel(None, "c1", "general")
            .await
            .unwrap();
        handler
            .database
            .repository()
            .add_channel_member(None, "c1", "alice", CHANNEL_ROLE_MEMBER)
            .await
            .unwrap();

        let reply = handler
            .handle_raw(r#"{"type":"channel.subscribe","channel_id":"c1"}"#)
            .await;
        assert!(matches!(reply, Some(ServerFrame::Success { .. })));
        assert!(handler.session.is_subscribed("c1"));
    }

    #[tokio::test]
    async fn test_message_send_rejects_empty_content() {
        let (handler, _rx) = test_handler().await;
        let reply = handler
            .handle_raw(r#"{"type":"message.send","channel_id":"c1","content":"   ","message_type":"text"}"#)
            .await;
        match reply {
            Some(ServerFrame::Error { code, .. }) => assert_eq!(code.as_deref(), Some("validation")),
            _ => panic!("expected validation error"),
        }
    }

    #[tokio::test]
    async fn test_message_send_persists_and_echoes_without_direct_reply() {
        let (handler, _rx) = test_handler().await;
        handler
            .database
            .repository()
            .create_channel(None, "c1", "general")
            .await
            .unwrap();
        handler
            .database
            .repository()
            .add_channel_member(None, "c1", "alice", CHANNEL_ROLE_MEMBER)
            .await
            .unwrap();

        let reply = handler
            .handle_raw(r#"{"type":"message.send","channel_id":"c1","content":"hi","message_type":"text"}"#)
            .await;
        assert!(reply.is_none());

        let messages = handler
            .database
            .repository()
            .list_messages_for_channel("c1", None, 10)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_typing_start_stop_round_trip() {
        let (handler, _rx) = test_handler().await;
        let reply = handler.handle_raw(r#"{"type":"typing.start","channel_id":"c1"}"#).await;
        assert!(reply.is_none());
        assert!(handler.broker.is_healthy().await);

        let reply = handler.handle_raw(r#"{"type":"typing.stop","channel_id":"c1"}"#).await;
        assert!(reply.is_none());
    }
}

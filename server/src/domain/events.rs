//! Wire types shared between the realtime endpoint and the broker adapter.
//!
//! Two distinct encodings are in play:
//! - `ClientFrame` / `ServerFrame`: the JSON frames exchanged over the
//!   WebSocket itself (see the external-interfaces wire format).
//! - `FanoutEvent`: the payload carried on `channel:<id>`, `channel:<id>:typing`
//!   and `presence:updates`, gzip+JSON via `BroadcastTopic`.
//! - `DomainEvent` / `DomainEventEnvelope`: the payload carried on the
//!   aggregator's consumer-group stream topic.

use serde::{Deserialize, Serialize};

use crate::data::topics::TopicMessage;

/// Default for a frame's `timestamp` field when the sender omits it: the
/// frame still needs one (spec §6: "every frame has type and timestamp
/// fields"), but a client that skips it shouldn't be rejected over it.
fn default_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// Client -> server frames
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ClientFrame {
    #[serde(rename = "ping")]
    Ping {
        #[serde(default = "default_timestamp")]
        timestamp: i64,
    },
    #[serde(rename = "channel.subscribe")]
    ChannelSubscribe {
        channel_id: String,
        #[serde(default = "default_timestamp")]
        timestamp: i64,
    },
    #[serde(rename = "channel.unsubscribe")]
    ChannelUnsubscribe {
        channel_id: String,
        #[serde(default = "default_timestamp")]
        timestamp: i64,
    },
    #[serde(rename = "message.send")]
    MessageSend {
        channel_id: String,
        content: String,
        message_type: String,
        #[serde(default)]
        metadata: Option<serde_json::Value>,
        #[serde(default = "default_timestamp")]
        timestamp: i64,
    },
    #[serde(rename = "message.edit")]
    MessageEdit {
        message_id: String,
        content: String,
        #[serde(default = "default_timestamp")]
        timestamp: i64,
    },
    #[serde(rename = "message.delete")]
    MessageDelete {
        message_id: String,
        #[serde(default = "default_timestamp")]
        timestamp: i64,
    },
    #[serde(rename = "typing.start")]
    TypingStart {
        channel_id: String,
        #[serde(default = "default_timestamp")]
        timestamp: i64,
    },
    #[serde(rename = "typing.stop")]
    TypingStop {
        channel_id: String,
        #[serde(default = "default_timestamp")]
        timestamp: i64,
    },
}

impl ClientFrame {
    /// The `type` discriminant, for error messages naming an unknown frame.
    pub fn type_name(raw: &serde_json::Value) -> &str {
        raw.get("type").and_then(|v| v.as_str()).unwrap_or("?")
    }
}

// ============================================================================
// Server -> client frames
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ServerFrame {
    #[serde(rename = "message.receive")]
    MessageReceive {
        message_id: String,
        channel_id: String,
        user_id: String,
        username: String,
        content: String,
        message_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
        created_at: i64,
        timestamp: i64,
    },
    #[serde(rename = "message.edited")]
    MessageEdited {
        message_id: String,
        channel_id: String,
        content: String,
        updated_at: i64,
        timestamp: i64,
    },
    #[serde(rename = "message.deleted")]
    MessageDeleted {
        message_id: String,
        channel_id: String,
        timestamp: i64,
    },
    #[serde(rename = "typing.indicator")]
    TypingIndicator {
        channel_id: String,
        user_id: String,
        username: String,
        is_typing: bool,
        timestamp: i64,
    },
    #[serde(rename = "presence.update")]
    PresenceUpdate {
        user_id: String,
        status: String,
        timestamp: i64,
    },
    #[serde(rename = "success")]
    Success {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        timestamp: i64,
    },
    #[serde(rename = "error")]
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        timestamp: i64,
    },
    #[serde(rename = "pong")]
    Pong { timestamp: i64 },
}

impl ServerFrame {
    /// Stamp the frame's `timestamp` with the current time. Direct replies
    /// are stamped at construction in `SessionHandler`; fan-out frames are
    /// stamped here at the single point `ConnectionManager::broadcast_channel`
    /// hands them to local subscribers, so every recipient of one fan-out
    /// sees the same value.
    pub fn stamp_now(&mut self) {
        let now = chrono::Utc::now().timestamp();
        match self {
            ServerFrame::MessageReceive { timestamp, .. }
            | ServerFrame::MessageEdited { timestamp, .. }
            | ServerFrame::MessageDeleted { timestamp, .. }
            | ServerFrame::TypingIndicator { timestamp, .. }
            | ServerFrame::PresenceUpdate { timestamp, .. }
            | ServerFrame::Success { timestamp, .. }
            | ServerFrame::Error { timestamp, .. }
            | ServerFrame::Pong { timestamp } => *timestamp = now,
        }
    }
}

// ============================================================================
// Cross-instance fan-out payload (channel:<id>, channel:<id>:typing, presence:updates)
// ============================================================================

/// Payload carried on the broker's broadcast topics. A strict subset of
/// `ServerFrame`: only the variants that make sense to replay on another
/// instance (no `success`/`error`/`pong`, which are session-local).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum FanoutEvent {
    MessageReceive {
        message_id: String,
        channel_id: String,
        user_id: String,
        username: String,
        content: String,
        message_type: String,
        metadata: Option<serde_json::Value>,
        created_at: i64,
    },
    MessageEdited {
        message_id: String,
        channel_id: String,
        content: String,
        updated_at: i64,
    },
    MessageDeleted {
        message_id: String,
        channel_id: String,
    },
    TypingIndicator {
        channel_id: String,
        user_id: String,
        username: String,
        is_typing: bool,
    },
    PresenceUpdate {
        user_id: String,
        status: String,
    },
}

impl FanoutEvent {
    /// The channel this event fans out to, when relevant to local delivery.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::MessageReceive { channel_id, .. }
            | Self::MessageEdited { channel_id, .. }
            | Self::MessageDeleted { channel_id, .. }
            | Self::TypingIndicator { channel_id, .. } => Some(channel_id),
            Self::PresenceUpdate { .. } => None,
        }
    }

    /// Originating user/session, used to exclude the sender from their own
    /// typing echo (`alice` does NOT receive her own typing frames).
    pub fn origin_session_id(&self) -> Option<&str> {
        None
    }
}

impl From<FanoutEvent> for ServerFrame {
    /// `timestamp` is left at a placeholder here: `ConnectionManager::
    /// broadcast_channel` overwrites it via `stamp_now()` before any
    /// recipient sees the frame, since this conversion runs once per
    /// dispatcher iteration but delivery is what the wire timestamp should
    /// reflect.
    fn from(event: FanoutEvent) -> Self {
        match event {
            FanoutEvent::MessageReceive {
                message_id,
                channel_id,
                user_id,
                username,
                content,
                message_type,
                metadata,
                created_at,
            } => ServerFrame::MessageReceive {
                message_id,
                channel_id,
                user_id,
                username,
                content,
                message_type,
                metadata,
                created_at,
                timestamp: 0,
            },
            FanoutEvent::MessageEdited {
                message_id,
                channel_id,
                content,
                updated_at,
            } => ServerFrame::MessageEdited {
                message_id,
                channel_id,
                content,
                updated_at,
                timestamp: 0,
            },
            FanoutEvent::MessageDeleted {
                message_id,
                channel_id,
            } => ServerFrame::MessageDeleted {
                message_id,
                channel_id,
                timestamp: 0,
            },
            FanoutEvent::TypingIndicator {
                channel_id,
                user_id,
                username,
                is_typing,
            } => ServerFrame::TypingIndicator {
                channel_id,
                user_id,
                username,
                is_typing,
                timestamp: 0,
            },
            FanoutEvent::PresenceUpdate { user_id, status } => ServerFrame::PresenceUpdate {
                user_id,
                status,
                timestamp: 0,
            },
        }
    }
}

impl TopicMessage for FanoutEvent {
    fn size_bytes(&self) -> usize {
        serde_json::to_vec(self).map(|b| b.len()).unwrap_or(128)
    }
}

// ============================================================================
// Domain event stream (events.messages), consumed by the metrics aggregator
// ============================================================================

/// One event on the aggregator's domain event stream.
///
/// The wire encoding mandated for this topic is JSON UTF-8 (see external
/// interfaces), but the underlying stream transport here is a consumer-group
/// stream that frames payloads as protobuf (`DomainEventEnvelope`); the JSON
/// bytes travel verbatim inside its `payload` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: String,
    pub event_type: String,
    pub timestamp: i64,
    pub user_id: Option<String>,
    pub channel_id: Option<String>,
    pub message_id: Option<String>,
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub is_edited: bool,
    pub is_deleted: bool,
}

impl DomainEvent {
    pub const TYPE_CREATED: &'static str = "message.created";
    pub const TYPE_EDITED: &'static str = "message.edited";
    pub const TYPE_DELETED: &'static str = "message.deleted";
}

/// Protobuf envelope wrapping a JSON-encoded `DomainEvent`.
///
/// Hand-derived rather than generated from a `.proto` file: the schema is a
/// single opaque byte field, so there is nothing for `prost-build` to add.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DomainEventEnvelope {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
}

impl TopicMessage for DomainEventEnvelope {
    fn size_bytes(&self) -> usize {
        self.payload.len()
    }
}

impl DomainEventEnvelope {
    pub fn encode(event: &DomainEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            payload: serde_json::to_vec(event)?,
        })
    }

    pub fn decode(&self) -> Result<DomainEvent, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_message_send_parses() {
        let raw = serde_json::json!({
            "type": "message.send",
            "channel_id": "c1",
            "content": "hi",
            "message_type": "text",
            "timestamp": 1234,
        });
        let frame: ClientFrame = serde_json::from_value(raw).unwrap();
        match frame {
            ClientFrame::MessageSend {
                channel_id,
                content,
                message_type,
                ..
            } => {
                assert_eq!(channel_id, "c1");
                assert_eq!(content, "hi");
                assert_eq!(message_type, "text");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_client_frame_unknown_type_fails_to_parse() {
        let raw = serde_json::json!({"type": "bogus"});
        let result: Result<ClientFrame, _> = serde_json::from_value(raw);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_frame_serializes_tag() {
        let frame = ServerFrame::Pong { timestamp: 1000 };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "pong");
        assert_eq!(json["timestamp"], 1000);
    }

    #[test]
    fn test_stamp_now_overwrites_timestamp() {
        let mut frame = ServerFrame::Pong { timestamp: 0 };
        frame.stamp_now();
        match frame {
            ServerFrame::Pong { timestamp } => assert!(timestamp > 0),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_fanout_event_round_trip() {
        let event = FanoutEvent::TypingIndicator {
            channel_id: "c1".to_string(),
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            is_typing: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: FanoutEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.channel_id(), back.channel_id());
    }

    #[test]
    fn test_domain_event_envelope_round_trip() {
        let event = DomainEvent {
            event_id: "e1".to_string(),
            event_type: DomainEvent::TYPE_CREATED.to_string(),
            timestamp: 1000,
            user_id: Some("u1".to_string()),
            channel_id: Some("c1".to_string()),
            message_id: Some("m1".to_string()),
            message_type: Some("text".to_string()),
            content: Some("hi".to_string()),
            metadata: None,
            is_edited: false,
            is_deleted: false,
        };
        let envelope = DomainEventEnvelope::encode(&event).unwrap();
        let decoded = envelope.decode().unwrap();
        assert_eq!(decoded.event_id, "e1");
        assert_eq!(decoded.channel_id.as_deref(), Some("c1"));
    }
}

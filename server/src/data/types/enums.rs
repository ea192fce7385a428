//! Classification enums for the chat domain
//!
//! These enums are used across all database backends for consistent
//! classification of channel membership, messages, and presence.

use serde::{Deserialize, Serialize};

// ============================================================================
// CHANNEL MEMBERSHIP
// ============================================================================

/// Role a user holds within a channel.
///
/// Ordered from least to most privileged; `has_min_role_level` in
/// `data::traits` compares roles using this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    #[default]
    Member,
    Admin,
    Owner,
}

impl ChannelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Numeric level for ordering comparisons (higher is more privileged).
    pub fn level(&self) -> u8 {
        match self {
            Self::Member => 0,
            Self::Admin => 1,
            Self::Owner => 2,
        }
    }
}

// ============================================================================
// MESSAGES
// ============================================================================

/// The kind of content carried by a channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "file" => Some(Self::File),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

// ============================================================================
// PRESENCE
// ============================================================================

/// User presence status, tracked in the volatile KV store (not durable).
///
/// `Away` is accepted on the wire for forward compatibility with clients
/// that set it explicitly, but the server's own presence tracking only
/// ever transitions between `Online` and `Offline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    #[default]
    Offline,
    Away,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Away => "away",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            "away" => Some(Self::Away),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_role_as_str_and_back() {
        for role in [ChannelRole::Member, ChannelRole::Admin, ChannelRole::Owner] {
            assert_eq!(ChannelRole::from_str(role.as_str()), Some(role));
        }
        assert!(ChannelRole::from_str("nope").is_none());
    }

    #[test]
    fn test_channel_role_ordering() {
        assert!(ChannelRole::Owner.level() > ChannelRole::Admin.level());
        assert!(ChannelRole::Admin.level() > ChannelRole::Member.level());
    }

    #[test]
    fn test_message_type_as_str_and_back() {
        for ty in [
            MessageType::Text,
            MessageType::Image,
            MessageType::File,
            MessageType::System,
        ] {
            assert_eq!(MessageType::from_str(ty.as_str()), Some(ty));
        }
    }

    #[test]
    fn test_presence_status_as_str_and_back() {
        for status in [
            PresenceStatus::Online,
            PresenceStatus::Offline,
            PresenceStatus::Away,
        ] {
            assert_eq!(PresenceStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_presence_status_default_is_offline() {
        assert_eq!(PresenceStatus::default(), PresenceStatus::Offline);
    }
}

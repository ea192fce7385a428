//! Broker Adapter: the realtime edge's view of the pub/sub bus and the
//! volatile KV that backs presence and typing state.
//!
//! Wraps `data::topics::TopicService` (fan-out + domain event stream) and
//! `data::cache::CacheService` (presence/typing, raw unversioned keys from
//! `core::constants`) behind the operations spec.md §4.1 names. Publish
//! failures here are retried with bounded backoff and then only logged —
//! the caller's durable write has already happened by the time this is
//! invoked, so a lost fan-out frame never gets surfaced to the client that
//! sent it (spec §4.1, §12 "broker" kind).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::constants::{
    CHANNEL_TOPIC_PREFIX, CHANNEL_TYPING_TOPIC_SUFFIX, PRESENCE_KEY_PREFIX, PRESENCE_TTL_SECS,
    PRESENCE_VALUE_ONLINE, TOPIC_PRESENCE_UPDATES, TYPING_KEY_PREFIX, TYPING_TTL_SECS,
};
use crate::data::cache::{CacheError, CacheService};
use crate::data::topics::{BroadcastTopic, StreamTopic, TopicService};
use crate::domain::events::{DomainEvent, DomainEventEnvelope, FanoutEvent};
use crate::utils::retry::retry_with_backoff_async;

/// Max attempts and base delay for fan-out/event publish retries. Capped at
/// a few seconds total, per spec's "exponential backoff capped at a few
/// seconds" (§4.1).
const PUBLISH_MAX_ATTEMPTS: u32 = 4;
const PUBLISH_BASE_DELAY_MS: u64 = 100;

pub struct BrokerAdapter {
    topics: Arc<TopicService>,
    cache: Arc<CacheService>,
    events_topic_name: String,
}

impl BrokerAdapter {
    pub fn new(topics: Arc<TopicService>, cache: Arc<CacheService>, events_topic_name: String) -> Self {
        Self {
            topics,
            cache,
            events_topic_name,
        }
    }

    // ==================== Topics ====================

    pub fn channel_topic(&self, channel_id: &str) -> BroadcastTopic<FanoutEvent> {
        self.topics
            .broadcast_topic(&format!("{CHANNEL_TOPIC_PREFIX}{channel_id}"))
    }

    pub fn channel_typing_topic(&self, channel_id: &str) -> BroadcastTopic<FanoutEvent> {
        self.topics.broadcast_topic(&format!(
            "{CHANNEL_TOPIC_PREFIX}{channel_id}{CHANNEL_TYPING_TOPIC_SUFFIX}"
        ))
    }

    pub fn presence_topic(&self) -> BroadcastTopic<FanoutEvent> {
        self.topics.broadcast_topic(TOPIC_PRESENCE_UPDATES)
    }

    pub fn events_topic(&self) -> StreamTopic<DomainEventEnvelope> {
        self.topics.stream_topic(&self.events_topic_name)
    }

    /// Publish a fan-out event with bounded retry. Never returns an error:
    /// by contract the durable write already succeeded, so a publish
    /// failure here is logged and swallowed (spec §4.1).
    pub async fn publish_fanout(&self, topic: &BroadcastTopic<FanoutEvent>, event: &FanoutEvent) {
        let result = retry_with_backoff_async(PUBLISH_MAX_ATTEMPTS, PUBLISH_BASE_DELAY_MS, || async {
            topic.publish(event).await.map_err(|e| e.to_string())
        })
        .await;

        if let Err((error, attempts)) = result {
            tracing::warn!(
                topic = topic.name(),
                attempts,
                %error,
                "fan-out publish failed after retries; durable write unaffected"
            );
        }
    }

    /// Publish a domain event to the aggregator's stream. Same non-fatal
    /// retry-then-log contract as `publish_fanout`.
    pub async fn publish_domain_event(&self, event: &DomainEvent) {
        let envelope = match DomainEventEnvelope::encode(event) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(%error, "failed to encode domain event, dropping");
                return;
            }
        };

        let topic = self.events_topic();
        let result = retry_with_backoff_async(PUBLISH_MAX_ATTEMPTS, PUBLISH_BASE_DELAY_MS, || async {
            topic.publish(&envelope).await.map(|_| ()).map_err(|e| e.to_string())
        })
        .await;

        if let Err((error, attempts)) = result {
            tracing::warn!(attempts, %error, "domain event publish failed after retries");
        }
    }

    // ==================== Presence ====================

    fn presence_key(user_id: &str) -> String {
        format!("{PRESENCE_KEY_PREFIX}{user_id}")
    }

    pub async fn mark_online(&self, user_id: &str) -> Result<(), CacheError> {
        self.cache
            .set_raw(
                &Self::presence_key(user_id),
                PRESENCE_VALUE_ONLINE.as_bytes().to_vec(),
                Some(Duration::from_secs(PRESENCE_TTL_SECS)),
            )
            .await
    }

    pub async fn mark_offline(&self, user_id: &str) -> Result<bool, CacheError> {
        self.cache.delete(&Self::presence_key(user_id)).await
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.cache
            .exists(&Self::presence_key(user_id))
            .await
            .unwrap_or(false)
    }

    // ==================== Typing ====================
    //
    // The volatile KV has no native hash-field primitive (`CacheBackend`
    // only exposes whole-value get/set/delete), so the per-channel typing
    // hash is represented as one serialized `user_id -> username` map under
    // `typing:<channel_id>`, re-written with a refreshed TTL on every
    // `set_typing`/`clear_typing`. Two concurrent `typing.start` calls for
    // different users on the same channel can race and clobber each other's
    // entry; acceptable since typing state is ephemeral and re-asserted by
    // the client on its own cadence.

    fn typing_key(channel_id: &str) -> String {
        format!("{TYPING_KEY_PREFIX}{channel_id}")
    }

    pub async fn set_typing(&self, channel_id: &str, user_id: &str, username: &str) -> Result<(), CacheError> {
        let key = Self::typing_key(channel_id);
        let mut entries: HashMap<String, String> = self.cache.get(&key).await?.unwrap_or_default();
        entries.insert(user_id.to_string(), username.to_string());
        self.cache
            .set(&key, &entries, Some(Duration::from_secs(TYPING_TTL_SECS)))
            .await
    }

    pub async fn clear_typing(&self, channel_id: &str, user_id: &str) -> Result<(), CacheError> {
        let key = Self::typing_key(channel_id);
        let Some(mut entries) = self.cache.get::<HashMap<String, String>>(&key).await? else {
            return Ok(());
        };
        entries.remove(user_id);
        if entries.is_empty() {
            self.cache.delete(&key).await?;
        } else {
            self.cache
                .set(&key, &entries, Some(Duration::from_secs(TYPING_TTL_SECS)))
                .await?;
        }
        Ok(())
    }

    // ==================== Health ====================

    pub async fn is_healthy(&self) -> bool {
        self.topics.health_check().await.is_ok()
    }

    pub fn backend_name(&self) -> &'static str {
        self.topics.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CacheBackendType, CacheConfig, EvictionPolicy};

    async fn test_adapter() -> BrokerAdapter {
        let cache_config = CacheConfig {
            backend: CacheBackendType::Memory,
            max_entries: 1000,
            eviction_policy: EvictionPolicy::TinyLfu,
            redis_url: String::new(),
        };
        let cache = Arc::new(CacheService::new(&cache_config).await.unwrap());
        let topics = Arc::new(TopicService::new());
        BrokerAdapter::new(topics, cache, "events.messages".to_string())
    }

    #[tokio::test]
    async fn test_presence_lifecycle() {
        let adapter = test_adapter().await;
        assert!(!adapter.is_online("u1").await);
        adapter.mark_online("u1").await.unwrap();
        assert!(adapter.is_online("u1").await);
        adapter.mark_offline("u1").await.unwrap();
        assert!(!adapter.is_online("u1").await);
    }

    #[tokio::test]
    async fn test_typing_set_and_clear() {
        let adapter = test_adapter().await;
        adapter.set_typing("c1", "u1", "alice").await.unwrap();
        let key = BrokerAdapter::typing_key("c1");
        let entries: HashMap<String, String> = adapter.cache.get(&key).await.unwrap().unwrap();
        assert_eq!(entries.get("u1"), Some(&"alice".to_string()));

        adapter.clear_typing("c1", "u1").await.unwrap();
        assert!(adapter.cache.get::<HashMap<String, String>>(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_typing_is_idempotent() {
        let adapter = test_adapter().await;
        adapter.clear_typing("c1", "nobody").await.unwrap();
        adapter.clear_typing("c1", "nobody").await.unwrap();
    }

    #[tokio::test]
    async fn test_typing_keeps_other_users_entries() {
        let adapter = test_adapter().await;
        adapter.set_typing("c1", "u1", "alice").await.unwrap();
        adapter.set_typing("c1", "u2", "bob").await.unwrap();
        adapter.clear_typing("c1", "u1").await.unwrap();

        let key = BrokerAdapter::typing_key("c1");
        let entries: HashMap<String, String> = adapter.cache.get(&key).await.unwrap().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("u2"), Some(&"bob".to_string()));
    }
}

//! Connection Manager: the in-process registry of sessions, user→sessions,
//! and channel→subscribers indexes, plus the local fan-out dispatchers that
//! bridge the broker's per-channel topics into the local subscriber set.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tokio::task::AbortHandle;

use super::broker::BrokerAdapter;
use super::session::{Session, SessionId};
use crate::domain::events::{FanoutEvent, ServerFrame};

/// The two per-channel background dispatchers (message fan-out, typing
/// fan-out) kept alive only while the channel has at least one local
/// subscriber.
struct ChannelDispatchers {
    message: AbortHandle,
    typing: AbortHandle,
}

impl Drop for ChannelDispatchers {
    fn drop(&mut self) {
        self.message.abort();
        self.typing.abort();
    }
}

/// Snapshot used by the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStats {
    pub total_sessions: usize,
    pub unique_users_online: usize,
    pub active_channel_count: usize,
}

pub struct ConnectionManager {
    sessions: DashMap<SessionId, Arc<Session>>,
    sessions_by_user: DashMap<String, DashSet<SessionId>>,
    channels: DashMap<String, DashSet<SessionId>>,
    dispatchers: DashMap<String, ChannelDispatchers>,
    broker: Arc<BrokerAdapter>,
}

impl ConnectionManager {
    pub fn new(broker: Arc<BrokerAdapter>) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            sessions_by_user: DashMap::new(),
            channels: DashMap::new(),
            dispatchers: DashMap::new(),
            broker,
        })
    }

    /// Insert a session into the registry. On the first session for a user,
    /// marks the user online and publishes a presence event.
    pub async fn attach(self: &Arc<Self>, session: Arc<Session>) {
        let user_id = session.user_id.clone();
        let session_id = session.session_id.clone();
        self.sessions.insert(session_id.clone(), Arc::clone(&session));

        let is_first = {
            let set = self.sessions_by_user.entry(user_id.clone()).or_default();
            set.insert(session_id.clone());
            set.len() == 1
        };

        if is_first {
            if let Err(error) = self.broker.mark_online(&user_id).await {
                tracing::warn!(%user_id, %error, "failed to mark user online");
            }
            let event = FanoutEvent::PresenceUpdate {
                user_id: user_id.clone(),
                status: "online".to_string(),
            };
            self.broker.publish_fanout(&self.broker.presence_topic(), &event).await;
        }

        tracing::debug!(%session_id, %user_id, "session attached");
    }

    /// Remove a session: from every channel it was subscribed to, from the
    /// user index, and from the session table. On the last session for a
    /// user, marks the user offline and publishes a presence event.
    pub async fn detach(self: &Arc<Self>, session_id: &str) {
        let Some((_, session)) = self.sessions.remove(session_id) else {
            return;
        };
        let user_id = session.user_id.clone();

        for channel_id in session.subscribed_channels() {
            self.unsubscribe_local(&session, &channel_id).await;
        }

        let became_empty = match self.sessions_by_user.get(&user_id) {
            Some(set) => {
                set.remove(session_id);
                set.is_empty()
            }
            None => false,
        };
        if became_empty {
            self.sessions_by_user.remove(&user_id);
            if let Err(error) = self.broker.mark_offline(&user_id).await {
                tracing::warn!(%user_id, %error, "failed to mark user offline");
            }
            let event = FanoutEvent::PresenceUpdate {
                user_id: user_id.clone(),
                status: "offline".to_string(),
            };
            self.broker.publish_fanout(&self.broker.presence_topic(), &event).await;
        }

        tracing::debug!(%session_id, %user_id, "session detached");
    }

    /// Add `channel_id` to both the session's and the manager's indexes. On
    /// the first local subscriber for a channel, spawns the dispatchers that
    /// bridge the channel's broker topics into this instance's subscribers.
    pub async fn subscribe_local(self: &Arc<Self>, session: &Arc<Session>, channel_id: &str) {
        if !session.insert_channel(channel_id) {
            return;
        }

        let first_local = {
            let set = self.channels.entry(channel_id.to_string()).or_default();
            set.insert(session.session_id.clone());
            set.len() == 1
        };

        if first_local {
            self.spawn_dispatchers(channel_id.to_string());
        }

        tracing::debug!(session_id = %session.session_id, %channel_id, "subscribed to channel");
    }

    /// Reverse of `subscribe_local`. Idempotent: unsubscribing from a
    /// channel the session isn't in is a no-op. Releases the broker
    /// subscription once the last local subscriber leaves.
    pub async fn unsubscribe_local(self: &Arc<Self>, session: &Arc<Session>, channel_id: &str) {
        if !session.remove_channel(channel_id) {
            return;
        }

        let now_empty = match self.channels.get(channel_id) {
            Some(set) => {
                set.remove(&session.session_id);
                set.is_empty()
            }
            None => false,
        };

        if now_empty {
            self.channels.remove(channel_id);
            self.dispatchers.remove(channel_id);
        }

        tracing::debug!(session_id = %session.session_id, %channel_id, "unsubscribed from channel");
    }

    /// Enqueue a frame onto one session's outbound sink. On backpressure or
    /// a closed sink, the session is marked stale and detached on the next
    /// scheduler turn rather than blocking the caller.
    pub fn deliver(self: &Arc<Self>, session_id: &str, frame: ServerFrame) {
        let Some(session) = self.sessions.get(session_id).map(|s| Arc::clone(&s)) else {
            return;
        };

        if session.try_send(frame).is_err() {
            tracing::warn!(%session_id, "outbound sink full or closed; scheduling detach");
            let manager = Arc::clone(self);
            let session_id = session_id.to_string();
            tokio::spawn(async move { manager.detach(&session_id).await });
        }
    }

    /// Deliver a frame to every local subscriber of `channel_id`, skipping
    /// sessions owned by `exclude_user_id` if given. A slow or dead
    /// subscriber never blocks delivery to the rest (`deliver` never awaits
    /// the socket itself).
    pub fn broadcast_channel(self: &Arc<Self>, channel_id: &str, frame: ServerFrame, exclude_user_id: Option<&str>) {
        let session_ids: Vec<SessionId> = match self.channels.get(channel_id) {
            Some(set) => set.iter().map(|id| (*id).clone()).collect(),
            None => return,
        };

        let mut frame = frame;
        frame.stamp_now();

        for session_id in session_ids {
            if let Some(session) = self.sessions.get(&session_id) {
                if exclude_user_id == Some(session.user_id.as_str()) {
                    continue;
                }
            } else {
                continue;
            }
            self.deliver(&session_id, frame.clone());
        }
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            total_sessions: self.sessions.len(),
            unique_users_online: self.sessions_by_user.len(),
            active_channel_count: self.channels.len(),
        }
    }

    fn spawn_dispatchers(self: &Arc<Self>, channel_id: String) {
        let message = {
            let manager = Arc::clone(self);
            let channel_id = channel_id.clone();
            tokio::spawn(async move { manager.run_message_dispatcher(channel_id).await })
                .abort_handle()
        };
        let typing = {
            let manager = Arc::clone(self);
            let channel_id = channel_id.clone();
            tokio::spawn(async move { manager.run_typing_dispatcher(channel_id).await })
                .abort_handle()
        };
        self.dispatchers.insert(channel_id, ChannelDispatchers { message, typing });
    }

    /// Bridges `channel:<id>` into the local subscriber set. The sender is
    /// never excluded here: scenario 1 requires the sender to receive its
    /// own echo.
    async fn run_message_dispatcher(self: Arc<Self>, channel_id: String) {
        let topic = self.broker.channel_topic(&channel_id);
        let mut subscriber = match topic.subscribe().await {
            Ok(subscriber) => subscriber,
            Err(error) => {
                tracing::warn!(%channel_id, %error, "failed to subscribe to channel topic");
                return;
            }
        };

        loop {
            match subscriber.recv().await {
                Ok(event) => self.broadcast_channel(&channel_id, event.into(), None),
                Err(error) => {
                    tracing::warn!(%channel_id, %error, "channel dispatcher ending");
                    break;
                }
            }
        }
    }

    /// Bridges `channel:<id>:typing` into the local subscriber set, skipping
    /// the typing user's own sessions (scenario 3: a user never receives
    /// their own typing indicator).
    async fn run_typing_dispatcher(self: Arc<Self>, channel_id: String) {
        let topic = self.broker.channel_typing_topic(&channel_id);
        let mut subscriber = match topic.subscribe().await {
            Ok(subscriber) => subscriber,
            Err(error) => {
                tracing::warn!(%channel_id, %error, "failed to subscribe to channel typing topic");
                return;
            }
        };

        loop {
            match subscriber.recv().await {
                Ok(event) => {
                    let exclude_user_id = match &event {
                        FanoutEvent::TypingIndicator { user_id, .. } => Some(user_id.clone()),
                        _ => None,
                    };
                    self.broadcast_channel(&channel_id, event.into(), exclude_user_id.as_deref());
                }
                Err(error) => {
                    tracing::warn!(%channel_id, %error, "typing dispatcher ending");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CacheBackendType, CacheConfig, EvictionPolicy};
    use crate::data::cache::CacheService;
    use crate::data::topics::TopicService;
    use tokio::sync::mpsc;

    async fn test_manager() -> Arc<ConnectionManager> {
        let cache_config = CacheConfig {
            backend: CacheBackendType::Memory,
            max_entries: 1000,
            eviction_policy: EvictionPolicy::TinyLfu,
            redis_url: String::new(),
        };
        let cache = Arc::new(CacheService::new(&cache_config).await.unwrap());
        let topics = Arc::new(TopicService::new());
        let broker = Arc::new(BrokerAdapter::new(topics, cache, "events.messages".to_string()));
        ConnectionManager::new(broker)
    }

    fn make_session(id: &str, user_id: &str) -> (Arc<Session>, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(8);
        (Session::new(id.to_string(), user_id.to_string(), "name".to_string(), tx), rx)
    }

    #[tokio::test]
    async fn test_attach_detach_updates_stats() {
        let manager = test_manager().await;
        let (session, _rx) = make_session("s1", "u1");
        manager.attach(Arc::clone(&session)).await;
        assert_eq!(manager.stats().total_sessions, 1);
        assert_eq!(manager.stats().unique_users_online, 1);

        manager.detach("s1").await;
        assert_eq!(manager.stats().total_sessions, 0);
        assert_eq!(manager.stats().unique_users_online, 0);
    }

    #[tokio::test]
    async fn test_multi_session_presence_survives_partial_detach() {
        let manager = test_manager().await;
        let (s1, _r1) = make_session("s1", "u1");
        let (s2, _r2) = make_session("s2", "u1");
        manager.attach(Arc::clone(&s1)).await;
        manager.attach(Arc::clone(&s2)).await;
        assert!(manager.broker.is_online("u1").await);

        manager.detach("s1").await;
        assert!(manager.broker.is_online("u1").await);

        manager.detach("s2").await;
        assert!(!manager.broker.is_online("u1").await);
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe_round_trip_leaves_indexes_empty() {
        let manager = test_manager().await;
        let (session, _rx) = make_session("s1", "u1");
        manager.attach(Arc::clone(&session)).await;

        manager.subscribe_local(&session, "c1").await;
        assert_eq!(manager.stats().active_channel_count, 1);
        assert!(session.is_subscribed("c1"));

        manager.unsubscribe_local(&session, "c1").await;
        assert_eq!(manager.stats().active_channel_count, 0);
        assert!(!session.is_subscribed("c1"));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let manager = test_manager().await;
        let (session, _rx) = make_session("s1", "u1");
        manager.attach(Arc::clone(&session)).await;
        manager.unsubscribe_local(&session, "never-subscribed").await;
    }

    #[tokio::test]
    async fn test_broadcast_skips_excluded_user() {
        let manager = test_manager().await;
        let (alice, mut alice_rx) = make_session("s1", "alice");
        let (bob, mut bob_rx) = make_session("s2", "bob");
        manager.attach(Arc::clone(&alice)).await;
        manager.attach(Arc::clone(&bob)).await;
        manager.channels.entry("c1".to_string()).or_default().insert("s1".to_string());
        manager.channels.entry("c1".to_string()).or_default().insert("s2".to_string());

        manager.broadcast_channel("c1", ServerFrame::Pong { timestamp: 0 }, Some("alice"));

        assert!(bob_rx.try_recv().is_ok());
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_channel_is_noop() {
        let manager = test_manager().await;
        manager.broadcast_channel("nobody-here", ServerFrame::Pong { timestamp: 0 }, None);
    }

    #[tokio::test]
    async fn test_deliver_detaches_on_full_sink() {
        let manager = test_manager().await;
        let (tx, _rx) = mpsc::channel(1);
        let session = Session::new("s1".to_string(), "u1".to_string(), "name".to_string(), tx);
        manager.attach(Arc::clone(&session)).await;
        session.try_send(ServerFrame::Pong { timestamp: 0 }).unwrap();

        manager.deliver("s1", ServerFrame::Pong { timestamp: 0 });
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(manager.stats().total_sessions, 0);
    }
}

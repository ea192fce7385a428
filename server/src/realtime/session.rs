//! Session: identity plus an outbound frame sink for one connection.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::domain::events::ServerFrame;

/// Opaque per-connection identifier, distinct from `user_id` (a user may own
/// several concurrent sessions).
pub type SessionId = String;

/// One authenticated full-duplex connection for a user.
///
/// Mutated only by its owning `ConnectionManager`/`SessionHandler`; the
/// subscribed-channel set here is the source of truth the manager's
/// `channels` index is derived from (see `connection::ConnectionManager`).
pub struct Session {
    pub session_id: SessionId,
    pub user_id: String,
    pub username: String,
    outbound: mpsc::Sender<ServerFrame>,
    channels: RwLock<HashSet<String>>,
    last_seen: AtomicI64,
}

impl Session {
    pub fn new(
        session_id: SessionId,
        user_id: String,
        username: String,
        outbound: mpsc::Sender<ServerFrame>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            user_id,
            username,
            outbound,
            channels: RwLock::new(HashSet::new()),
            last_seen: AtomicI64::new(chrono::Utc::now().timestamp()),
        })
    }

    /// Enqueue a frame onto the outbound sink. Fails if the sink is full
    /// (backpressure) or the reader has gone away.
    pub fn try_send(&self, frame: ServerFrame) -> Result<(), mpsc::error::TrySendError<ServerFrame>> {
        self.outbound.try_send(frame)
    }

    /// Refresh the liveness timestamp (on any inbound frame, notably `ping`).
    pub fn touch(&self) {
        self.last_seen.store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn last_seen(&self) -> i64 {
        self.last_seen.load(Ordering::Relaxed)
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        self.channels.read().iter().cloned().collect()
    }

    pub fn is_subscribed(&self, channel_id: &str) -> bool {
        self.channels.read().contains(channel_id)
    }

    /// Record a channel subscription. Returns `true` if it was newly added.
    pub(crate) fn insert_channel(&self, channel_id: &str) -> bool {
        self.channels.write().insert(channel_id.to_string())
    }

    /// Forget a channel subscription. Returns `true` if it had been present.
    pub(crate) fn remove_channel(&self, channel_id: &str) -> bool {
        self.channels.write().remove(channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session() -> (Arc<Session>, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(4);
        let session = Session::new("s1".to_string(), "u1".to_string(), "alice".to_string(), tx);
        (session, rx)
    }

    #[test]
    fn test_channel_subscription_tracking() {
        let (session, _rx) = make_session();
        assert!(session.insert_channel("c1"));
        assert!(!session.insert_channel("c1"));
        assert!(session.is_subscribed("c1"));
        assert_eq!(session.subscribed_channels(), vec!["c1".to_string()]);
        assert!(session.remove_channel("c1"));
        assert!(!session.is_subscribed("c1"));
    }

    #[tokio::test]
    async fn test_try_send_delivers_frame() {
        let (session, mut rx) = make_session();
        session.try_send(ServerFrame::Pong { timestamp: 0 }).unwrap();
        let frame = rx.recv().await.unwrap();
        assert!(matches!(frame, ServerFrame::Pong { .. }));
    }

    #[test]
    fn test_try_send_fails_when_buffer_full() {
        let (tx, _rx) = mpsc::channel(1);
        let session = Session::new("s1".to_string(), "u1".to_string(), "alice".to_string(), tx);
        session.try_send(ServerFrame::Pong { timestamp: 0 }).unwrap();
        assert!(session.try_send(ServerFrame::Pong { timestamp: 0 }).is_err());
    }

    #[test]
    fn test_touch_updates_last_seen() {
        let (session, _rx) = make_session();
        let before = session.last_seen();
        session.touch();
        assert!(session.last_seen() >= before);
    }
}

//! Metrics Aggregator: consumes the domain event stream and maintains
//! rolling tumbling windows, flushing each to the durable metrics store on
//! rollover or a periodic safety timer.
//!
//! Single-owner by design (spec: "aggregator buffers: single-owner. All
//! event handlers run on the same task") — one task both consumes events
//! and drives the safety-flush timer via `tokio::select!`, so the window
//! buffer never needs a lock.
//!
//! The window-assignment clock is ingest time (the receiving wall clock),
//! not the event's own `timestamp` field — a deliberate simplification
//! carried over from the source design, not a bug.
//!
//! The buffered window state tracks the full per-channel/per-user breakdown
//! the aggregation rules describe (`unique_senders`, `by_type`, edited/deleted
//! splits), but the flush step only persists the columns the durable schema
//! actually has room for (`MessageMetricsRow`/`ChannelMetricsRow`/`UserMetricsRow`);
//! `ChannelMetricsRow::message_count` is the channel's *created* count, not a
//! net of edits and deletes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::constants::METRICS_SAFETY_FLUSH_CHECK_SECS;
use crate::data::TransactionalService;
use crate::data::types::{ChannelMetricsRow, MessageMetricsRow, UserMetricsRow};
use crate::domain::events::{DomainEvent, DomainEventEnvelope};

use super::broker::BrokerAdapter;

fn align_window(timestamp: i64, window_seconds: i64) -> i64 {
    timestamp.div_euclid(window_seconds) * window_seconds
}

#[derive(Default)]
struct Totals {
    message_count: i64,
    unique_senders: HashSet<String>,
    active_users: HashSet<String>,
    active_channels: HashSet<String>,
    by_type: HashMap<String, i64>,
}

#[derive(Default)]
struct ChannelAgg {
    created: i64,
    edited: i64,
    deleted: i64,
    unique_senders: HashSet<String>,
}

#[derive(Default)]
struct UserAgg {
    sent: i64,
    edited: i64,
    deleted: i64,
    channels: HashSet<String>,
}

#[derive(Default)]
struct WindowState {
    window_start: Option<i64>,
    totals: Totals,
    totals_edited: i64,
    totals_deleted: i64,
    per_channel: HashMap<String, ChannelAgg>,
    per_user: HashMap<String, UserAgg>,
}

impl WindowState {
    fn clear(&mut self) {
        *self = WindowState::default();
    }

    fn reset(&mut self, window_start: i64) {
        *self = WindowState {
            window_start: Some(window_start),
            ..WindowState::default()
        };
    }

    fn apply(&mut self, event: &DomainEvent) {
        if event.event_type == DomainEvent::TYPE_CREATED {
            self.apply_created(event);
        } else if event.event_type == DomainEvent::TYPE_EDITED {
            self.apply_edited(event);
        } else if event.event_type == DomainEvent::TYPE_DELETED {
            self.apply_deleted(event);
        } else {
            tracing::debug!(event_type = %event.event_type, "ignoring unrecognized event type");
        }
    }

    fn apply_created(&mut self, event: &DomainEvent) {
        let (Some(user_id), Some(channel_id)) = (&event.user_id, &event.channel_id) else {
            tracing::warn!(event_id = %event.event_id, "message.created missing user_id or channel_id; skipping");
            return;
        };

        self.totals.message_count += 1;
        self.totals.unique_senders.insert(user_id.clone());
        self.totals.active_users.insert(user_id.clone());
        self.totals.active_channels.insert(channel_id.clone());
        let message_type = event.message_type.clone().unwrap_or_else(|| "text".to_string());
        *self.totals.by_type.entry(message_type).or_insert(0) += 1;

        let channel_agg = self.per_channel.entry(channel_id.clone()).or_default();
        channel_agg.created += 1;
        channel_agg.unique_senders.insert(user_id.clone());

        let user_agg = self.per_user.entry(user_id.clone()).or_default();
        user_agg.sent += 1;
        user_agg.channels.insert(channel_id.clone());
    }

    fn apply_edited(&mut self, event: &DomainEvent) {
        let (Some(user_id), Some(channel_id)) = (&event.user_id, &event.channel_id) else {
            tracing::warn!(event_id = %event.event_id, "message.edited missing user_id or channel_id; skipping");
            return;
        };

        self.totals_edited += 1;
        self.totals.active_users.insert(user_id.clone());
        self.totals.active_channels.insert(channel_id.clone());
        self.per_channel.entry(channel_id.clone()).or_default().edited += 1;
        self.per_user.entry(user_id.clone()).or_default().edited += 1;
    }

    fn apply_deleted(&mut self, event: &DomainEvent) {
        let (Some(user_id), Some(channel_id)) = (&event.user_id, &event.channel_id) else {
            tracing::warn!(event_id = %event.event_id, "message.deleted missing user_id or channel_id; skipping");
            return;
        };

        self.totals_deleted += 1;
        self.totals.active_users.insert(user_id.clone());
        self.totals.active_channels.insert(channel_id.clone());
        self.per_channel.entry(channel_id.clone()).or_default().deleted += 1;
        self.per_user.entry(user_id.clone()).or_default().deleted += 1;
    }
}

pub struct MetricsAggregator {
    broker: Arc<BrokerAdapter>,
    database: Arc<TransactionalService>,
    window_seconds: i64,
    consumer_group: String,
    consumer_id: String,
}

impl MetricsAggregator {
    pub fn new(
        broker: Arc<BrokerAdapter>,
        database: Arc<TransactionalService>,
        window_seconds: u64,
        consumer_group: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            broker,
            database,
            window_seconds: window_seconds.max(1) as i64,
            consumer_group,
            consumer_id: cuid2::create_id(),
        })
    }

    /// Spawn the aggregator's single consumption/flush task.
    pub fn spawn(self: &Arc<Self>, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let aggregator = Arc::clone(self);
        tokio::spawn(async move { aggregator.run(shutdown_rx).await })
    }

    async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let topic = self.broker.events_topic();
        let mut subscriber = match topic.subscribe(&self.consumer_group, &self.consumer_id).await {
            Ok(subscriber) => subscriber,
            Err(error) => {
                tracing::error!(%error, "metrics aggregator failed to subscribe to event stream");
                return;
            }
        };

        let mut safety_interval = tokio::time::interval(Duration::from_secs(METRICS_SAFETY_FLUSH_CHECK_SECS));
        let mut state = WindowState::default();

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        if self.flush(&state).await {
                            state.clear();
                        }
                        tracing::debug!("metrics aggregator shutting down");
                        break;
                    }
                }

                _ = safety_interval.tick() => {
                    self.maybe_safety_flush(&mut state).await;
                }

                result = subscriber.recv() => {
                    match result {
                        Ok((id, envelope)) => {
                            self.handle_envelope(&mut state, envelope).await;
                            if let Err(error) = subscriber.acker().ack(&id).await {
                                tracing::warn!(%error, message_id = %id, "failed to ack domain event");
                            }
                        }
                        Err(error) => {
                            tracing::warn!(%error, "event stream subscriber error");
                        }
                    }
                }
            }
        }
    }

    async fn handle_envelope(&self, state: &mut WindowState, envelope: DomainEventEnvelope) {
        let event = match envelope.decode() {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%error, "failed to decode domain event payload; skipping");
                return;
            }
        };

        let aligned = align_window(chrono::Utc::now().timestamp(), self.window_seconds);

        match state.window_start {
            None => state.reset(aligned),
            Some(current) if current != aligned => {
                if self.flush(state).await {
                    state.reset(aligned);
                } else {
                    tracing::warn!(
                        window_start = current,
                        "metrics flush failed on window rollover; retaining buffer, dropping event for new window"
                    );
                    return;
                }
            }
            _ => {}
        }

        state.apply(&event);
    }

    async fn maybe_safety_flush(&self, state: &mut WindowState) {
        let Some(window_start) = state.window_start else {
            return;
        };
        let age = chrono::Utc::now().timestamp() - window_start;
        if age < self.window_seconds {
            return;
        }
        if self.flush(state).await {
            state.clear();
        } else {
            tracing::warn!(window_start, "periodic safety flush failed; will retry");
        }
    }

    /// Persist one window's buffers. Never clears `state` itself — callers
    /// decide whether to reset on success, so a failed flush leaves the
    /// window intact for the next attempt (spec §4.4 flush contract).
    async fn flush(&self, state: &WindowState) -> bool {
        let Some(window_start) = state.window_start else {
            return true;
        };
        let repository = self.database.repository();

        let message_row = MessageMetricsRow {
            window_start,
            messages_sent: state.totals.message_count,
            messages_edited: state.totals_edited,
            messages_deleted: state.totals_deleted,
            messages_per_second: state.totals.message_count as f64 / self.window_seconds as f64,
        };
        if let Err(error) = repository.insert_message_metrics(message_row).await {
            tracing::warn!(%error, window_start, "failed to flush message metrics; window retained for retry");
            return false;
        }

        for (channel_id, agg) in &state.per_channel {
            let row = ChannelMetricsRow {
                channel_id: channel_id.clone(),
                window_start,
                message_count: agg.created,
                active_users: agg.unique_senders.len() as i64,
            };
            if let Err(error) = repository.insert_channel_metrics(row).await {
                tracing::warn!(%error, window_start, %channel_id, "failed to flush channel metrics; window retained for retry");
                return false;
            }
        }

        for (user_id, agg) in &state.per_user {
            let row = UserMetricsRow {
                user_id: user_id.clone(),
                window_start,
                messages_sent: agg.sent,
            };
            if let Err(error) = repository.insert_user_metrics(row).await {
                tracing::warn!(%error, window_start, %user_id, "failed to flush user metrics; window retained for retry");
                return false;
            }
        }

        tracing::debug!(window_start, message_count = state.totals.message_count, "flushed metrics window");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str, user_id: Option<&str>, channel_id: Option<&str>) -> DomainEvent {
        DomainEvent {
            event_id: cuid2::create_id(),
            event_type: event_type.to_string(),
            timestamp: 0,
            user_id: user_id.map(|s| s.to_string()),
            channel_id: channel_id.map(|s| s.to_string()),
            message_id: Some("m1".to_string()),
            message_type: Some("text".to_string()),
            content: Some("hi".to_string()),
            metadata: None,
            is_edited: false,
            is_deleted: false,
        }
    }

    #[test]
    fn test_align_window_floors_to_period() {
        assert_eq!(align_window(95, 60), 60);
        assert_eq!(align_window(60, 60), 60);
        assert_eq!(align_window(59, 60), 0);
    }

    #[test]
    fn test_apply_created_updates_all_aggregates() {
        let mut state = WindowState::default();
        state.reset(0);
        state.apply(&event(DomainEvent::TYPE_CREATED, Some("u1"), Some("c1")));
        state.apply(&event(DomainEvent::TYPE_CREATED, Some("u1"), Some("c1")));
        state.apply(&event(DomainEvent::TYPE_CREATED, Some("u2"), Some("c1")));

        assert_eq!(state.totals.message_count, 3);
        assert_eq!(state.totals.unique_senders.len(), 2);
        assert_eq!(state.totals.active_channels.len(), 1);
        assert_eq!(state.per_channel["c1"].created, 3);
        assert_eq!(state.per_channel["c1"].unique_senders.len(), 2);
        assert_eq!(state.per_user["u1"].sent, 2);
    }

    #[test]
    fn test_apply_edited_and_deleted_do_not_affect_message_count() {
        let mut state = WindowState::default();
        state.reset(0);
        state.apply(&event(DomainEvent::TYPE_CREATED, Some("u1"), Some("c1")));
        state.apply(&event(DomainEvent::TYPE_EDITED, Some("u1"), Some("c1")));
        state.apply(&event(DomainEvent::TYPE_DELETED, Some("u1"), Some("c1")));

        assert_eq!(state.totals.message_count, 1);
        assert_eq!(state.totals_edited, 1);
        assert_eq!(state.totals_deleted, 1);
        assert_eq!(state.per_channel["c1"].edited, 1);
        assert_eq!(state.per_channel["c1"].deleted, 1);
        assert_eq!(state.per_user["u1"].edited, 1);
    }

    #[test]
    fn test_apply_skips_events_missing_ids() {
        let mut state = WindowState::default();
        state.reset(0);
        state.apply(&event(DomainEvent::TYPE_CREATED, None, Some("c1")));
        state.apply(&event(DomainEvent::TYPE_CREATED, Some("u1"), None));

        assert_eq!(state.totals.message_count, 0);
        assert!(state.per_channel.is_empty());
        assert!(state.per_user.is_empty());
    }

    #[test]
    fn test_apply_ignores_unrecognized_event_type() {
        let mut state = WindowState::default();
        state.reset(0);
        state.apply(&event("channel.created", Some("u1"), Some("c1")));
        assert_eq!(state.totals.message_count, 0);
    }
}

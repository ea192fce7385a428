//! The realtime edge: connection registry, broker bridge, per-session state
//! machine, and the metrics aggregator.
//!
//! Everything durable (users, channels, messages, metrics rows) is reached
//! through `data::traits::TransactionalRepository`; everything volatile
//! (presence, typing, fan-out) goes through [`broker::BrokerAdapter`]. This
//! module owns no HTTP/WebSocket framing of its own — `api::routes::ws`
//! wires an axum upgrade to [`handler::SessionHandler`].

pub mod aggregator;
pub mod broker;
pub mod connection;
pub mod error;
pub mod handler;
pub mod session;

pub use aggregator::MetricsAggregator;
pub use broker::BrokerAdapter;
pub use connection::ConnectionManager;
pub use error::SessionError;
pub use handler::SessionHandler;
pub use session::{Session, SessionId};

//! Domain wire types for the realtime chat fabric.
//!
//! - `events` - the JSON frames exchanged over the WebSocket, the
//!   gzip+JSON fan-out payload carried on the broker's broadcast topics,
//!   and the protobuf-enveloped domain event stream consumed by the
//!   metrics aggregator.

pub mod events;


//! Liveness and connection-stats endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::realtime::broker::BrokerAdapter;
use crate::realtime::connection::ConnectionManager;

#[derive(Clone)]
pub struct HealthState {
    pub broker: Arc<BrokerAdapter>,
    pub connections: Arc<ConnectionManager>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// `ok` when the pub/sub broker answers a health check, `degraded` otherwise.
/// The durable store and cache are not probed here: a `degraded` broker
/// already means fan-out and presence are unavailable, which is the signal
/// a load balancer needs to stop routing new connections here.
pub async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    if state.broker.is_healthy().await {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                version: env!("CARGO_PKG_VERSION"),
            }),
        )
    }
}

pub async fn stats(State(state): State<HealthState>) -> impl IntoResponse {
    Json(state.connections.stats())
}

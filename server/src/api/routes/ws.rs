//! Realtime upgrade endpoint: `/ws?token=<jwt>`.
//!
//! Construction sequence (spec §4.5): parse token -> authenticate -> create
//! session -> attach -> spawn per-session read/write tasks -> on return, run
//! cleanup. Close codes: 1008 for auth failures, 1011 for unexpected server
//! error, normal close otherwise.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::api::auth::AuthManager;
use crate::core::config::WebSocketConfig;
use crate::data::TransactionalService;
use crate::data::cache::CacheService;
use crate::domain::events::ServerFrame;
use crate::realtime::broker::BrokerAdapter;
use crate::realtime::connection::ConnectionManager;
use crate::realtime::error::SessionError;
use crate::realtime::handler::SessionHandler;
use crate::realtime::session::Session;

#[derive(Clone)]
pub struct WsState {
    pub connections: Arc<ConnectionManager>,
    pub broker: Arc<BrokerAdapter>,
    pub database: Arc<TransactionalService>,
    pub cache: Arc<CacheService>,
    pub auth: Arc<AuthManager>,
    pub websocket: WebSocketConfig,
}

#[derive(Deserialize)]
pub struct WsQuery {
    token: String,
}

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<WsState>, Query(query): Query<WsQuery>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token))
}

async fn handle_socket(socket: WebSocket, state: WsState, token: String) {
    let claims = match state.auth.validate_session(&token) {
        Ok(claims) => claims,
        Err(error) => {
            tracing::debug!(%error, "realtime upgrade rejected: bad token");
            close_with_code(socket, 1008, "authentication failed").await;
            return;
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::channel(state.websocket.outbound_buffer_size);
    let session = Session::new(cuid2::create_id(), claims.user_id, claims.username, outbound_tx);
    let handler = Arc::new(SessionHandler::new(
        Arc::clone(&state.connections),
        Arc::clone(&state.broker),
        Arc::clone(&state.database),
        Arc::clone(&state.cache),
        Arc::clone(&session),
    ));

    handler.on_connect().await;
    run_session(
        socket,
        outbound_rx,
        Arc::clone(&handler),
        Arc::clone(&session),
        Duration::from_secs(state.websocket.ping_interval_secs),
        Duration::from_secs(state.websocket.ping_timeout_secs),
    )
    .await;
    handler.on_disconnect().await;
}

/// Bridges the socket to the session's outbound queue (plus a periodic
/// keepalive ping) on one task, and inbound text frames into the handler on
/// another. Either task ending tears down the other.
///
/// The server drives the ping cadence itself rather than relying on the
/// client: each tick checks how long it has been since the last pong was
/// seen, and drops the connection once that exceeds `ping_timeout`.
async fn run_session(
    socket: WebSocket,
    mut outbound_rx: mpsc::Receiver<ServerFrame>,
    handler: Arc<SessionHandler>,
    session: Arc<Session>,
    ping_interval: Duration,
    ping_timeout: Duration,
) {
    let (mut sender, mut receiver) = socket.split();
    let last_pong = Arc::new(AtomicI64::new(chrono::Utc::now().timestamp()));

    let mut send_task = tokio::spawn({
        let last_pong = Arc::clone(&last_pong);
        async move {
            let mut ping_tick = tokio::time::interval(ping_interval);
            ping_tick.tick().await;
            loop {
                tokio::select! {
                    frame = outbound_rx.recv() => {
                        let Some(frame) = frame else { break };
                        let text = match serde_json::to_string(&frame) {
                            Ok(text) => text,
                            Err(error) => {
                                let internal = SessionError::Internal(format!("failed to serialize outbound frame: {error}"));
                                tracing::error!(%error, close_code = internal.close_code(), "closing session on internal error");
                                let _ = sender
                                    .send(Message::Close(Some(CloseFrame {
                                        code: internal.close_code(),
                                        reason: "internal error".into(),
                                    })))
                                    .await;
                                break;
                            }
                        };
                        if sender.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    _ = ping_tick.tick() => {
                        let idle = chrono::Utc::now().timestamp() - last_pong.load(Ordering::Relaxed);
                        if idle > ping_timeout.as_secs() as i64 {
                            tracing::debug!(idle_secs = idle, "no pong within timeout, closing idle connection");
                            break;
                        }
                        if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if let Some(frame) = handler.handle_raw(&text).await {
                        let _ = session.try_send(frame);
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => {
                    last_pong.store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
                }
                Ok(Message::Ping(_) | Message::Binary(_)) => {}
                Err(error) => {
                    tracing::debug!(%error, "websocket receive error, ending session");
                    break;
                }
            }
        }
    });

    let join_error = tokio::select! {
        result = &mut send_task => { recv_task.abort(); result.err() }
        result = &mut recv_task => { send_task.abort(); result.err() }
    };

    // A task only ends in `Err` if it panicked rather than returning; the
    // socket is already gone by the time we learn this, so there is no
    // close frame left to send, but the session is still logged as the
    // "internal" kind spec §12 reserves for this.
    if let Some(error) = join_error {
        let internal = SessionError::Internal(format!("session task panicked: {error}"));
        tracing::error!(%error, close_code = internal.close_code(), "session task ended unexpectedly");
    }
}

async fn close_with_code(mut socket: WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

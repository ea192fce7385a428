//! API server: wires the realtime upgrade, liveness, and stats routes.

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

use super::middleware::{self, AllowedOrigins};
use super::rate_limit::{KeyExtractor, RateLimitState, rate_limit_middleware};
use super::routes::health::{self, HealthState};
use super::routes::ws::{self, WsState};
use crate::core::CoreApp;
use crate::data::cache::RateLimitBucket;

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);
        Self { app, allowed_origins }
    }

    /// Returns `CoreApp` back to the caller for graceful shutdown.
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app, allowed_origins } = self;

        let shutdown = app.shutdown.clone();
        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(host.parse()?, port);

        let ws_state = WsState {
            connections: app.connections.clone(),
            broker: app.broker.clone(),
            database: app.database.clone(),
            cache: app.cache.clone(),
            auth: app.auth.clone(),
            websocket: app.config.websocket.clone(),
        };
        let ws_routes = Router::new().route("/", get(ws::upgrade)).with_state(ws_state);
        let ws_routes = if app.config.rate_limit.enabled {
            ws_routes.layer(axum::middleware::from_fn_with_state(
                RateLimitState {
                    limiter: app.rate_limiter.clone(),
                    bucket: RateLimitBucket::api(app.config.rate_limit.api_rpm),
                    key_extractor: KeyExtractor::IpAddress,
                    bypass_header: None,
                },
                rate_limit_middleware,
            ))
        } else {
            ws_routes
        };

        let health_state = HealthState {
            broker: app.broker.clone(),
            connections: app.connections.clone(),
        };
        let health_routes = Router::new()
            .route("/healthz", get(health::health))
            .route("/stats", get(health::stats))
            .with_state(health_state);

        let router = Router::new()
            .route("/", get(root))
            .merge(health_routes)
            .nest("/ws", ws_routes)
            .fallback(middleware::handle_404)
            .layer(CompressionLayer::new())
            .layer(RequestDecompressionLayer::new())
            .layer(middleware::cors(&allowed_origins));

        let listener = TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}

async fn root() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " realtime chat fabric")
}

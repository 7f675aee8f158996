//! War Room web surface
//!
//! Exposes the message bus boundary (`submit`, `interrupt`, `resume`,
//! `answer`, `read_since`/WebSocket subscribe) over HTTP for the excluded
//! frontend. Any transport is acceptable as long as it preserves the
//! exactly-once, ordered delivery contract; this one offers both polling
//! (`GET .../messages?since=N`) and push (`GET .../ws?since=N`).

pub mod manager;
pub mod models;
pub mod routes;
pub mod websocket;

use axum::{Router, routing::get};
use manager::SessionManager;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use warroom_core::SessionConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions
    pub manager: SessionManager,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Defaults applied to sessions created without an explicit config
    pub session_defaults: SessionConfig,
    /// How often to sweep idle sessions for expired questions, in seconds
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            session_defaults: SessionConfig::default(),
            sweep_interval_secs: 5,
        }
    }
}

/// Create the application router.
pub fn create_app(config: &Config) -> (Router, AppState) {
    let state = AppState {
        manager: SessionManager::new(config.session_defaults.clone()),
    };
    (create_app_with_state(state.clone()), state)
}

/// Create the application router with provided state (for dependency injection)
pub fn create_app_with_state(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::api_routes(state.clone()))
        .route(
            "/api/sessions/{id}/ws",
            get(websocket::ws_handler).with_state(state),
        )
        .layer(cors)
}

/// Start the server, including the periodic question-expiry sweep.
///
/// Expiry is already checked lazily on every submit/answer; the sweep exists
/// so a completely idle session still unblocks within the grace period.
pub async fn serve(config: Config) -> Result<(), std::io::Error> {
    let (app, state) = create_app(&config);
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    let sweep_interval = Duration::from_secs(config.sweep_interval_secs.max(1));
    let manager = state.manager.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            manager.expire_stale();
        }
    });

    tracing::info!("Starting warroom-web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

//! Gobloks Server - game sessions over HTTP and websockets
//!
//! This crate provides the multiplayer backend:
//! - Turn engine with clocks, hints and disconnect handling
//! - Game registry with session tokens and stale game sweeping
//! - REST API for creating, joining and playing games
//! - Per-game websocket push of board and player updates

pub mod config;
pub mod eval;
pub mod game;
pub mod manager;
pub mod messages;
mod routes;
pub mod sockets;
mod state;
pub mod store;
pub mod timer;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub use config::{GameConfig, ServerConfig};
pub use game::{lock_game, ActionError, Game, GameError, SharedGame};
pub use manager::{GameManager, Session};
pub use messages::{ClientMessage, PlayerSummary, SocketMessage};
pub use routes::{ApiError, ACCESS_TOKEN};
pub use state::ServerState;
pub use store::{GameId, GameRecord, GameStore, MemoryStore};

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let static_service = ServeDir::new(&config.static_dir);

    let router = Router::new()
        // Status endpoint
        .route("/api/status", get(routes::status::status_handler))
        // Piece previews
        .route("/api/pieces", get(routes::pieces::get_pieces))
        // Lobby
        .route(
            "/api/games",
            get(routes::game::list_games).post(routes::game::create_game),
        )
        .route("/api/games/:gid/join", post(routes::game::join_game))
        .route("/api/games/:gid/board", get(routes::board::get_board))
        // Player actions
        .route("/api/place", put(routes::game::place_piece))
        .route("/api/hint", get(routes::game::get_hint))
        // Live updates
        .route("/ws/play", get(routes::play::play_socket))
        // Shared state
        .with_state(state)
        // Static file serving (must be last)
        .fallback_service(static_service);

    if config.production {
        router
    } else {
        router.layer(CorsLayer::permissive())
    }
}

/// Periodically drop games nobody has touched in too long
fn spawn_stale_sweeper(state: Arc<ServerState>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = state.manager.sweep_stale(Instant::now());
            if !removed.is_empty() {
                tracing::info!(count = removed.len(), ?removed, "swept stale games");
            }
        }
    });
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(ServerState::new(config.clone()));
    let router = create_router(&config, Arc::clone(&state));
    spawn_stale_sweeper(state, Duration::from_secs(config.stale_sweep_secs.max(1)));

    tracing::info!("Gobloks server starting on http://{}", addr);
    tracing::info!("Static files served from: {}", config.static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

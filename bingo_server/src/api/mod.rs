//! HTTP/WebSocket API for the bingo server.
//!
//! # Endpoints Overview
//!
//! ## Games (`/api/v1`)
//! - `POST /games/{lobby_id}/start` - Start a game from the lobby's seats
//! - `POST /games/by-id/{game_id}/start` - Start a pre-created waiting game
//! - `POST /games/by-id/{game_id}/end` - End a game, optionally naming a winner
//! - `POST /games/{lobby_id}/stop` - End the lobby's game without a winner
//! - `POST /games/{lobby_id}/pause`, `/resume` - Toggle number calling
//! - `POST /games/{lobby_id}/draw` - Call one number now
//! - `POST /games/{lobby_id}/speed` - Change the call cadence
//! - `POST /games/{lobby_id}/claim` - Submit a win claim
//! - `GET /games/{lobby_id}/snapshot` - Current or last game state
//! - `GET /lobbies/{lobby_id}/cards` - Seat-to-card layout of the round
//! - `GET /winners/{lobby_id}` - Winner records, newest first
//!
//! ## WebSocket
//! - `GET /ws/{lobby_id}` - Snapshot on connect, then every lobby event
//!
//! ## Health Check
//! - `GET /health` - Storage health and running game count
//!
//! # CORS
//!
//! CORS is configured permissively for development.

pub mod games;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use bingo::{GameManager, LobbyChannels};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<GameManager>,
    /// Subscription side of the lobby event channels
    pub channels: Arc<LobbyChannels>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use bingo_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{lobby_id}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let game_routes = Router::new()
        .route("/games/{lobby_id}/start", post(games::start_lobby))
        .route("/games/{lobby_id}/stop", post(games::stop))
        .route("/games/{lobby_id}/pause", post(games::pause))
        .route("/games/{lobby_id}/resume", post(games::resume))
        .route("/games/{lobby_id}/draw", post(games::draw_now))
        .route("/games/{lobby_id}/speed", post(games::set_speed))
        .route("/games/{lobby_id}/claim", post(games::claim_win))
        .route("/games/{lobby_id}/snapshot", get(games::snapshot))
        .route("/games/by-id/{game_id}/start", post(games::start_game))
        .route("/games/by-id/{game_id}/end", post(games::end_game));

    let lobby_routes = Router::new()
        .route("/lobbies/{lobby_id}/cards", get(games::lobby_cards))
        .route("/winners/{lobby_id}", get(games::winners));

    Router::new().merge(game_routes).merge(lobby_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","storage":true,"games":{"activeCount":2},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = match state.manager.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            false
        }
    };
    let active_count = state.manager.active_game_count().await;
    crate::metrics::active_games(active_count);

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "games": {
            "activeCount": active_count
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

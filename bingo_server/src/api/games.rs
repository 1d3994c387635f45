//! Game lifecycle API handlers.
//!
//! Thin wrappers over [`GameManager`](bingo::GameManager): each handler
//! forwards to one engine operation and maps [`GameError`] onto a status
//! code.
//!
//! # Examples
//!
//! Start the game of lobby 7:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/games/7/start
//! ```
//!
//! Claim a win:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/games/7/claim \
//!   -H "Content-Type: application/json" \
//!   -d '{"userId": 101, "seatNumber": 1, "numbers": [2, 17, 33, 50, 66]}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bingo::{
    Card, EndedGame, GameError, GameId, LobbyId, Snapshot, StartedGame, UserId,
    db::WinnerRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AppState;
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Map an engine error onto an HTTP status and a client-safe message.
///
/// - missing lobby, game or running session: `404 Not Found`
/// - failed preconditions and rejected claims: `400 Bad Request`
/// - storage failures: `500 Internal Server Error`
pub fn error_response(err: GameError) -> ApiError {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!(error = %err, "Game operation failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseResponse {
    pub lobby_id: LobbyId,
    pub paused: bool,
    /// False when the game was already in the requested state
    pub changed: bool,
}

#[derive(Debug, Deserialize)]
pub struct SpeedRequest {
    pub seconds: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedResponse {
    pub lobby_id: LobbyId,
    pub interval_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResponse {
    pub lobby_id: LobbyId,
    /// `None` when the deck ran out and the game ended
    pub number: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub user_id: UserId,
    pub seat_number: i64,
    pub numbers: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndGameRequest {
    #[serde(default)]
    pub winner_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsResponse {
    pub lobby_id: LobbyId,
    pub cards: BTreeMap<u8, Card>,
}

/// Start a game from the lobby's seated users.
///
/// Returns the running game with `alreadyRunning: true` when there is one.
///
/// # Errors
///
/// - `404 Not Found`: Lobby doesn't exist
/// - `400 Bad Request`: Lobby already active, or nobody seated
pub async fn start_lobby(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<StartedGame> {
    logging::log_admin_action("start", Some(lobby_id), None);
    state
        .manager
        .start_lobby(lobby_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Start a pre-created waiting game.
///
/// # Errors
///
/// - `404 Not Found`: Game or its lobby doesn't exist
/// - `400 Bad Request`: Game not waiting, or no participants recorded
pub async fn start_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> ApiResult<StartedGame> {
    logging::log_admin_action("start", None, Some(game_id));
    state
        .manager
        .start_game(game_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// End a running game by ID, optionally naming a seated winner.
///
/// # Request Body
///
/// ```json
/// {"winnerId": 101}
/// ```
pub async fn end_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Json(request): Json<EndGameRequest>,
) -> ApiResult<EndedGame> {
    logging::log_admin_action("end", None, Some(game_id));
    state
        .manager
        .end_game(game_id, request.winner_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// End the lobby's running game without a winner.
pub async fn stop(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<EndedGame> {
    logging::log_admin_action("stop", Some(lobby_id), None);
    state
        .manager
        .stop(lobby_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn pause(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<PauseResponse> {
    let changed = state
        .manager
        .pause(lobby_id)
        .await
        .map_err(error_response)?;
    Ok(Json(PauseResponse {
        lobby_id,
        paused: true,
        changed,
    }))
}

pub async fn resume(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<PauseResponse> {
    let changed = state
        .manager
        .resume(lobby_id)
        .await
        .map_err(error_response)?;
    Ok(Json(PauseResponse {
        lobby_id,
        paused: false,
        changed,
    }))
}

/// Call one number immediately.
pub async fn draw_now(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<DrawResponse> {
    let number = state
        .manager
        .draw_now(lobby_id)
        .await
        .map_err(error_response)?;
    Ok(Json(DrawResponse { lobby_id, number }))
}

/// Change the call cadence.
///
/// `seconds` is clamped to 1-5; the applied interval is returned.
///
/// # Request Body
///
/// ```json
/// {"seconds": 2.5}
/// ```
pub async fn set_speed(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    Json(request): Json<SpeedRequest>,
) -> ApiResult<SpeedResponse> {
    let interval = state
        .manager
        .set_call_interval(lobby_id, request.seconds)
        .await
        .map_err(error_response)?;
    Ok(Json(SpeedResponse {
        lobby_id,
        interval_ms: interval.as_millis(),
    }))
}

/// Verify a client's win claim and end the game with them as winner.
///
/// # Errors
///
/// - `400 Bad Request`: Not seated, card mismatch, or a number not yet called
/// - `404 Not Found`: No running game in the lobby
pub async fn claim_win(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
    Json(request): Json<ClaimRequest>,
) -> ApiResult<EndedGame> {
    let result = state
        .manager
        .claim_win(lobby_id, request.user_id, request.seat_number, request.numbers)
        .await;

    match result {
        Ok(ended) => {
            metrics::claims_total(true);
            logging::log_claim(lobby_id, request.user_id, request.seat_number, Ok(()));
            Ok(Json(ended))
        }
        Err(e) => {
            if e.is_client_error() {
                metrics::claims_total(false);
                let reason = e.client_message();
                logging::log_claim(
                    lobby_id,
                    request.user_id,
                    request.seat_number,
                    Err(reason.as_str()),
                );
            }
            Err(error_response(e))
        }
    }
}

/// Current game state, or the final state of the lobby's last game.
///
/// # Errors
///
/// - `404 Not Found`: The lobby has had no game since the server started
pub async fn snapshot(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<Snapshot> {
    state.manager.snapshot(lobby_id).await.map(Json).ok_or((
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "No game for lobby".to_string(),
        }),
    ))
}

/// Seat-to-card layout of the lobby's current round.
pub async fn lobby_cards(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<CardsResponse> {
    let cards = state
        .manager
        .lobby_cards(lobby_id)
        .await
        .map_err(error_response)?;
    Ok(Json(CardsResponse { lobby_id, cards }))
}

/// Winner records of a lobby, newest first.
pub async fn winners(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> ApiResult<Vec<WinnerRecord>> {
    state
        .manager
        .winners(lobby_id)
        .await
        .map(Json)
        .map_err(error_response)
}

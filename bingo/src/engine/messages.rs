//! Game actor message types.

use super::errors::GameResult;
use crate::cards::Card;
use crate::events::EndReason;
use crate::session::{CallInterval, GameId, LobbyId, Snapshot, UserId};
use serde::Serialize;
use tokio::sync::oneshot;

/// Messages that can be sent to a [`GameActor`](super::GameActor)
#[derive(Debug)]
pub enum GameMessage {
    /// Stop calling numbers. Responds `false` if already paused.
    Pause { response: oneshot::Sender<bool> },

    /// Resume calling numbers. Responds `false` if not paused.
    Resume { response: oneshot::Sender<bool> },

    /// Change the call cadence
    SetCallInterval {
        interval: CallInterval,
        response: oneshot::Sender<CallInterval>,
    },

    /// Call one number immediately
    DrawNow {
        response: oneshot::Sender<Option<u8>>,
    },

    /// Verify and apply a client win claim.
    ///
    /// `card` is the stored card for the seat, when one was found.
    Claim {
        user_id: UserId,
        seat_number: u8,
        numbers: Vec<i64>,
        card: Option<Card>,
        response: oneshot::Sender<GameResult<EndedGame>>,
    },

    /// End the game, optionally naming a seated winner
    End {
        winner_id: Option<UserId>,
        reason: EndReason,
        response: oneshot::Sender<GameResult<EndedGame>>,
    },

    /// Current state
    Snapshot { response: oneshot::Sender<Snapshot> },
}

/// Outcome of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedGame {
    pub game_id: GameId,
    pub lobby_id: LobbyId,
    /// A session was already running; nothing new was created
    pub already_running: bool,
}

/// Outcome of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndedGame {
    pub game_id: GameId,
    pub lobby_id: LobbyId,
    pub winner_id: Option<UserId>,
    pub prize_cents: Option<i64>,
    pub reason: EndReason,
}

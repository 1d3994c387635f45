//! Persisted row types.

use crate::cards::Card;
use crate::session::{GameId, GameStatus, LobbyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lobby row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRecord {
    pub id: LobbyId,
    pub name: String,
    pub entry_fee_cents: i64,
    pub max_seats: u8,
    pub status: GameStatus,
}

/// Game row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: GameId,
    pub lobby_id: LobbyId,
    pub status: GameStatus,
    pub drawn_numbers: Vec<u8>,
    pub current_number: Option<u8>,
    pub winner_id: Option<UserId>,
}

/// Seat held in a lobby before a game starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySeat {
    pub lobby_id: LobbyId,
    pub user_id: UserId,
    pub seat_number: u8,
}

/// Seat recorded against a game, with the card once one is bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameParticipantRecord {
    pub game_id: GameId,
    pub user_id: UserId,
    pub seat_number: u8,
    pub card: Option<Card>,
}

/// Winner row to insert at game end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWinner {
    pub game_id: GameId,
    pub lobby_id: LobbyId,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub note: Option<String>,
}

/// Stored winner row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub id: i64,
    pub game_id: GameId,
    pub lobby_id: LobbyId,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Decode a stored card column into a [`Card`].
///
/// Returns `None` unless there are exactly five values, each in `1..=75`.
pub fn card_from_column(values: &[i32]) -> Option<Card> {
    if values.len() != 5 {
        return None;
    }
    let mut card = [0u8; 5];
    for (slot, &value) in card.iter_mut().zip(values) {
        *slot = u8::try_from(value).ok().filter(|n| (1..=75).contains(n))?;
    }
    Some(card)
}

/// Encode a card for an `INTEGER[]` column
pub fn card_to_column(card: &Card) -> Vec<i32> {
    card.iter().map(|&n| i32::from(n)).collect()
}

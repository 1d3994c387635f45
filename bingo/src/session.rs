//! Live game session state and the read-only snapshot projected from it.

use crate::cards::Card;
use crate::draw::DrawnNumbers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Lobby ID type
pub type LobbyId = i64;

/// Game ID type
pub type GameId = i64;

/// User ID type
pub type UserId = i64;

/// Seats per game, one card row each
pub const SEATS_PER_GAME: u8 = 15;

/// Seats a single user may hold in one game
pub const MAX_SEATS_PER_USER: usize = 2;

/// Returns true when `seat` names one of the 15 seats of a game.
pub fn is_valid_seat(seat: i64) -> bool {
    (1..=i64::from(SEATS_PER_GAME)).contains(&seat)
}

/// Lifecycle status shared by games and lobbies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
}

impl GameStatus {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(GameStatus::Waiting),
            "active" => Ok(GameStatus::Active),
            "finished" => Ok(GameStatus::Finished),
            other => Err(format!("Unknown status '{}'", other)),
        }
    }
}

/// Number-calling cadence, always within the configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallInterval(u64);

impl CallInterval {
    /// Fastest allowed cadence
    pub const MIN_MS: u64 = 1_000;

    /// Slowest allowed cadence
    pub const MAX_MS: u64 = 5_000;

    /// Clamp a millisecond value into `[MIN_MS, MAX_MS]`.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms.clamp(Self::MIN_MS, Self::MAX_MS))
    }

    /// Convert a seconds value (possibly fractional) into a clamped interval.
    ///
    /// Returns `None` for NaN; infinities clamp to the nearest bound.
    pub fn from_secs_f64(seconds: f64) -> Option<Self> {
        if seconds.is_nan() {
            return None;
        }
        let ms = (seconds * 1000.0).floor();
        if ms <= Self::MIN_MS as f64 {
            Some(Self(Self::MIN_MS))
        } else if ms >= Self::MAX_MS as f64 {
            Some(Self(Self::MAX_MS))
        } else {
            Some(Self(ms as u64))
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

/// A seated user and the card bound to that seat for the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: UserId,
    pub seat_number: u8,
    pub card: Card,
}

/// Authoritative in-memory record of one running game.
///
/// Owned exclusively by the game's actor task; nothing else mutates it.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub game_id: GameId,
    pub lobby_id: LobbyId,
    pub current_number: Option<u8>,
    pub drawn: DrawnNumbers,
    pub is_running: bool,
    pub is_paused: bool,
    pub call_interval: CallInterval,
    pub winner_id: Option<UserId>,
    /// Sorted by seat number; win checks iterate in this order
    pub participants: Vec<Participant>,
    /// Lobby entry fee in cents, captured at start for the prize computation
    pub entry_fee_cents: i64,
    pub started_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(
        game_id: GameId,
        lobby_id: LobbyId,
        mut participants: Vec<Participant>,
        entry_fee_cents: i64,
        call_interval: CallInterval,
    ) -> Self {
        participants.sort_by_key(|p| p.seat_number);
        Self {
            game_id,
            lobby_id,
            current_number: None,
            drawn: DrawnNumbers::new(),
            is_running: true,
            is_paused: false,
            call_interval,
            winner_id: None,
            participants,
            entry_fee_cents,
            started_at: Utc::now(),
        }
    }

    /// Whether the number-calling timer should be armed
    pub fn is_calling(&self) -> bool {
        self.is_running && !self.is_paused
    }

    /// Participant holding `seat_number`, if any
    pub fn participant_at(&self, seat_number: u8) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.seat_number == seat_number)
    }

    /// Seat-to-card map of the occupied seats
    pub fn cards_by_seat(&self) -> BTreeMap<u8, Card> {
        self.participants
            .iter()
            .map(|p| (p.seat_number, p.card))
            .collect()
    }

    pub fn status(&self) -> GameStatus {
        if self.is_running {
            GameStatus::Active
        } else {
            GameStatus::Finished
        }
    }

    /// Project the session into a snapshot using the given seat cards.
    pub fn snapshot(&self, cards: BTreeMap<u8, Card>) -> Snapshot {
        Snapshot {
            game_id: self.game_id,
            lobby_id: self.lobby_id,
            current_number: if self.is_running {
                self.current_number
            } else {
                None
            },
            drawn_numbers: self.drawn.to_vec(),
            status: self.status(),
            cards,
            is_paused: self.is_running && self.is_paused,
            call_interval_ms: self.call_interval.as_millis(),
            winner_id: self.winner_id,
            winner_ids: self.winner_id.into_iter().collect(),
        }
    }
}

/// Read-only projection of a current or finished game for reconnecting clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub game_id: GameId,
    pub lobby_id: LobbyId,
    pub current_number: Option<u8>,
    pub drawn_numbers: Vec<u8>,
    pub status: GameStatus,
    pub cards: BTreeMap<u8, Card>,
    pub is_paused: bool,
    pub call_interval_ms: u64,
    pub winner_id: Option<UserId>,
    pub winner_ids: Vec<UserId>,
}

//! Lifecycle events and their per-lobby fan-out.

use crate::session::{GameId, LobbyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Default capacity of each lobby's broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// A card completed on a draw
    Winner,
    /// A verified client claim
    Claim,
    /// All 75 numbers called without a winner
    DeckExhausted,
    /// Stopped by an operator
    Stopped,
}

/// Event broadcast to every observer of a lobby
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    GameStarted {
        game_id: GameId,
        lobby_id: LobbyId,
        call_interval_ms: u64,
        started_at: DateTime<Utc>,
    },
    NumberCalled {
        game_id: GameId,
        number: u8,
        /// 1-based position of `number` in the call sequence
        order: usize,
        drawn_numbers: Vec<u8>,
        called_at: DateTime<Utc>,
    },
    PlayerWon {
        game_id: GameId,
        lobby_id: LobbyId,
        user_id: UserId,
        seat_number: Option<u8>,
        prize_cents: i64,
    },
    GameEnded {
        game_id: GameId,
        lobby_id: LobbyId,
        winners: Vec<UserId>,
        reason: EndReason,
        ended_at: DateTime<Utc>,
    },
    GamePaused {
        game_id: GameId,
        lobby_id: LobbyId,
    },
    GameResumed {
        game_id: GameId,
        lobby_id: LobbyId,
    },
    CallSpeedChanged {
        lobby_id: LobbyId,
        interval_ms: u64,
    },
}

impl GameEvent {
    /// Wire name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::GameStarted { .. } => "gameStarted",
            GameEvent::NumberCalled { .. } => "numberCalled",
            GameEvent::PlayerWon { .. } => "playerWon",
            GameEvent::GameEnded { .. } => "gameEnded",
            GameEvent::GamePaused { .. } => "gamePaused",
            GameEvent::GameResumed { .. } => "gameResumed",
            GameEvent::CallSpeedChanged { .. } => "callSpeedChanged",
        }
    }
}

/// Sink for lobby events.
///
/// Publishing never blocks and never fails; events for a lobby nobody is
/// watching are dropped.
pub trait EventBroadcaster: Send + Sync {
    fn publish(&self, lobby_id: LobbyId, event: GameEvent);
}

/// One `tokio::sync::broadcast` channel per lobby
pub struct LobbyChannels {
    capacity: usize,
    channels: RwLock<HashMap<LobbyId, broadcast::Sender<GameEvent>>>,
}

impl LobbyChannels {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Receive every event published for `lobby_id` from now on
    pub fn subscribe(&self, lobby_id: LobbyId) -> broadcast::Receiver<GameEvent> {
        if let Some(sender) = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&lobby_id)
        {
            return sender.subscribe();
        }

        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(lobby_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Live receivers for a lobby
    pub fn subscriber_count(&self, lobby_id: LobbyId) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&lobby_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop channels whose receivers have all gone away
    pub fn prune(&self) -> usize {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }
}

impl Default for LobbyChannels {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBroadcaster for LobbyChannels {
    fn publish(&self, lobby_id: LobbyId, event: GameEvent) {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        match channels.get(&lobby_id) {
            Some(sender) => {
                // Err only means nobody is listening right now
                if sender.send(event).is_err() {
                    log::trace!("Lobby {}: no subscribers", lobby_id);
                }
            }
            None => log::trace!("Lobby {}: dropped {} event", lobby_id, event.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_camel_case_with_type_tag() {
        let event = GameEvent::CallSpeedChanged {
            lobby_id: 7,
            interval_ms: 2_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "callSpeedChanged");
        assert_eq!(json["lobbyId"], 7);
        assert_eq!(json["intervalMs"], 2_000);

        let ended = GameEvent::GameEnded {
            game_id: 1,
            lobby_id: 7,
            winners: vec![],
            reason: EndReason::DeckExhausted,
            ended_at: Utc::now(),
        };
        let json = serde_json::to_value(&ended).unwrap();
        assert_eq!(json["type"], "gameEnded");
        assert_eq!(json["reason"], "deckExhausted");
        assert_eq!(json["winners"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_subscribers_only_see_their_lobby() {
        let channels = LobbyChannels::new(8);
        let mut lobby_one = channels.subscribe(1);
        let mut lobby_two = channels.subscribe(2);

        channels.publish(
            1,
            GameEvent::GamePaused {
                game_id: 10,
                lobby_id: 1,
            },
        );

        assert_eq!(lobby_one.recv().await.unwrap().kind(), "gamePaused");
        assert!(lobby_two.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let channels = LobbyChannels::default();
        channels.publish(
            3,
            GameEvent::GameResumed {
                game_id: 1,
                lobby_id: 3,
            },
        );
        assert_eq!(channels.subscriber_count(3), 0);
    }

    #[test]
    fn test_prune_drops_abandoned_channels() {
        let channels = LobbyChannels::default();
        let kept = channels.subscribe(1);
        drop(channels.subscribe(2));

        assert_eq!(channels.prune(), 1);
        assert_eq!(channels.subscriber_count(1), 1);
        drop(kept);
    }
}

//! # Bingo
//!
//! Real-time game session engine for multiplayer bingo.
//!
//! Lobbies hold up to 15 seats. When a lobby starts, every seated user is bound
//! to the row the lobby's deterministic layout assigns to their seat, and the
//! game's actor calls numbers 1-75 on a timer until a card completes, a claim is
//! verified, the deck runs out, or an operator stops the game.
//!
//! ## Core Modules
//!
//! - [`cards`]: deterministic per-lobby card layouts and their cache
//! - [`draw`]: number calling without replacement
//! - [`win`]: win detection and claim verification
//! - [`session`]: live game state and reconnect snapshots
//! - [`engine`]: per-game actors, session registry and the [`GameManager`]
//! - [`events`]: lifecycle events and per-lobby broadcast channels
//! - [`db`]: persistence gateway (PostgreSQL and in-memory)
//! - [`prize`]: winner payout computation
//! - [`config`]: engine tunables

pub mod cards;
pub mod config;
pub mod db;
pub mod draw;
pub mod engine;
pub mod events;
pub mod prize;
pub mod session;
pub mod win;

pub use cards::{Card, CardCache, LobbyCards, generate_lobby_cards};
pub use config::EngineConfig;
pub use draw::{DrawSource, DrawnNumbers, RandomDraws, ScriptedDraws};
pub use engine::{EndedGame, GameError, GameManager, GameResult, StartedGame};
pub use events::{EndReason, EventBroadcaster, GameEvent, LobbyChannels};
pub use prize::PrizePool;
pub use session::{CallInterval, GameId, GameSession, GameStatus, LobbyId, Participant, Snapshot, UserId};

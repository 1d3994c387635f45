//! Game lifecycle engine.
//!
//! Each running game is a [`GameActor`] task that owns its [`GameSession`]
//! and number-calling timer and is fed through a bounded mpsc inbox. The
//! [`GameManager`] validates preconditions, persists the start of a game,
//! spawns its actor and routes later operations to it by lobby or game ID
//! through the [`SessionRegistry`].
//!
//! ```no_run
//! use bingo::config::EngineConfig;
//! use bingo::db::InMemoryGameRepository;
//! use bingo::engine::GameManager;
//! use bingo::events::LobbyChannels;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bingo::engine::GameError> {
//!     let repo = Arc::new(InMemoryGameRepository::new());
//!     repo.insert_lobby(7, "Evening", 1_000);
//!     repo.seat_lobby_participant(7, 42, 1);
//!
//!     let manager = GameManager::new(repo, Arc::new(LobbyChannels::default()), EngineConfig::default());
//!     let started = manager.start_lobby(7).await?;
//!     manager.pause(7).await?;
//!     println!("game {} paused", started.game_id);
//!     Ok(())
//! }
//! ```
//!
//! [`GameSession`]: crate::session::GameSession

pub mod actor;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod registry;

pub use actor::{EngineContext, GameActor, GameHandle};
pub use errors::{GameError, GameResult};
pub use manager::{DrawSourceFactory, GameManager};
pub use messages::{EndedGame, GameMessage, StartedGame};
pub use registry::SessionRegistry;

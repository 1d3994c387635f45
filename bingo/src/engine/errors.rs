//! Game lifecycle error types.

use crate::db::StoreError;
use crate::session::{GameId, LobbyId};
use thiserror::Error;

/// Errors reported by lifecycle operations.
///
/// Precondition and claim errors never leave side effects behind.
#[derive(Debug, Error)]
pub enum GameError {
    /// Game not found
    #[error("Game not found")]
    GameNotFound(GameId),

    /// Lobby not found
    #[error("Lobby not found")]
    LobbyNotFound(LobbyId),

    /// Game or lobby is not accepting a start
    #[error("Game is not in waiting state")]
    NotWaiting,

    /// Nobody is seated
    #[error("No participants in game")]
    NoParticipants,

    /// No running session for the lobby or game
    #[error("No active game")]
    NoActiveGame,

    /// Claimant does not hold the claimed seat
    #[error("Not seated")]
    NotSeated,

    /// Claimed numbers differ from the seat's card
    #[error("Card mismatch")]
    CardMismatch,

    /// Claimed numbers include one that has not been called
    #[error("Invalid claim")]
    InvalidClaim,

    /// Call interval is not a number
    #[error("Invalid call interval")]
    InvalidCallInterval,

    /// Storage failure on a critical path
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl GameError {
    /// Short reason safe to show to clients.
    ///
    /// Storage errors are collapsed so query details and IDs never leak.
    pub fn client_message(&self) -> String {
        match self {
            GameError::Store(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// True for errors caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(self, GameError::Store(_))
    }

    /// True when the target game or lobby does not exist or is not running
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GameError::GameNotFound(_) | GameError::LobbyNotFound(_) | GameError::NoActiveGame
        )
    }
}

/// Result type for lifecycle operations
pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages() {
        assert_eq!(GameError::NotSeated.client_message(), "Not seated");
        assert_eq!(GameError::CardMismatch.client_message(), "Card mismatch");
        assert_eq!(GameError::InvalidClaim.client_message(), "Invalid claim");
        assert_eq!(GameError::NoActiveGame.client_message(), "No active game");
        assert_eq!(GameError::GameNotFound(3).client_message(), "Game not found");
    }

    #[test]
    fn test_store_errors_are_sanitized() {
        let err = GameError::from(StoreError::Unavailable("pool exhausted on db-7".to_string()));
        assert_eq!(err.client_message(), "Internal server error");
        assert!(!err.is_client_error());
        assert!(GameError::NotWaiting.is_client_error());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(GameError::LobbyNotFound(1).is_not_found());
        assert!(GameError::NoActiveGame.is_not_found());
        assert!(!GameError::CardMismatch.is_not_found());
    }
}

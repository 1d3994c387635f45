//! Index of running games.

use super::actor::GameHandle;
use crate::session::{GameId, LobbyId, Snapshot};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct RegistryState {
    games: HashMap<GameId, GameHandle>,
    lobbies: HashMap<LobbyId, GameId>,
    /// Last finished game per lobby
    finished: HashMap<LobbyId, Snapshot>,
}

/// Game-to-handle and lobby-to-game indices, updated together under one lock.
///
/// At most one running game per lobby. A finished game's final snapshot is
/// kept per lobby until the next game in that lobby finishes.
#[derive(Default)]
pub struct SessionRegistry {
    state: RwLock<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running game. Returns the handle already running for the
    /// lobby instead, if there is one.
    pub async fn insert(&self, handle: GameHandle) -> Result<(), GameHandle> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .lobbies
            .get(&handle.lobby_id())
            .and_then(|game_id| state.games.get(game_id))
        {
            return Err(existing.clone());
        }
        state.lobbies.insert(handle.lobby_id(), handle.game_id());
        state.games.insert(handle.game_id(), handle);
        Ok(())
    }

    pub async fn handle_for_lobby(&self, lobby_id: LobbyId) -> Option<GameHandle> {
        let state = self.state.read().await;
        state
            .lobbies
            .get(&lobby_id)
            .and_then(|game_id| state.games.get(game_id))
            .cloned()
    }

    pub async fn handle_for_game(&self, game_id: GameId) -> Option<GameHandle> {
        self.state.read().await.games.get(&game_id).cloned()
    }

    /// Remove a game from both indices and keep its final snapshot.
    pub async fn retire(&self, game_id: GameId, snapshot: Snapshot) {
        let mut state = self.state.write().await;
        state.games.remove(&game_id);
        if state.lobbies.get(&snapshot.lobby_id) == Some(&game_id) {
            state.lobbies.remove(&snapshot.lobby_id);
        }
        state.finished.insert(snapshot.lobby_id, snapshot);
    }

    /// Final snapshot of the lobby's last finished game
    pub async fn terminal_snapshot(&self, lobby_id: LobbyId) -> Option<Snapshot> {
        self.state.read().await.finished.get(&lobby_id).cloned()
    }

    /// Handles of every running game
    pub async fn handles(&self) -> Vec<GameHandle> {
        self.state.read().await.games.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.games.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::GameStatus;
    use std::collections::BTreeMap;
    use tokio::sync::mpsc;

    fn handle(game_id: GameId, lobby_id: LobbyId) -> GameHandle {
        let (sender, _inbox) = mpsc::channel(1);
        GameHandle::new(sender, game_id, lobby_id)
    }

    fn finished_snapshot(game_id: GameId, lobby_id: LobbyId) -> Snapshot {
        Snapshot {
            game_id,
            lobby_id,
            current_number: None,
            drawn_numbers: vec![3, 9],
            status: GameStatus::Finished,
            cards: BTreeMap::new(),
            is_paused: false,
            call_interval_ms: 3_000,
            winner_id: None,
            winner_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_one_running_game_per_lobby() {
        let registry = SessionRegistry::new();
        assert!(registry.insert(handle(1, 7)).await.is_ok());

        let existing = registry.insert(handle(2, 7)).await.unwrap_err();
        assert_eq!(existing.game_id(), 1);
        assert!(registry.handle_for_game(2).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_retire_clears_both_indices() {
        let registry = SessionRegistry::new();
        registry.insert(handle(1, 7)).await.unwrap();

        registry.retire(1, finished_snapshot(1, 7)).await;

        assert!(registry.handle_for_lobby(7).await.is_none());
        assert!(registry.handle_for_game(1).await.is_none());
        assert!(registry.is_empty().await);
        let snapshot = registry.terminal_snapshot(7).await.unwrap();
        assert_eq!(snapshot.drawn_numbers, vec![3, 9]);
    }

    #[tokio::test]
    async fn test_next_finished_game_overwrites_terminal_snapshot() {
        let registry = SessionRegistry::new();
        registry.insert(handle(1, 7)).await.unwrap();
        registry.retire(1, finished_snapshot(1, 7)).await;

        registry.insert(handle(2, 7)).await.unwrap();
        // Previous result stays readable while the next game runs
        assert_eq!(registry.terminal_snapshot(7).await.unwrap().game_id, 1);

        registry.retire(2, finished_snapshot(2, 7)).await;
        assert_eq!(registry.terminal_snapshot(7).await.unwrap().game_id, 2);
    }
}

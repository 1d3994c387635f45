//! In-memory [`GameRepository`] for tests and single-process deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::errors::{StoreError, StoreResult};
use super::models::{
    GameParticipantRecord, GameRecord, LobbyRecord, LobbySeat, NewWinner, WinnerRecord,
};
use super::repository::GameRepository;
use crate::cards::Card;
use crate::session::{GameId, GameStatus, LobbyId, SEATS_PER_GAME, UserId};

/// Repository operations whose writes can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreateGame,
    SetGameStatus,
    SetLobbyStatus,
    InsertGameParticipant,
    StoreParticipantCard,
    UpdateDrawProgress,
    FinishGame,
    InsertWinner,
    HealthCheck,
}

#[derive(Default)]
struct MemoryState {
    next_game_id: GameId,
    next_winner_id: i64,
    lobbies: HashMap<LobbyId, LobbyRecord>,
    /// lobby -> seat -> user
    lobby_seats: HashMap<LobbyId, BTreeMap<u8, UserId>>,
    games: HashMap<GameId, GameRecord>,
    /// game -> seat -> participant
    game_participants: HashMap<GameId, BTreeMap<u8, GameParticipantRecord>>,
    winners: Vec<WinnerRecord>,
    failing: HashSet<StoreOp>,
    draw_updates: usize,
}

/// Thread-safe in-memory store.
///
/// Besides the trait operations it exposes seeding helpers for lobbies, seats
/// and waiting games, and [`fail_on`](Self::fail_on) to make a write fail.
#[derive(Default)]
pub struct InMemoryGameRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace a lobby in `waiting` state
    pub fn insert_lobby(&self, lobby_id: LobbyId, name: &str, entry_fee_cents: i64) {
        let mut state = self.lock();
        state.lobbies.insert(
            lobby_id,
            LobbyRecord {
                id: lobby_id,
                name: name.to_string(),
                entry_fee_cents,
                max_seats: SEATS_PER_GAME,
                status: GameStatus::Waiting,
            },
        );
        state.lobby_seats.entry(lobby_id).or_default();
    }

    /// Seat a user in a lobby, replacing whoever held the seat
    pub fn seat_lobby_participant(&self, lobby_id: LobbyId, user_id: UserId, seat_number: u8) {
        self.lock()
            .lobby_seats
            .entry(lobby_id)
            .or_default()
            .insert(seat_number, user_id);
    }

    /// Free a lobby seat
    pub fn unseat_lobby_participant(&self, lobby_id: LobbyId, seat_number: u8) {
        if let Some(seats) = self.lock().lobby_seats.get_mut(&lobby_id) {
            seats.remove(&seat_number);
        }
    }

    /// Insert a `waiting` game for a lobby and return its ID
    pub fn create_waiting_game(&self, lobby_id: LobbyId) -> GameId {
        let mut state = self.lock();
        let game_id = state.allocate_game(lobby_id, GameStatus::Waiting);
        state.game_participants.entry(game_id).or_default();
        game_id
    }

    /// Record a seat against a game without binding a card
    pub fn seat_game_participant(&self, game_id: GameId, user_id: UserId, seat_number: u8) {
        self.lock()
            .game_participants
            .entry(game_id)
            .or_default()
            .insert(
                seat_number,
                GameParticipantRecord {
                    game_id,
                    user_id,
                    seat_number,
                    card: None,
                },
            );
    }

    /// Make every later call of `op` fail with [`StoreError::Unavailable`]
    pub fn fail_on(&self, op: StoreOp) {
        self.lock().failing.insert(op);
    }

    /// Undo [`fail_on`](Self::fail_on)
    pub fn recover(&self, op: StoreOp) {
        self.lock().failing.remove(&op);
    }

    pub fn lobby(&self, lobby_id: LobbyId) -> Option<LobbyRecord> {
        self.lock().lobbies.get(&lobby_id).cloned()
    }

    pub fn game(&self, game_id: GameId) -> Option<GameRecord> {
        self.lock().games.get(&game_id).cloned()
    }

    /// All winner rows in insertion order
    pub fn winners(&self) -> Vec<WinnerRecord> {
        self.lock().winners.clone()
    }

    /// Number of successful draw progress writes
    pub fn draw_update_count(&self) -> usize {
        self.lock().draw_updates
    }
}

impl MemoryState {
    fn check(&self, op: StoreOp) -> StoreResult<()> {
        if self.failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("{:?} failed", op)));
        }
        Ok(())
    }

    fn allocate_game(&mut self, lobby_id: LobbyId, status: GameStatus) -> GameId {
        self.next_game_id += 1;
        let game_id = self.next_game_id;
        self.games.insert(
            game_id,
            GameRecord {
                id: game_id,
                lobby_id,
                status,
                drawn_numbers: Vec::new(),
                current_number: None,
                winner_id: None,
            },
        );
        game_id
    }

    fn game_mut(&mut self, game_id: GameId) -> StoreResult<&mut GameRecord> {
        self.games.get_mut(&game_id).ok_or(StoreError::NotFound {
            entity: "game",
            id: game_id,
        })
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn get_lobby(&self, lobby_id: LobbyId) -> StoreResult<Option<LobbyRecord>> {
        Ok(self.lock().lobbies.get(&lobby_id).cloned())
    }

    async fn set_lobby_status(&self, lobby_id: LobbyId, status: GameStatus) -> StoreResult<()> {
        let mut state = self.lock();
        state.check(StoreOp::SetLobbyStatus)?;
        let lobby = state.lobbies.get_mut(&lobby_id).ok_or(StoreError::NotFound {
            entity: "lobby",
            id: lobby_id,
        })?;
        lobby.status = status;
        Ok(())
    }

    async fn list_lobby_participants(&self, lobby_id: LobbyId) -> StoreResult<Vec<LobbySeat>> {
        let state = self.lock();
        Ok(state
            .lobby_seats
            .get(&lobby_id)
            .map(|seats| {
                seats
                    .iter()
                    .map(|(&seat_number, &user_id)| LobbySeat {
                        lobby_id,
                        user_id,
                        seat_number,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_game(&self, game_id: GameId) -> StoreResult<Option<GameRecord>> {
        Ok(self.lock().games.get(&game_id).cloned())
    }

    async fn create_game(&self, lobby_id: LobbyId) -> StoreResult<GameId> {
        let mut state = self.lock();
        state.check(StoreOp::CreateGame)?;
        let game_id = state.allocate_game(lobby_id, GameStatus::Active);
        state.game_participants.entry(game_id).or_default();
        Ok(game_id)
    }

    async fn set_game_status(&self, game_id: GameId, status: GameStatus) -> StoreResult<()> {
        let mut state = self.lock();
        state.check(StoreOp::SetGameStatus)?;
        state.game_mut(game_id)?.status = status;
        Ok(())
    }

    async fn list_game_participants(
        &self,
        game_id: GameId,
    ) -> StoreResult<Vec<GameParticipantRecord>> {
        Ok(self
            .lock()
            .game_participants
            .get(&game_id)
            .map(|seats| seats.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_game_participant(
        &self,
        game_id: GameId,
        seat_number: u8,
    ) -> StoreResult<Option<GameParticipantRecord>> {
        Ok(self
            .lock()
            .game_participants
            .get(&game_id)
            .and_then(|seats| seats.get(&seat_number))
            .cloned())
    }

    async fn insert_game_participant(
        &self,
        game_id: GameId,
        user_id: UserId,
        seat_number: u8,
        card: &Card,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        state.check(StoreOp::InsertGameParticipant)?;
        state.game_participants.entry(game_id).or_default().insert(
            seat_number,
            GameParticipantRecord {
                game_id,
                user_id,
                seat_number,
                card: Some(*card),
            },
        );
        Ok(())
    }

    async fn store_participant_card(
        &self,
        game_id: GameId,
        seat_number: u8,
        card: &Card,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        state.check(StoreOp::StoreParticipantCard)?;
        let participant = state
            .game_participants
            .get_mut(&game_id)
            .and_then(|seats| seats.get_mut(&seat_number))
            .ok_or(StoreError::NotFound {
                entity: "game participant",
                id: game_id,
            })?;
        participant.card = Some(*card);
        Ok(())
    }

    async fn update_draw_progress(
        &self,
        game_id: GameId,
        drawn_numbers: &[u8],
        current_number: u8,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        state.check(StoreOp::UpdateDrawProgress)?;
        let game = state.game_mut(game_id)?;
        if game.status == GameStatus::Active {
            game.drawn_numbers = drawn_numbers.to_vec();
            game.current_number = Some(current_number);
            state.draw_updates += 1;
        }
        Ok(())
    }

    async fn finish_game(
        &self,
        game_id: GameId,
        drawn_numbers: &[u8],
        winner_id: Option<UserId>,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        state.check(StoreOp::FinishGame)?;
        let game = state.game_mut(game_id)?;
        game.status = GameStatus::Finished;
        game.current_number = None;
        game.drawn_numbers = drawn_numbers.to_vec();
        game.winner_id = winner_id;
        Ok(())
    }

    async fn insert_winner(&self, winner: &NewWinner) -> StoreResult<i64> {
        let mut state = self.lock();
        state.check(StoreOp::InsertWinner)?;
        state.next_winner_id += 1;
        let id = state.next_winner_id;
        state.winners.push(WinnerRecord {
            id,
            game_id: winner.game_id,
            lobby_id: winner.lobby_id,
            user_id: winner.user_id,
            amount_cents: winner.amount_cents,
            note: winner.note.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_winners(&self, lobby_id: LobbyId) -> StoreResult<Vec<WinnerRecord>> {
        Ok(self
            .lock()
            .winners
            .iter()
            .rev()
            .filter(|w| w.lobby_id == lobby_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.lock().check(StoreOp::HealthCheck)
    }
}

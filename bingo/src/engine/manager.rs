//! Game manager: lifecycle entry points over the per-game actors.

use super::actor::{EngineContext, GameActor, GameHandle};
use super::errors::{GameError, GameResult};
use super::messages::{EndedGame, GameMessage, StartedGame};
use super::registry::SessionRegistry;
use crate::cards::{Card, CardCache};
use crate::config::EngineConfig;
use crate::db::{GameRepository, LobbyRecord, WinnerRecord};
use crate::draw::{DrawSource, RandomDraws};
use crate::events::{EndReason, EventBroadcaster, GameEvent};
use crate::session::{
    CallInterval, GameId, GameSession, GameStatus, LobbyId, MAX_SEATS_PER_USER, Participant,
    Snapshot, UserId, is_valid_seat,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;

/// Builds the number source for each new game
pub type DrawSourceFactory = Arc<dyn Fn() -> Box<dyn DrawSource> + Send + Sync>;

/// Entry point for every game lifecycle operation.
///
/// Owns the session registry and card cache; each running game is an actor
/// task reached through its [`GameHandle`].
pub struct GameManager {
    ctx: Arc<EngineContext>,
    /// Serializes starts per lobby so two callers cannot both create a game for it
    start_locks: StdMutex<HashMap<LobbyId, Arc<Mutex<()>>>>,
    draw_sources: DrawSourceFactory,
}

impl GameManager {
    pub fn new(
        repo: Arc<dyn GameRepository>,
        broadcaster: Arc<dyn EventBroadcaster>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(EngineContext {
                repo,
                broadcaster,
                registry: SessionRegistry::new(),
                cards: CardCache::new(),
                config,
            }),
            start_locks: StdMutex::new(HashMap::new()),
            draw_sources: Arc::new(|| Box::new(RandomDraws::new()) as Box<dyn DrawSource>),
        }
    }

    /// Replace the random number source used for games started from now on
    pub fn with_draw_sources<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn DrawSource> + Send + Sync + 'static,
    {
        self.draw_sources = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// Card layouts per lobby; `insert` pins a layout for the current round
    pub fn card_cache(&self) -> &CardCache {
        &self.ctx.cards
    }

    pub fn repository(&self) -> Arc<dyn GameRepository> {
        self.ctx.repo.clone()
    }

    /// Start a new game for a lobby from the users seated in it.
    ///
    /// Returns the running game instead when the lobby already has one.
    pub async fn start_lobby(&self, lobby_id: LobbyId) -> GameResult<StartedGame> {
        let lock = self.start_lock(lobby_id);
        let _guard = lock.lock().await;

        if let Some(handle) = self.ctx.registry.handle_for_lobby(lobby_id).await {
            return Ok(already_running(&handle));
        }

        let lobby = self
            .ctx
            .repo
            .get_lobby(lobby_id)
            .await?
            .ok_or(GameError::LobbyNotFound(lobby_id))?;
        if lobby.status == GameStatus::Active {
            return Err(GameError::NotWaiting);
        }

        let seats = self.ctx.repo.list_lobby_participants(lobby_id).await?;
        let participants = self.bind_cards(
            lobby_id,
            seats.iter().map(|seat| (seat.user_id, seat.seat_number)),
        );
        if participants.is_empty() {
            return Err(GameError::NoParticipants);
        }

        let game_id = self.ctx.repo.create_game(lobby_id).await?;
        if let Err(e) = self.persist_lobby_start(game_id, lobby_id, &participants).await {
            self.abort_start(game_id, &lobby).await;
            return Err(e);
        }

        self.launch(game_id, &lobby, participants).await
    }

    async fn persist_lobby_start(
        &self,
        game_id: GameId,
        lobby_id: LobbyId,
        participants: &[Participant],
    ) -> GameResult<()> {
        self.ctx
            .repo
            .set_lobby_status(lobby_id, GameStatus::Active)
            .await?;
        for p in participants {
            self.ctx
                .repo
                .insert_game_participant(game_id, p.user_id, p.seat_number, &p.card)
                .await?;
        }
        Ok(())
    }

    /// Start a pre-created `waiting` game from the seats recorded against it.
    ///
    /// Returns the running game instead when its lobby already has one.
    pub async fn start_game(&self, game_id: GameId) -> GameResult<StartedGame> {
        let lobby_id = self
            .ctx
            .repo
            .get_game(game_id)
            .await?
            .ok_or(GameError::GameNotFound(game_id))?
            .lobby_id;
        let lock = self.start_lock(lobby_id);
        let _guard = lock.lock().await;

        // Re-read under the lock; a concurrent start may have moved it on
        let game = self
            .ctx
            .repo
            .get_game(game_id)
            .await?
            .ok_or(GameError::GameNotFound(game_id))?;

        if let Some(handle) = self.ctx.registry.handle_for_lobby(game.lobby_id).await {
            return Ok(already_running(&handle));
        }
        if game.status != GameStatus::Waiting {
            return Err(GameError::NotWaiting);
        }

        let lobby = self
            .ctx
            .repo
            .get_lobby(game.lobby_id)
            .await?
            .ok_or(GameError::LobbyNotFound(game.lobby_id))?;

        let recorded = self.ctx.repo.list_game_participants(game_id).await?;
        let participants = self.bind_cards(
            game.lobby_id,
            recorded.iter().map(|p| (p.user_id, p.seat_number)),
        );
        if participants.is_empty() {
            return Err(GameError::NoParticipants);
        }

        for p in &participants {
            self.ctx
                .repo
                .store_participant_card(game_id, p.seat_number, &p.card)
                .await?;
        }
        self.ctx
            .repo
            .set_game_status(game_id, GameStatus::Active)
            .await?;
        if let Err(e) = self
            .ctx
            .repo
            .set_lobby_status(lobby.id, GameStatus::Active)
            .await
        {
            if let Err(revert) = self
                .ctx
                .repo
                .set_game_status(game_id, GameStatus::Waiting)
                .await
            {
                log::warn!("Game {}: failed to revert to waiting: {}", game_id, revert);
            }
            return Err(e.into());
        }

        self.launch(game_id, &lobby, participants).await
    }

    /// Start lock of one lobby
    fn start_lock(&self, lobby_id: LobbyId) -> Arc<Mutex<()>> {
        self.start_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(lobby_id)
            .or_default()
            .clone()
    }

    /// Pair seats with this round's lobby cards, in seat order.
    ///
    /// A user keeps at most [`MAX_SEATS_PER_USER`] seats, the lowest-numbered
    /// ones; further seats are left out of the game.
    fn bind_cards(
        &self,
        lobby_id: LobbyId,
        seats: impl Iterator<Item = (UserId, u8)>,
    ) -> Vec<Participant> {
        let cards = self.ctx.cards.get_or_generate(lobby_id);
        let mut participants: Vec<Participant> = seats
            .filter_map(|(user_id, seat_number)| match cards.card_for_seat(seat_number) {
                Some(card) => Some(Participant {
                    user_id,
                    seat_number,
                    card,
                }),
                None => {
                    log::warn!(
                        "Lobby {}: ignoring user {} in invalid seat {}",
                        lobby_id,
                        user_id,
                        seat_number
                    );
                    None
                }
            })
            .collect();
        participants.sort_by_key(|p| p.seat_number);

        let mut held: HashMap<UserId, usize> = HashMap::new();
        participants.retain(|p| {
            let count = held.entry(p.user_id).or_default();
            *count += 1;
            if *count > MAX_SEATS_PER_USER {
                log::warn!(
                    "Lobby {}: user {} already holds {} seats, ignoring seat {}",
                    lobby_id,
                    p.user_id,
                    MAX_SEATS_PER_USER,
                    p.seat_number
                );
                return false;
            }
            true
        });
        participants
    }

    /// Best-effort rollback of a lobby start that failed after the game row was created
    async fn abort_start(&self, game_id: GameId, lobby: &LobbyRecord) {
        if let Err(e) = self
            .ctx
            .repo
            .set_game_status(game_id, GameStatus::Finished)
            .await
        {
            log::warn!("Game {}: failed to close aborted game: {}", game_id, e);
        }
        if let Err(e) = self.ctx.repo.set_lobby_status(lobby.id, lobby.status).await {
            log::warn!("Lobby {}: failed to restore status: {}", lobby.id, e);
        }
    }

    async fn launch(
        &self,
        game_id: GameId,
        lobby: &LobbyRecord,
        participants: Vec<Participant>,
    ) -> GameResult<StartedGame> {
        let session = GameSession::new(
            game_id,
            lobby.id,
            participants,
            lobby.entry_fee_cents,
            self.ctx.config.default_call_interval,
        );
        let interval = session.call_interval;
        let started_at = session.started_at;
        let participant_count = session.participants.len();

        let (actor, handle) = GameActor::new(session, self.ctx.clone(), (self.draw_sources)());
        if let Err(existing) = self.ctx.registry.insert(handle).await {
            log::error!(
                "Lobby {}: game {} already running, discarding game {}",
                lobby.id,
                existing.game_id(),
                game_id
            );
            self.abort_start(game_id, lobby).await;
            return Ok(already_running(&existing));
        }

        self.ctx.broadcaster.publish(
            lobby.id,
            GameEvent::GameStarted {
                game_id,
                lobby_id: lobby.id,
                call_interval_ms: interval.as_millis(),
                started_at,
            },
        );
        tokio::spawn(actor.run());

        log::info!(
            "Started game {} in lobby {} with {} participants",
            game_id,
            lobby.id,
            participant_count
        );

        Ok(StartedGame {
            game_id,
            lobby_id: lobby.id,
            already_running: false,
        })
    }

    async fn active_handle(&self, lobby_id: LobbyId) -> GameResult<GameHandle> {
        self.ctx
            .registry
            .handle_for_lobby(lobby_id)
            .await
            .ok_or(GameError::NoActiveGame)
    }

    /// Pause number calling. Returns false if it was already paused.
    pub async fn pause(&self, lobby_id: LobbyId) -> GameResult<bool> {
        self.active_handle(lobby_id)
            .await?
            .request(|response| GameMessage::Pause { response })
            .await
    }

    /// Resume number calling. Returns false if it was not paused.
    pub async fn resume(&self, lobby_id: LobbyId) -> GameResult<bool> {
        self.active_handle(lobby_id)
            .await?
            .request(|response| GameMessage::Resume { response })
            .await
    }

    /// Set the call cadence in seconds, clamped to 1-5.
    pub async fn set_call_interval(
        &self,
        lobby_id: LobbyId,
        seconds: f64,
    ) -> GameResult<CallInterval> {
        let handle = self.active_handle(lobby_id).await?;
        let interval = CallInterval::from_secs_f64(seconds).ok_or(GameError::InvalidCallInterval)?;
        handle
            .request(|response| GameMessage::SetCallInterval { interval, response })
            .await
    }

    /// Call one number now. `None` means the game ended on this call's deck check.
    pub async fn draw_now(&self, lobby_id: LobbyId) -> GameResult<Option<u8>> {
        self.active_handle(lobby_id)
            .await?
            .request(|response| GameMessage::DrawNow { response })
            .await
    }

    /// Verify a client's win claim and end the game with them as winner.
    ///
    /// The claimant must hold `seat_number` in the running game, `numbers`
    /// must equal that seat's stored card, and every number must have been
    /// called. A rejected claim changes nothing.
    pub async fn claim_win(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
        seat_number: i64,
        numbers: Vec<i64>,
    ) -> GameResult<EndedGame> {
        let handle = self.active_handle(lobby_id).await?;

        let seat_number = u8::try_from(seat_number)
            .ok()
            .filter(|&seat| is_valid_seat(i64::from(seat)))
            .ok_or(GameError::NotSeated)?;
        let card: Option<Card> = match self
            .ctx
            .repo
            .get_game_participant(handle.game_id(), seat_number)
            .await?
        {
            Some(record) if record.user_id == user_id => record.card,
            _ => return Err(GameError::NotSeated),
        };

        handle
            .request(|response| GameMessage::Claim {
                user_id,
                seat_number,
                numbers,
                card,
                response,
            })
            .await?
    }

    /// End the lobby's running game without a winner
    pub async fn stop(&self, lobby_id: LobbyId) -> GameResult<EndedGame> {
        self.active_handle(lobby_id)
            .await?
            .request(|response| GameMessage::End {
                winner_id: None,
                reason: EndReason::Stopped,
                response,
            })
            .await?
    }

    /// End a running game, optionally naming a seated winner
    pub async fn end_game(
        &self,
        game_id: GameId,
        winner_id: Option<UserId>,
    ) -> GameResult<EndedGame> {
        let handle = self
            .ctx
            .registry
            .handle_for_game(game_id)
            .await
            .ok_or(GameError::GameNotFound(game_id))?;
        handle
            .request(|response| GameMessage::End {
                winner_id,
                reason: EndReason::Stopped,
                response,
            })
            .await?
    }

    /// Live snapshot of the lobby's game, or the final one of its last game.
    pub async fn snapshot(&self, lobby_id: LobbyId) -> Option<Snapshot> {
        if let Some(handle) = self.ctx.registry.handle_for_lobby(lobby_id).await {
            match handle
                .request(|response| GameMessage::Snapshot { response })
                .await
            {
                Ok(snapshot) => return Some(snapshot),
                // Finished between lookup and reply; the terminal copy is in place
                Err(_) => log::debug!("Lobby {}: game ended during snapshot", lobby_id),
            }
        }
        self.ctx.registry.terminal_snapshot(lobby_id).await
    }

    /// The lobby's current seat-to-card layout
    pub async fn lobby_cards(&self, lobby_id: LobbyId) -> GameResult<BTreeMap<u8, Card>> {
        if self.ctx.repo.get_lobby(lobby_id).await?.is_none() {
            return Err(GameError::LobbyNotFound(lobby_id));
        }
        Ok(self.ctx.cards.get_or_generate(lobby_id).to_map())
    }

    /// Winner records of a lobby, newest first
    pub async fn winners(&self, lobby_id: LobbyId) -> GameResult<Vec<WinnerRecord>> {
        Ok(self.ctx.repo.list_winners(lobby_id).await?)
    }

    pub async fn game_id_for_lobby(&self, lobby_id: LobbyId) -> Option<GameId> {
        self.ctx
            .registry
            .handle_for_lobby(lobby_id)
            .await
            .map(|handle| handle.game_id())
    }

    pub async fn active_game_count(&self) -> usize {
        self.ctx.registry.len().await
    }

    pub async fn health_check(&self) -> GameResult<()> {
        Ok(self.ctx.repo.health_check().await?)
    }

    /// Stop every running game. Returns how many were stopped.
    pub async fn shutdown(&self) -> usize {
        let mut stopped = 0;
        for handle in self.ctx.registry.handles().await {
            let result = handle
                .request(|response| GameMessage::End {
                    winner_id: None,
                    reason: EndReason::Stopped,
                    response,
                })
                .await;
            match result {
                Ok(Ok(_)) => stopped += 1,
                Ok(Err(e)) | Err(e) => {
                    log::warn!("Game {}: stop during shutdown failed: {}", handle.game_id(), e)
                }
            }
        }
        stopped
    }
}

fn already_running(handle: &GameHandle) -> StartedGame {
    StartedGame {
        game_id: handle.game_id(),
        lobby_id: handle.lobby_id(),
        already_running: true,
    }
}

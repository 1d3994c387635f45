//! Per-game actor owning the live session and its number-calling timer.

use super::errors::{GameError, GameResult};
use super::messages::{EndedGame, GameMessage};
use super::registry::SessionRegistry;
use crate::cards::{Card, CardCache};
use crate::config::EngineConfig;
use crate::db::{GameRepository, NewWinner};
use crate::draw::DrawSource;
use crate::events::{EndReason, EventBroadcaster, GameEvent};
use crate::prize::{PrizePool, format_cents};
use crate::session::{CallInterval, GameId, GameSession, GameStatus, LobbyId, Snapshot, UserId};
use crate::win::{all_winners, find_winner, verify_claim};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Pending draw-progress writes per game before new ones are dropped
const PROGRESS_QUEUE_CAPACITY: usize = 32;

/// Dependencies shared by the manager and every game actor
pub struct EngineContext {
    pub repo: Arc<dyn GameRepository>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub registry: SessionRegistry,
    pub cards: CardCache,
    pub config: EngineConfig,
}

/// Cloneable address of a running game
#[derive(Debug, Clone)]
pub struct GameHandle {
    sender: mpsc::Sender<GameMessage>,
    game_id: GameId,
    lobby_id: LobbyId,
}

impl GameHandle {
    pub fn new(sender: mpsc::Sender<GameMessage>, game_id: GameId, lobby_id: LobbyId) -> Self {
        Self {
            sender,
            game_id,
            lobby_id,
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn lobby_id(&self) -> LobbyId {
        self.lobby_id
    }

    /// Send a message built around a fresh reply channel and await the reply.
    ///
    /// A game that has already finished never replies; that surfaces as
    /// [`GameError::NoActiveGame`].
    pub async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> GameMessage,
    ) -> GameResult<T> {
        let (response, reply) = oneshot::channel();
        self.sender
            .send(build(response))
            .await
            .map_err(|_| GameError::NoActiveGame)?;
        reply.await.map_err(|_| GameError::NoActiveGame)
    }
}

/// Actor driving a single game.
///
/// Every mutation of the session happens on this task, so draws, pauses,
/// claims and the end transition are applied one at a time in arrival order.
pub struct GameActor {
    session: GameSession,
    inbox: mpsc::Receiver<GameMessage>,
    ctx: Arc<EngineContext>,
    draws: Box<dyn DrawSource>,
    timer: Interval,
    progress: mpsc::Sender<(Vec<u8>, u8)>,
    progress_inbox: Option<mpsc::Receiver<(Vec<u8>, u8)>>,
    finished: bool,
}

fn call_timer(interval: CallInterval) -> Interval {
    let period = interval.as_duration();
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

impl GameActor {
    /// Create an actor for `session` and the handle addressing it.
    ///
    /// The first number is called one interval after creation. Must be called
    /// inside a tokio runtime.
    pub fn new(
        session: GameSession,
        ctx: Arc<EngineContext>,
        draws: Box<dyn DrawSource>,
    ) -> (Self, GameHandle) {
        let (sender, inbox) = mpsc::channel(ctx.config.inbox_capacity);
        let (progress, progress_inbox) = mpsc::channel(PROGRESS_QUEUE_CAPACITY);
        let handle = GameHandle::new(sender, session.game_id, session.lobby_id);

        let actor = Self {
            timer: call_timer(session.call_interval),
            session,
            inbox,
            ctx,
            draws,
            progress,
            progress_inbox: Some(progress_inbox),
            finished: false,
        };

        (actor, handle)
    }

    /// Run the game until it ends
    pub async fn run(mut self) {
        log::info!(
            "Game {} (lobby {}) running with {} participants, calling every {}ms",
            self.session.game_id,
            self.session.lobby_id,
            self.session.participants.len(),
            self.session.call_interval.as_millis()
        );

        if let Some(inbox) = self.progress_inbox.take() {
            tokio::spawn(persist_progress(
                self.ctx.repo.clone(),
                self.session.game_id,
                inbox,
            ));
        }

        loop {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => {
                        log::warn!(
                            "Game {}: all handles dropped, abandoning session",
                            self.session.game_id
                        );
                        break;
                    }
                },

                _ = self.timer.tick(), if self.session.is_calling() => {
                    self.draw().await;
                }
            }

            if self.finished {
                break;
            }
        }

        log::debug!("Game {} actor stopped", self.session.game_id);
    }

    async fn handle_message(&mut self, message: GameMessage) {
        match message {
            GameMessage::Pause { response } => {
                let _ = response.send(self.pause());
            }

            GameMessage::Resume { response } => {
                let _ = response.send(self.resume());
            }

            GameMessage::SetCallInterval { interval, response } => {
                let _ = response.send(self.set_call_interval(interval));
            }

            GameMessage::DrawNow { response } => {
                let number = self.draw().await;
                let _ = response.send(number);
            }

            GameMessage::Claim {
                user_id,
                seat_number,
                numbers,
                card,
                response,
            } => {
                let result = self.claim(user_id, seat_number, &numbers, card).await;
                let _ = response.send(result);
            }

            GameMessage::End {
                winner_id,
                reason,
                response,
            } => {
                let result = self.end(winner_id, reason).await;
                let _ = response.send(result);
            }

            GameMessage::Snapshot { response } => {
                let _ = response.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.session.snapshot(self.session.cards_by_seat())
    }

    fn pause(&mut self) -> bool {
        if self.session.is_paused {
            return false;
        }
        self.session.is_paused = true;
        log::info!("Game {} paused", self.session.game_id);
        self.ctx.broadcaster.publish(
            self.session.lobby_id,
            GameEvent::GamePaused {
                game_id: self.session.game_id,
                lobby_id: self.session.lobby_id,
            },
        );
        true
    }

    fn resume(&mut self) -> bool {
        if !self.session.is_paused {
            return false;
        }
        self.session.is_paused = false;
        self.timer = call_timer(self.session.call_interval);
        log::info!("Game {} resumed", self.session.game_id);
        self.ctx.broadcaster.publish(
            self.session.lobby_id,
            GameEvent::GameResumed {
                game_id: self.session.game_id,
                lobby_id: self.session.lobby_id,
            },
        );
        true
    }

    fn set_call_interval(&mut self, interval: CallInterval) -> CallInterval {
        self.session.call_interval = interval;
        // While paused the new cadence takes effect on resume
        if !self.session.is_paused {
            self.timer = call_timer(interval);
        }
        log::info!(
            "Game {} call interval set to {}ms",
            self.session.game_id,
            interval.as_millis()
        );
        self.ctx.broadcaster.publish(
            self.session.lobby_id,
            GameEvent::CallSpeedChanged {
                lobby_id: self.session.lobby_id,
                interval_ms: interval.as_millis(),
            },
        );
        interval
    }

    /// Call one number, then end the game if a card completed or the deck ran out.
    async fn draw(&mut self) -> Option<u8> {
        if !self.session.is_running {
            return None;
        }

        let Some(number) = self.draws.next_number(&self.session.drawn) else {
            self.finish_logged(None, EndReason::DeckExhausted).await;
            return None;
        };
        if !self.session.drawn.push(number) {
            log::error!(
                "Game {}: draw source repeated number {}",
                self.session.game_id,
                number
            );
            return None;
        }
        self.session.current_number = Some(number);

        let drawn_numbers = self.session.drawn.to_vec();
        if self
            .progress
            .try_send((drawn_numbers.clone(), number))
            .is_err()
        {
            log::warn!(
                "Game {}: progress queue full, number {} not persisted",
                self.session.game_id,
                number
            );
        }

        log::debug!(
            "Game {} called {} ({} of 75)",
            self.session.game_id,
            number,
            drawn_numbers.len()
        );
        self.ctx.broadcaster.publish(
            self.session.lobby_id,
            GameEvent::NumberCalled {
                game_id: self.session.game_id,
                number,
                order: drawn_numbers.len(),
                drawn_numbers,
                called_at: Utc::now(),
            },
        );

        let winner = find_winner(&self.session.participants, &self.session.drawn)
            .map(|p| (p.user_id, p.seat_number));
        if let Some((user_id, seat_number)) = winner {
            let tied = all_winners(&self.session.participants, &self.session.drawn).len();
            if tied > 1 {
                log::info!(
                    "Game {}: {} cards completed on {}, seat {} takes the prize",
                    self.session.game_id,
                    tied,
                    number,
                    seat_number
                );
            }
            self.finish_logged(Some((user_id, Some(seat_number))), EndReason::Winner)
                .await;
        } else if self.session.drawn.is_exhausted() {
            self.finish_logged(None, EndReason::DeckExhausted).await;
        }

        Some(number)
    }

    async fn claim(
        &mut self,
        user_id: UserId,
        seat_number: u8,
        numbers: &[i64],
        stored_card: Option<Card>,
    ) -> GameResult<EndedGame> {
        if !self.session.is_running {
            return Err(GameError::NoActiveGame);
        }

        let seated_card = match self.session.participant_at(seat_number) {
            Some(p) if p.user_id == user_id => p.card,
            _ => return Err(GameError::NotSeated),
        };
        let card = stored_card.unwrap_or(seated_card);

        if let Err(e) = verify_claim(&card, numbers, &self.session.drawn) {
            log::info!(
                "Game {}: rejected claim from user {} seat {}: {}",
                self.session.game_id,
                user_id,
                seat_number,
                e
            );
            return Err(e);
        }

        self.finish(Some((user_id, Some(seat_number))), EndReason::Claim)
            .await
    }

    async fn end(&mut self, winner_id: Option<UserId>, reason: EndReason) -> GameResult<EndedGame> {
        if !self.session.is_running {
            return Err(GameError::NoActiveGame);
        }

        let winner = match winner_id {
            Some(user_id) => {
                let seat = self
                    .session
                    .participants
                    .iter()
                    .find(|p| p.user_id == user_id)
                    .map(|p| p.seat_number)
                    .ok_or(GameError::NotSeated)?;
                Some((user_id, Some(seat)))
            }
            None => None,
        };

        self.finish(winner, reason).await
    }

    async fn finish_logged(&mut self, winner: Option<(UserId, Option<u8>)>, reason: EndReason) {
        if let Err(e) = self.finish(winner, reason).await {
            log::error!("Game {}: ended with errors: {}", self.session.game_id, e);
        }
    }

    /// Terminal transition.
    ///
    /// Teardown always completes; the first storage error, if any, is
    /// returned afterwards.
    async fn finish(
        &mut self,
        winner: Option<(UserId, Option<u8>)>,
        reason: EndReason,
    ) -> GameResult<EndedGame> {
        self.session.is_running = false;
        self.finished = true;

        let game_id = self.session.game_id;
        let lobby_id = self.session.lobby_id;
        let winner_id = winner.map(|(user_id, _)| user_id);
        self.session.winner_id = winner_id;

        let mut errors: Vec<GameError> = Vec::new();
        let repo = self.ctx.repo.clone();

        if let Err(e) = repo
            .finish_game(game_id, self.session.drawn.as_slice(), winner_id)
            .await
        {
            log::error!("Game {}: failed to persist final state: {}", game_id, e);
            errors.push(e.into());
        }

        let prize = winner.map(|_| {
            PrizePool::new(
                self.session.entry_fee_cents,
                self.session.participants.len(),
                self.ctx.config.winner_share_percent,
            )
        });

        if let (Some((user_id, seat_number)), Some(prize)) = (winner, prize) {
            self.ctx.broadcaster.publish(
                lobby_id,
                GameEvent::PlayerWon {
                    game_id,
                    lobby_id,
                    user_id,
                    seat_number,
                    prize_cents: prize.winner_cents,
                },
            );
        }
        self.ctx.broadcaster.publish(
            lobby_id,
            GameEvent::GameEnded {
                game_id,
                lobby_id,
                winners: winner_id.into_iter().collect(),
                reason,
                ended_at: Utc::now(),
            },
        );

        if let (Some(user_id), Some(prize)) = (winner_id, prize) {
            let record = NewWinner {
                game_id,
                lobby_id,
                user_id,
                amount_cents: prize.winner_cents,
                note: Some(winner_note(reason)),
            };
            if let Err(e) = repo.insert_winner(&record).await {
                log::error!("Game {}: failed to record winner {}: {}", game_id, user_id, e);
                errors.push(e.into());
            }
        }

        if let Err(e) = repo
            .set_lobby_status(lobby_id, GameStatus::Finished)
            .await
        {
            log::error!("Lobby {}: failed to unlock after game {}: {}", lobby_id, game_id, e);
            errors.push(e.into());
        }

        // Rotate the layout before the lobby can be started again
        self.ctx.cards.invalidate(lobby_id);
        let snapshot = self.snapshot();
        self.ctx.registry.retire(game_id, snapshot).await;

        match (winner_id, prize) {
            (Some(user_id), Some(prize)) => log::info!(
                "Game {} (lobby {}) won by user {} after {} calls, prize {}",
                game_id,
                lobby_id,
                user_id,
                self.session.drawn.len(),
                format_cents(prize.winner_cents)
            ),
            _ => log::info!(
                "Game {} (lobby {}) ended without a winner ({:?}) after {} calls",
                game_id,
                lobby_id,
                reason,
                self.session.drawn.len()
            ),
        }

        match errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(EndedGame {
                game_id,
                lobby_id,
                winner_id,
                prize_cents: prize.map(|p| p.winner_cents),
                reason,
            }),
        }
    }
}

fn winner_note(reason: EndReason) -> String {
    match reason {
        EndReason::Winner => "Auto-recorded".to_string(),
        EndReason::Claim => "Auto-recorded from verified claim".to_string(),
        EndReason::Stopped | EndReason::DeckExhausted => "Recorded by operator".to_string(),
    }
}

/// Mirror draw progress in call order; failures are logged and skipped.
async fn persist_progress(
    repo: Arc<dyn GameRepository>,
    game_id: GameId,
    mut inbox: mpsc::Receiver<(Vec<u8>, u8)>,
) {
    while let Some((drawn, current)) = inbox.recv().await {
        if let Err(e) = repo.update_draw_progress(game_id, &drawn, current).await {
            log::warn!(
                "Game {}: failed to persist number {}: {}",
                game_id,
                current,
                e
            );
        }
    }
}

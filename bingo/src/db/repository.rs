//! Persistence gateway used by the game engine.
//!
//! The engine only writes through this trait and never reads a row back into
//! a live session, so the store can lag behind without clobbering state.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::errors::{StoreError, StoreResult};
use super::models::{
    GameParticipantRecord, GameRecord, LobbyRecord, LobbySeat, NewWinner, WinnerRecord,
    card_from_column, card_to_column,
};
use super::timeouts::{with_default_timeout, with_transaction_timeout};
use crate::cards::Card;
use crate::session::{GameId, GameStatus, LobbyId, UserId};

/// Storage operations the engine depends on
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Fetch a lobby
    async fn get_lobby(&self, lobby_id: LobbyId) -> StoreResult<Option<LobbyRecord>>;

    /// Lock (`active`) or unlock (`finished`) a lobby's seats
    async fn set_lobby_status(&self, lobby_id: LobbyId, status: GameStatus) -> StoreResult<()>;

    /// Seats currently held in a lobby, ordered by seat number
    async fn list_lobby_participants(&self, lobby_id: LobbyId) -> StoreResult<Vec<LobbySeat>>;

    /// Fetch a game
    async fn get_game(&self, game_id: GameId) -> StoreResult<Option<GameRecord>>;

    /// Insert a new `active` game for a lobby
    async fn create_game(&self, lobby_id: LobbyId) -> StoreResult<GameId>;

    /// Update a game's status
    async fn set_game_status(&self, game_id: GameId, status: GameStatus) -> StoreResult<()>;

    /// Participants recorded against a game, ordered by seat number
    async fn list_game_participants(&self, game_id: GameId)
    -> StoreResult<Vec<GameParticipantRecord>>;

    /// Participant holding `seat_number` in a game
    async fn get_game_participant(
        &self,
        game_id: GameId,
        seat_number: u8,
    ) -> StoreResult<Option<GameParticipantRecord>>;

    /// Record a seat and its card for a game
    async fn insert_game_participant(
        &self,
        game_id: GameId,
        user_id: UserId,
        seat_number: u8,
        card: &Card,
    ) -> StoreResult<()>;

    /// Bind a card to an already recorded seat
    async fn store_participant_card(
        &self,
        game_id: GameId,
        seat_number: u8,
        card: &Card,
    ) -> StoreResult<()>;

    /// Mirror the draw sequence of an active game. Finished games are left untouched.
    async fn update_draw_progress(
        &self,
        game_id: GameId,
        drawn_numbers: &[u8],
        current_number: u8,
    ) -> StoreResult<()>;

    /// Write the terminal state of a game
    async fn finish_game(
        &self,
        game_id: GameId,
        drawn_numbers: &[u8],
        winner_id: Option<UserId>,
    ) -> StoreResult<()>;

    /// Insert a winner row, returning its ID
    async fn insert_winner(&self, winner: &NewWinner) -> StoreResult<i64>;

    /// Winner rows of a lobby, newest first
    async fn list_winners(&self, lobby_id: LobbyId) -> StoreResult<Vec<WinnerRecord>>;

    /// Check the store is reachable
    async fn health_check(&self) -> StoreResult<()>;
}

/// PostgreSQL implementation of [`GameRepository`]
#[derive(Clone)]
pub struct PgGameRepository {
    pool: PgPool,
}

impl PgGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_status(raw: &str, entity: &'static str, id: i64) -> StoreResult<GameStatus> {
    raw.parse().map_err(|reason| StoreError::Corrupt { entity, id, reason })
}

fn to_seat(value: i32, entity: &'static str, id: i64) -> StoreResult<u8> {
    u8::try_from(value).map_err(|_| StoreError::Corrupt {
        entity,
        id,
        reason: format!("seat number {} out of range", value),
    })
}

fn to_number_list(values: Vec<i32>, id: GameId) -> StoreResult<Vec<u8>> {
    values
        .into_iter()
        .map(|n| {
            u8::try_from(n).map_err(|_| StoreError::Corrupt {
                entity: "game",
                id,
                reason: format!("drawn number {} out of range", n),
            })
        })
        .collect()
}

fn number_column(numbers: &[u8]) -> Vec<i32> {
    numbers.iter().map(|&n| i32::from(n)).collect()
}

fn lobby_from_row(row: &PgRow) -> StoreResult<LobbyRecord> {
    let id: i64 = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let max_seats: i16 = row.try_get("max_seats")?;
    Ok(LobbyRecord {
        id,
        name: row.try_get("name")?,
        entry_fee_cents: row.try_get("entry_fee_cents")?,
        max_seats: u8::try_from(max_seats).unwrap_or(u8::MAX),
        status: parse_status(&status, "lobby", id)?,
    })
}

fn game_from_row(row: &PgRow) -> StoreResult<GameRecord> {
    let id: i64 = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let current: Option<i32> = row.try_get("current_number")?;
    Ok(GameRecord {
        id,
        lobby_id: row.try_get("lobby_id")?,
        status: parse_status(&status, "game", id)?,
        drawn_numbers: to_number_list(row.try_get("drawn_numbers")?, id)?,
        current_number: current.and_then(|n| u8::try_from(n).ok()),
        winner_id: row.try_get("winner_id")?,
    })
}

fn participant_from_row(row: &PgRow) -> StoreResult<GameParticipantRecord> {
    let game_id: i64 = row.try_get("game_id")?;
    let card: Option<Vec<i32>> = row.try_get("card")?;
    let card = match card {
        Some(values) => Some(card_from_column(&values).ok_or_else(|| StoreError::Corrupt {
            entity: "game participant card",
            id: game_id,
            reason: format!("{:?} is not a valid card", values),
        })?),
        None => None,
    };
    Ok(GameParticipantRecord {
        game_id,
        user_id: row.try_get("user_id")?,
        seat_number: to_seat(row.try_get("seat_number")?, "game participant", game_id)?,
        card,
    })
}

#[async_trait]
impl GameRepository for PgGameRepository {
    async fn get_lobby(&self, lobby_id: LobbyId) -> StoreResult<Option<LobbyRecord>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, name, entry_fee_cents, max_seats, status FROM lobbies WHERE id = $1",
            )
            .bind(lobby_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(lobby_from_row).transpose()
    }

    async fn set_lobby_status(&self, lobby_id: LobbyId, status: GameStatus) -> StoreResult<()> {
        let result = with_default_timeout(
            sqlx::query("UPDATE lobbies SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(lobby_id)
                .bind(status.as_str())
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "lobby",
                id: lobby_id,
            });
        }
        Ok(())
    }

    async fn list_lobby_participants(&self, lobby_id: LobbyId) -> StoreResult<Vec<LobbySeat>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT user_id, seat_number FROM lobby_participants
                 WHERE lobby_id = $1 ORDER BY seat_number ASC",
            )
            .bind(lobby_id)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<LobbySeat> {
                Ok(LobbySeat {
                    lobby_id,
                    user_id: row.try_get("user_id")?,
                    seat_number: to_seat(row.try_get("seat_number")?, "lobby participant", lobby_id)?,
                })
            })
            .collect()
    }

    async fn get_game(&self, game_id: GameId) -> StoreResult<Option<GameRecord>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, lobby_id, status, drawn_numbers, current_number, winner_id
                 FROM games WHERE id = $1",
            )
            .bind(game_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(game_from_row).transpose()
    }

    async fn create_game(&self, lobby_id: LobbyId) -> StoreResult<GameId> {
        let row = with_default_timeout(
            sqlx::query("INSERT INTO games (lobby_id, status) VALUES ($1, 'active') RETURNING id")
                .bind(lobby_id)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn set_game_status(&self, game_id: GameId, status: GameStatus) -> StoreResult<()> {
        let result = with_default_timeout(
            sqlx::query("UPDATE games SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(game_id)
                .bind(status.as_str())
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "game",
                id: game_id,
            });
        }
        Ok(())
    }

    async fn list_game_participants(
        &self,
        game_id: GameId,
    ) -> StoreResult<Vec<GameParticipantRecord>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT game_id, user_id, seat_number, card FROM game_participants
                 WHERE game_id = $1 ORDER BY seat_number ASC",
            )
            .bind(game_id)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(participant_from_row).collect()
    }

    async fn get_game_participant(
        &self,
        game_id: GameId,
        seat_number: u8,
    ) -> StoreResult<Option<GameParticipantRecord>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT game_id, user_id, seat_number, card FROM game_participants
                 WHERE game_id = $1 AND seat_number = $2",
            )
            .bind(game_id)
            .bind(i32::from(seat_number))
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(participant_from_row).transpose()
    }

    async fn insert_game_participant(
        &self,
        game_id: GameId,
        user_id: UserId,
        seat_number: u8,
        card: &Card,
    ) -> StoreResult<()> {
        with_default_timeout(
            sqlx::query(
                "INSERT INTO game_participants (game_id, user_id, seat_number, card)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(game_id)
            .bind(user_id)
            .bind(i32::from(seat_number))
            .bind(card_to_column(card))
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn store_participant_card(
        &self,
        game_id: GameId,
        seat_number: u8,
        card: &Card,
    ) -> StoreResult<()> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE game_participants SET card = $3 WHERE game_id = $1 AND seat_number = $2",
            )
            .bind(game_id)
            .bind(i32::from(seat_number))
            .bind(card_to_column(card))
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "game participant",
                id: game_id,
            });
        }
        Ok(())
    }

    async fn update_draw_progress(
        &self,
        game_id: GameId,
        drawn_numbers: &[u8],
        current_number: u8,
    ) -> StoreResult<()> {
        with_default_timeout(
            sqlx::query(
                "UPDATE games SET drawn_numbers = $2, current_number = $3, updated_at = NOW()
                 WHERE id = $1 AND status = 'active'",
            )
            .bind(game_id)
            .bind(number_column(drawn_numbers))
            .bind(i32::from(current_number))
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn finish_game(
        &self,
        game_id: GameId,
        drawn_numbers: &[u8],
        winner_id: Option<UserId>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = with_transaction_timeout(
            sqlx::query(
                "UPDATE games
                 SET status = 'finished', current_number = NULL, drawn_numbers = $2,
                     winner_id = $3, updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(game_id)
            .bind(number_column(drawn_numbers))
            .bind(winner_id)
            .execute(&mut *tx),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "game",
                id: game_id,
            });
        }

        if let Some(winner_id) = winner_id {
            with_transaction_timeout(
                sqlx::query(
                    "UPDATE game_participants SET is_winner = TRUE
                     WHERE game_id = $1 AND user_id = $2",
                )
                .bind(game_id)
                .bind(winner_id)
                .execute(&mut *tx),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_winner(&self, winner: &NewWinner) -> StoreResult<i64> {
        let row = with_default_timeout(
            sqlx::query(
                "INSERT INTO winners (game_id, lobby_id, user_id, amount_cents, note)
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(winner.game_id)
            .bind(winner.lobby_id)
            .bind(winner.user_id)
            .bind(winner.amount_cents)
            .bind(winner.note.as_deref())
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn list_winners(&self, lobby_id: LobbyId) -> StoreResult<Vec<WinnerRecord>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT id, game_id, lobby_id, user_id, amount_cents, note, created_at
                 FROM winners WHERE lobby_id = $1 ORDER BY created_at DESC, id DESC",
            )
            .bind(lobby_id)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<WinnerRecord> {
                Ok(WinnerRecord {
                    id: row.try_get("id")?,
                    game_id: row.try_get("game_id")?,
                    lobby_id: row.try_get("lobby_id")?,
                    user_id: row.try_get("user_id")?,
                    amount_cents: row.try_get("amount_cents")?,
                    note: row.try_get("note")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn health_check(&self) -> StoreResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}

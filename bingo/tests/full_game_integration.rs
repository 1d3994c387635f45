//! Full game from lobby start to automatic winner payout.

use bingo::{
    Card, EndReason, GameEvent, GameManager, GameStatus, LobbyCards, LobbyChannels,
    ScriptedDraws, db::InMemoryGameRepository, draw::DrawSource, generate_lobby_cards,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const SEAT_1: Card = [2, 17, 33, 50, 66];
const SEAT_2: Card = [5, 20, 35, 52, 70];
const SEAT_3: Card = [9, 24, 40, 55, 73];

/// Default layout for lobby 7 with seats 1-3 replaced
fn pinned_layout() -> LobbyCards {
    let mut rows = [[0u8; 5]; 15];
    for (seat, card) in generate_lobby_cards(7, 0).iter() {
        rows[usize::from(seat) - 1] = card;
    }
    rows[0] = SEAT_1;
    rows[1] = SEAT_2;
    rows[2] = SEAT_3;
    LobbyCards::from_rows(rows)
}

#[tokio::test(start_paused = true)]
async fn test_three_player_game_pays_first_full_card() {
    let repo = Arc::new(InMemoryGameRepository::new());
    repo.insert_lobby(7, "Friday Night", 1_000);
    repo.seat_lobby_participant(7, 101, 1);
    repo.seat_lobby_participant(7, 102, 2);
    repo.seat_lobby_participant(7, 103, 3);

    let channels = Arc::new(LobbyChannels::default());
    let manager = GameManager::new(repo.clone(), channels.clone(), Default::default())
        .with_draw_sources(|| {
            Box::new(ScriptedDraws::new([9, 2, 5, 17, 20, 33, 50, 66])) as Box<dyn DrawSource>
        });
    manager.card_cache().insert(7, pinned_layout());
    let mut events = channels.subscribe(7);

    let started = manager.start_lobby(7).await.unwrap();
    assert!(!started.already_running);

    // Eight calls at the default 3s cadence, then some slack
    sleep(Duration::from_secs(30)).await;

    let mut called = Vec::new();
    let mut won = None;
    let mut ended = None;
    while let Ok(event) = events.try_recv() {
        match event {
            GameEvent::GameStarted { game_id, call_interval_ms, .. } => {
                assert_eq!(game_id, started.game_id);
                assert_eq!(call_interval_ms, 3_000);
            }
            GameEvent::NumberCalled { number, order, drawn_numbers, .. } => {
                assert_eq!(order, called.len() + 1);
                called.push(number);
                assert_eq!(drawn_numbers, called);
            }
            GameEvent::PlayerWon { user_id, seat_number, prize_cents, .. } => {
                won = Some((user_id, seat_number, prize_cents));
            }
            GameEvent::GameEnded { winners, reason, .. } => {
                ended = Some((winners, reason));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert_eq!(called, vec![9, 2, 5, 17, 20, 33, 50, 66]);
    // 3 x $10.00 at 70%
    assert_eq!(won, Some((101, Some(1), 2_100)));
    assert_eq!(ended, Some((vec![101], EndReason::Winner)));

    let game = repo.game(started.game_id).unwrap();
    assert_eq!(game.status, GameStatus::Finished);
    assert_eq!(game.winner_id, Some(101));
    assert_eq!(game.drawn_numbers, called);
    assert_eq!(repo.lobby(7).unwrap().status, GameStatus::Finished);

    let winners = manager.winners(7).await.unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].user_id, 101);
    assert_eq!(winners[0].game_id, started.game_id);
    assert_eq!(winners[0].amount_cents, 2_100);
    assert_eq!(winners[0].note.as_deref(), Some("Auto-recorded"));

    let snapshot = manager.snapshot(7).await.unwrap();
    assert_eq!(snapshot.status, GameStatus::Finished);
    assert_eq!(snapshot.winner_ids, vec![101]);
    assert_eq!(snapshot.cards.get(&2u8).copied(), Some(SEAT_2));
    assert_eq!(manager.active_game_count().await, 0);

    // The pinned layout was for that round only
    let next = manager.lobby_cards(7).await.unwrap();
    assert_ne!(next.get(&1u8).copied(), Some(SEAT_1));
}

#[tokio::test(start_paused = true)]
async fn test_event_payloads_serialize_camel_case() {
    let repo = Arc::new(InMemoryGameRepository::new());
    repo.insert_lobby(3, "Wire", 250);
    repo.seat_lobby_participant(3, 55, 1);
    let channels = Arc::new(LobbyChannels::default());
    let manager = GameManager::new(repo, channels.clone(), Default::default())
        .with_draw_sources(|| Box::new(ScriptedDraws::new([12])) as Box<dyn DrawSource>);
    let mut events = channels.subscribe(3);

    manager.start_lobby(3).await.unwrap();
    manager.draw_now(3).await.unwrap();

    let started = serde_json::to_value(events.recv().await.unwrap()).unwrap();
    assert_eq!(started["type"], "gameStarted");
    assert_eq!(started["lobbyId"], 3);
    assert_eq!(started["callIntervalMs"], 3_000);

    let called = serde_json::to_value(events.recv().await.unwrap()).unwrap();
    assert_eq!(called["type"], "numberCalled");
    assert_eq!(called["number"], 12);
    assert_eq!(called["drawnNumbers"], serde_json::json!([12]));
}

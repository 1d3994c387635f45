//! WebSocket feed of lobby events.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{lobby_id}`
//! 2. Server subscribes to the lobby's event channel
//! 3. Server sends a `snapshot` message with the current or last game, if any
//! 4. Every lobby event is forwarded as JSON until either side closes
//!
//! Subscribing before reading the snapshot means no event is lost in between;
//! a client may see an event already reflected in the snapshot.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws/7');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   switch (data.type) {
//!     case 'snapshot': renderBoard(data.snapshot); break;
//!     case 'numberCalled': markNumber(data.number); break;
//!     case 'gameEnded': showResult(data.winners); break;
//!   }
//! };
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use bingo::{LobbyId, Snapshot};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use crate::metrics;

/// Messages the server adds on top of the engine's events
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerMessage {
    /// Sent once on connect
    Snapshot { snapshot: Snapshot },
    /// The client fell behind and `skipped` events were dropped
    Lagged { skipped: u64 },
}

/// Upgrade to a WebSocket that streams the lobby's events.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(lobby_id): Path<LobbyId>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, lobby_id, state))
}

/// Serialize a payload to a text frame
fn text_frame<T: Serialize>(payload: &T) -> Option<Message> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to serialize WebSocket payload: {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, lobby_id: LobbyId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.channels.subscribe(lobby_id);

    metrics::websocket_connected();
    info!("WebSocket connected: lobby={}", lobby_id);

    if let Some(snapshot) = state.manager.snapshot(lobby_id).await
        && let Some(frame) = text_frame(&ServerMessage::Snapshot { snapshot })
        && sender.send(frame).await.is_err()
    {
        metrics::websocket_disconnected();
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let frame = match event {
                    Ok(event) => text_frame(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("WebSocket lobby={} lagged, {} events dropped", lobby_id, skipped);
                        text_frame(&ServerMessage::Lagged { skipped })
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Some(frame) = frame {
                    if sender.send(frame).await.is_err() {
                        break;
                    }
                    metrics::websocket_messages_sent();
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Text(text))) => {
                    // Feed is read-only; actions go through the HTTP API
                    debug!("Ignoring client message on lobby {}: {}", lobby_id, text.as_str());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error on lobby {}: {}", lobby_id, e);
                    break;
                }
            },
        }
    }

    metrics::websocket_disconnected();
    info!("WebSocket disconnected: lobby={}", lobby_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bingo::GameStatus;
    use std::collections::BTreeMap;

    #[test]
    fn test_snapshot_message_is_tagged() {
        let message = ServerMessage::Snapshot {
            snapshot: Snapshot {
                game_id: 1,
                lobby_id: 7,
                current_number: Some(12),
                drawn_numbers: vec![12],
                status: GameStatus::Active,
                cards: BTreeMap::new(),
                is_paused: false,
                call_interval_ms: 3_000,
                winner_id: None,
                winner_ids: vec![],
            },
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "snapshot");
        assert_eq!(json["snapshot"]["drawnNumbers"], serde_json::json!([12]));
        assert_eq!(json["snapshot"]["currentNumber"], 12);
    }

    #[test]
    fn test_lagged_message() {
        let json = serde_json::to_value(ServerMessage::Lagged { skipped: 4 }).unwrap();
        assert_eq!(json["type"], "lagged");
        assert_eq!(json["skipped"], 4);
    }
}

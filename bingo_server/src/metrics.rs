//! Prometheus metrics for the bingo server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! when one is configured. Without an installed recorder every call here is
//! a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP**: request counts by route and status
//! - **WebSocket**: active and total connections, events pushed
//! - **Game**: games started and ended, numbers called, claims, prizes paid
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bingo_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::claims_total(true);
//! ```

use bingo::{EventBroadcaster, GameEvent, LobbyChannels, LobbyId};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;

/// Install the Prometheus exporter with a scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record a handled HTTP request.
pub fn http_requests_total(method: &str, route: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// A lobby observer connected.
pub fn websocket_connected() {
    metrics::counter!("websocket_connections_total").increment(1);
    metrics::gauge!("websocket_connections_active").increment(1.0);
}

/// A lobby observer disconnected.
pub fn websocket_disconnected() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

// ============================================================================
// Game Metrics
// ============================================================================

pub fn games_started_total() {
    metrics::counter!("games_started_total").increment(1);
}

/// Count a finished game by its end reason
pub fn games_ended_total(reason: &str) {
    metrics::counter!("games_ended_total", "reason" => reason.to_string()).increment(1);
}

pub fn numbers_called_total() {
    metrics::counter!("numbers_called_total").increment(1);
}

/// Count a win claim by outcome
pub fn claims_total(accepted: bool) {
    metrics::counter!("claims_total", "accepted" => accepted.to_string()).increment(1);
}

/// Record a prize payout in cents.
pub fn prize_cents(amount: i64) {
    metrics::histogram!("prize_cents").record(amount as f64);
}

/// Set current running games count.
pub fn active_games(count: usize) {
    metrics::gauge!("active_games").set(count as f64);
}

/// Event sink that records game metrics, then fans out to lobby observers.
pub struct MetricsBroadcaster {
    channels: Arc<LobbyChannels>,
}

impl MetricsBroadcaster {
    pub fn new(channels: Arc<LobbyChannels>) -> Self {
        Self { channels }
    }
}

impl EventBroadcaster for MetricsBroadcaster {
    fn publish(&self, lobby_id: LobbyId, event: GameEvent) {
        match &event {
            GameEvent::GameStarted { .. } => games_started_total(),
            GameEvent::NumberCalled { .. } => numbers_called_total(),
            GameEvent::PlayerWon { prize_cents: amount, .. } => prize_cents(*amount),
            GameEvent::GameEnded { reason, .. } => {
                // Serialized form is the wire name, e.g. "deckExhausted"
                let label = serde_json::to_value(reason)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| "unknown".to_string());
                games_ended_total(&label);
            }
            _ => {}
        }
        self.channels.publish(lobby_id, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bingo::EndReason;
    use chrono::Utc;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        http_requests_total("GET", "/health", 200);
        websocket_connected();
        websocket_disconnected();
        claims_total(false);
        active_games(3);
    }

    #[test]
    fn test_broadcaster_forwards_events() {
        let channels = Arc::new(LobbyChannels::default());
        let mut events = channels.subscribe(4);
        let broadcaster = MetricsBroadcaster::new(channels.clone());

        broadcaster.publish(
            4,
            GameEvent::GameEnded {
                game_id: 1,
                lobby_id: 4,
                winners: vec![],
                reason: EndReason::DeckExhausted,
                ended_at: Utc::now(),
            },
        );
        broadcaster.publish(
            5,
            GameEvent::CallSpeedChanged {
                lobby_id: 5,
                interval_ms: 2_000,
            },
        );

        assert!(matches!(
            events.try_recv().unwrap(),
            GameEvent::GameEnded { reason: EndReason::DeckExhausted, .. }
        ));
        // Other lobbies' events stay in their own channel
        assert!(events.try_recv().is_err());
    }
}

//! Structured logging setup.
//!
//! `log` records emitted by the engine are bridged into tracing, so one
//! subscriber formats everything.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging.
///
/// Log levels come from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// # Example
///
/// ```no_run
/// use bingo_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Record the outcome of a win claim.
///
/// Rejected claims are logged at warn: a claim that does not match the
/// server-held card is either a stale client or a forgery.
pub fn log_claim(lobby_id: i64, user_id: i64, seat_number: i64, outcome: Result<(), &str>) {
    match outcome {
        Ok(()) => tracing::info!(
            lobby_id = lobby_id,
            user_id = user_id,
            seat_number = seat_number,
            "CLAIM: accepted"
        ),
        Err(reason) => tracing::warn!(
            lobby_id = lobby_id,
            user_id = user_id,
            seat_number = seat_number,
            reason = reason,
            "CLAIM: rejected"
        ),
    }
}

/// Log an operator action against a lobby or game
pub fn log_admin_action(action: &str, lobby_id: Option<i64>, game_id: Option<i64>) {
    tracing::info!(
        action = action,
        lobby_id = lobby_id,
        game_id = game_id,
        "ADMIN: {}",
        action
    );
}

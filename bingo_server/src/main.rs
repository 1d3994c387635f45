//! Bingo game server.
//!
//! Serves the lifecycle API and lobby WebSocket feeds over one
//! [`GameManager`], backed by PostgreSQL or by process memory.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use bingo::{
    GameManager, LobbyChannels,
    db::{Database, GameRepository, InMemoryGameRepository},
};
use bingo_server::{
    api,
    config::{ServerConfig, StorageBackend},
    logging,
    metrics::{self, MetricsBroadcaster},
};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the bingo game server

USAGE:
  bingo_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     HTTP bind address           [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory                 Keep everything in memory and seed demo lobbies
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              HTTP bind address (e.g., 0.0.0.0:8080)
  BINGO_STORAGE            postgres | memory
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus listener (e.g., 0.0.0.0:9090)
  BINGO_DEMO_LOBBIES       Lobbies seeded in memory mode
  BINGO_CALL_INTERVAL_MS   Starting call cadence of new games
  RUST_LOG                 Log filter
";

/// Interval between sweeps of lobby channels nobody listens to
const CHANNEL_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Entry fee of seeded demo lobbies, in cents
const DEMO_ENTRY_FEE_CENTS: i64 = 500;

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(
        args.bind,
        args.database_url,
        args.memory.then_some(StorageBackend::Memory),
    )?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics on http://{}/metrics", addr);
    }

    let (repo, database): (Arc<dyn GameRepository>, Option<Database>) = match config.storage {
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to apply migrations")?;
            info!("Database connected and migrated");
            let repo: Arc<dyn GameRepository> = Arc::new(db.repository());
            (repo, Some(db))
        }
        StorageBackend::Memory => {
            let repo = InMemoryGameRepository::new();
            seed_demo_lobbies(&repo, config.demo_lobbies);
            info!(
                "Using in-memory storage with {} demo lobbies",
                config.demo_lobbies
            );
            let repo: Arc<dyn GameRepository> = Arc::new(repo);
            (repo, None)
        }
    };

    let channels = Arc::new(LobbyChannels::new(config.engine.event_capacity));
    let broadcaster = Arc::new(MetricsBroadcaster::new(channels.clone()));
    let manager = Arc::new(GameManager::new(repo, broadcaster, config.engine.clone()));

    let prune_channels = channels.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CHANNEL_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            let pruned = prune_channels.prune();
            if pruned > 0 {
                tracing::debug!(pruned, "Dropped idle lobby channels");
            }
        }
    });

    let app = api::create_router(api::AppState {
        manager: manager.clone(),
        channels,
    });

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    let stopped = manager.shutdown().await;
    info!("Stopped {} running game(s)", stopped);

    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Lobbies 1..=count, each with three seated demo users
fn seed_demo_lobbies(repo: &InMemoryGameRepository, count: usize) {
    for lobby_id in 1..=count as i64 {
        repo.insert_lobby(
            lobby_id,
            &format!("Demo Lobby {}", lobby_id),
            DEMO_ENTRY_FEE_CENTS,
        );
        for seat in 1..=3u8 {
            repo.seat_lobby_participant(lobby_id, lobby_id * 1_000 + i64::from(seat), seat);
        }
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

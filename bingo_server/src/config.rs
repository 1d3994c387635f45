//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use bingo::EngineConfig;
use bingo::db::DatabaseConfig;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Where lobbies, games and winners are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL through sqlx
    Postgres,
    /// Process memory, seeded with demo lobbies
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP/WebSocket bind address
    pub bind: SocketAddr,
    pub storage: StorageBackend,
    /// Only used with [`StorageBackend::Postgres`]
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    /// Prometheus scrape listener; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Lobbies seeded at startup in memory mode
    pub demo_lobbies: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// CLI values passed as overrides win over the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        storage_override: Option<StorageBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_required("SERVER_BIND", DEFAULT_BIND)?,
        };

        let storage = match storage_override {
            Some(storage) => storage,
            None => parse_env_required("BINGO_STORAGE", "postgres")?,
        };

        let database_url = database_url_override.or_else(|| std::env::var("DATABASE_URL").ok());
        let database_url = match (storage, database_url) {
            (_, Some(url)) => url,
            (StorageBackend::Memory, None) => DatabaseConfig::development().database_url,
            (StorageBackend::Postgres, None) => {
                return Err(ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Set a PostgreSQL URL or run with --memory".to_string(),
                });
            }
        };

        let defaults = DatabaseConfig::development();
        let database = DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: parse_env_or(
                "DB_CONNECTION_TIMEOUT",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
        };

        let engine = EngineConfig::from_env().map_err(ConfigError::Engine)?;

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) if !value.is_empty() => {
                Some(value.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{}' is not an IP:PORT address", value),
                })?)
            }
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            storage,
            database,
            engine,
            metrics_bind,
            demo_lobbies: parse_env_or("BINGO_DEMO_LOBBIES", 1),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate().map_err(ConfigError::Engine)?;

        if self.storage == StorageBackend::Postgres {
            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from SERVER_BIND".to_string(),
            });
        }

        if self.demo_lobbies > 100 {
            return Err(ConfigError::Invalid {
                var: "BINGO_DEMO_LOBBIES".to_string(),
                reason: "Must be at most 100".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Invalid engine configuration: {0}")]
    Engine(String),
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an environment variable, or the given default text, rejecting bad values
fn parse_env_required<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("cannot parse '{}'", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            storage: StorageBackend::Postgres,
            database: DatabaseConfig::development(),
            engine: EngineConfig::default(),
            metrics_bind: None,
            demo_lobbies: 1,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use --memory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use --memory"));
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("postgres".parse(), Ok(StorageBackend::Postgres));
        assert_eq!("MEMORY".parse(), Ok(StorageBackend::Memory));
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_min_connections_above_max() {
        let mut config = config();
        config.database.min_connections = 50;
        config.database.max_connections = 10;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_MIN_CONNECTIONS"));

        // Pool sizing is irrelevant without PostgreSQL
        config.storage = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metrics_cannot_share_bind_address() {
        let mut config = config();
        config.metrics_bind = Some(config.bind);
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { .. }
        ));
    }

    #[test]
    fn test_engine_validation_is_surfaced() {
        let mut config = config();
        config.engine.winner_share_percent = 120;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Engine(_)
        ));
    }
}

//! Connection pool configuration.

use std::env;
use std::str::FromStr;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Read configuration from the environment.
    ///
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DB_MAX_CONNECTIONS`: maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: minimum pool size (default: 2)
    /// - `DB_CONNECTION_TIMEOUT`: acquire timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: max lifetime in seconds (default: 1800)
    ///
    /// Returns an error naming the offending variable when a value is missing
    /// or does not parse.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::development();
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| "DATABASE_URL must be set".to_string())?,
            max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parse_var("DB_MIN_CONNECTIONS", defaults.min_connections)?,
            connection_timeout_secs: parse_var(
                "DB_CONNECTION_TIMEOUT",
                defaults.connection_timeout_secs,
            )?,
            idle_timeout_secs: parse_var("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs)?,
            max_lifetime_secs: parse_var("DB_MAX_LIFETIME", defaults.max_lifetime_secs)?,
        })
    }

    /// Local development defaults
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/bingo".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

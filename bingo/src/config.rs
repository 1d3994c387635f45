//! Engine tunables.

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::prize::DEFAULT_WINNER_SHARE_PERCENT;
use crate::session::CallInterval;
use std::env;
use std::str::FromStr;

/// Default number-calling cadence
pub const DEFAULT_CALL_INTERVAL_MS: u64 = 3_000;

/// Default capacity of a game actor's inbox
pub const DEFAULT_INBOX_CAPACITY: usize = 100;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Cadence a new game starts with
    pub default_call_interval: CallInterval,

    /// Percentage of the pot paid to the winner
    pub winner_share_percent: u8,

    /// Game actor inbox capacity
    pub inbox_capacity: usize,

    /// Per-lobby event channel capacity
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_call_interval: CallInterval::from_millis(DEFAULT_CALL_INTERVAL_MS),
            winner_share_percent: DEFAULT_WINNER_SHARE_PERCENT,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Read overrides from the environment.
    ///
    /// - `BINGO_CALL_INTERVAL_MS` (default: 3000, must be 1000-5000)
    /// - `BINGO_WINNER_SHARE_PERCENT` (default: 70)
    /// - `BINGO_INBOX_CAPACITY` (default: 100)
    /// - `BINGO_EVENT_CAPACITY` (default: 256)
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let interval_ms = parse_env_or(
            "BINGO_CALL_INTERVAL_MS",
            defaults.default_call_interval.as_millis(),
        )?;
        if !(CallInterval::MIN_MS..=CallInterval::MAX_MS).contains(&interval_ms) {
            return Err(format!(
                "BINGO_CALL_INTERVAL_MS must be between {} and {}",
                CallInterval::MIN_MS,
                CallInterval::MAX_MS
            ));
        }

        let config = Self {
            default_call_interval: CallInterval::from_millis(interval_ms),
            winner_share_percent: parse_env_or(
                "BINGO_WINNER_SHARE_PERCENT",
                defaults.winner_share_percent,
            )?,
            inbox_capacity: parse_env_or("BINGO_INBOX_CAPACITY", defaults.inbox_capacity)?,
            event_capacity: parse_env_or("BINGO_EVENT_CAPACITY", defaults.event_capacity)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.winner_share_percent > 100 {
            return Err("Winner share cannot exceed 100%".to_string());
        }
        if self.inbox_capacity == 0 {
            return Err("Inbox capacity must be at least 1".to_string());
        }
        if self.event_capacity == 0 {
            return Err("Event capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

fn parse_env_or<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_call_interval.as_millis(), 3_000);
        assert_eq!(config.winner_share_percent, 70);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = EngineConfig {
            winner_share_percent: 101,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            inbox_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

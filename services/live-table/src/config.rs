//! Service configuration: optional YAML file, then `DICE_ARENA_*` overrides.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use dicearena_types::{ArenaConfig, ArenaConfigError, ChatId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

pub const ENV_PREFIX: &str = "DICE_ARENA_";

const DEFAULT_PORT: u16 = 9124;
const DEFAULT_DIE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_EVENT_BUFFER: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("invalid listen address: {value}")]
    InvalidListenAddr { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("{key} has an invalid value: {value}")]
    InvalidEnv { key: String, value: String },
    #[error("invalid arena config: {0}")]
    Arena(#[from] ArenaConfigError),
}

/// Raw configuration as read from YAML and the environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Budget for drawing two dice from the OS before falling back.
    pub die_timeout_ms: u64,
    /// Chats allowed to host rounds. Empty allows every chat.
    pub allowed_chats: Vec<ChatId>,
    pub event_buffer: usize,
    pub arena: ArenaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            die_timeout_ms: DEFAULT_DIE_TIMEOUT_MS,
            allowed_chats: Vec::new(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            arena: ArenaConfig::default(),
        }
    }
}

/// Configuration after validation, ready to wire the service.
#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub listen_addr: SocketAddr,
    pub log_level: Level,
    pub die_timeout: Duration,
    pub allowed_chats: Option<BTreeSet<ChatId>>,
    pub event_buffer: usize,
    pub arena: ArenaConfig,
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `DICE_ARENA_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = read("HOST") {
            self.host = value;
        }
        if let Some((key, value)) = read("PORT") {
            self.port = parse_env(&key, &value)?;
        }
        if let Some((_, value)) = read("LOG_LEVEL") {
            self.log_level = value;
        }
        if let Some((key, value)) = read("DIE_TIMEOUT_MS") {
            self.die_timeout_ms = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = read("ALLOWED_CHATS") {
            self.allowed_chats = value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| parse_env(&key, part))
                .collect::<Result<_, _>>()?;
        }
        if let Some((key, value)) = read("EVENT_BUFFER") {
            self.event_buffer = parse_env(&key, &value)?;
        }

        let arena = &mut self.arena;
        for (name, slot) in [
            ("BETTING_MS", &mut arena.betting_ms),
            ("ROLL_DELAY_MS", &mut arena.roll_delay_ms),
            ("SEQUENCE_START_DELAY_MS", &mut arena.sequence_start_delay_ms),
            ("INTER_ROUND_DELAY_MS", &mut arena.inter_round_delay_ms),
            ("INITIAL_BALANCE", &mut arena.initial_balance),
            ("MIN_BET", &mut arena.min_bet),
            ("QUICK_BET_AMOUNT", &mut arena.quick_bet_amount),
        ] {
            if let Some((key, value)) = read(name) {
                *slot = parse_env(&key, &value)?;
            }
        }
        // Zero disables the cap.
        if let Some((key, value)) = read("MAX_BET") {
            let max: u64 = parse_env(&key, &value)?;
            arena.max_bet = (max > 0).then_some(max);
        }
        if let Some((key, value)) = read("MAX_SEQUENCE_ROUNDS") {
            arena.max_sequence_rounds = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = read("HISTORY_CAPACITY") {
            arena.history_capacity = parse_env(&key, &value)?;
        }
        if let Some((key, value)) = read("IDLE_ROUND_LIMIT") {
            arena.idle_round_limit = parse_env(&key, &value)?;
        }
        Ok(())
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        let raw_addr = format!("{}:{}", self.host, self.port);
        let listen_addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidListenAddr { value: raw_addr })?;
        if self.die_timeout_ms == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "die_timeout_ms",
                value: 0,
            });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "event_buffer",
                value: 0,
            });
        }
        self.arena.validate()?;

        let allowed_chats = if self.allowed_chats.is_empty() {
            None
        } else {
            Some(self.allowed_chats.into_iter().collect())
        };
        Ok(ValidatedConfig {
            listen_addr,
            log_level,
            die_timeout: Duration::from_millis(self.die_timeout_ms),
            allowed_chats,
            event_buffer: self.event_buffer,
            arena: self.arena,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let validated = Config::default().validate().expect("defaults are valid");
        assert_eq!(validated.listen_addr.port(), 9124);
        assert_eq!(validated.log_level, Level::INFO);
        assert!(validated.allowed_chats.is_none());
        assert_eq!(validated.arena, ArenaConfig::default());
    }

    #[test]
    fn test_yaml_fills_missing_fields_with_defaults() {
        let yaml = concat!(
            "port: 9500\n",
            "allowed_chats: [-100, -200]\n",
            "arena:\n  betting_ms: 30000\n  max_bet: null\n",
        );
        let config = Config::from_yaml(yaml).expect("parse");
        assert_eq!(config.port, 9500);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.arena.betting_ms, 30_000);
        assert_eq!(config.arena.roll_delay_ms, ArenaConfig::default().roll_delay_ms);
        assert_eq!(config.arena.max_bet, None);

        let validated = config.validate().expect("valid");
        let allowed = validated.allowed_chats.expect("allow-list");
        assert!(allowed.contains(&-100));
        assert!(!allowed.contains(&-300));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("PORT", "9999"),
                ("LOG_LEVEL", "debug"),
                ("ALLOWED_CHATS", "-1, -2,"),
                ("BETTING_MS", "5000"),
                ("MAX_BET", "0"),
                ("IDLE_ROUND_LIMIT", "5"),
            ]))
            .expect("overrides");
        assert_eq!(config.port, 9999);
        assert_eq!(config.allowed_chats, vec![-1, -2]);
        assert_eq!(config.arena.betting_ms, 5_000);
        assert_eq!(config.arena.max_bet, None);
        assert_eq!(config.arena.idle_round_limit, 5);
        assert_eq!(config.validate().expect("valid").log_level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("ROLL_DELAY_MS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                key: "DICE_ARENA_ROLL_DELAY_MS".to_string(),
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_validation_errors() {
        let bad_level = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            bad_level.validate(),
            Err(ConfigError::InvalidLogLevel { .. })
        ));

        let bad_host = Config {
            host: "not a host".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            bad_host.validate(),
            Err(ConfigError::InvalidListenAddr { .. })
        ));

        let no_timeout = Config {
            die_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(
            no_timeout.validate().unwrap_err(),
            ConfigError::InvalidNonZero {
                field: "die_timeout_ms",
                value: 0
            }
        );

        let mut bad_arena = Config::default();
        bad_arena.arena.betting_ms = 0;
        assert!(matches!(bad_arena.validate(), Err(ConfigError::Arena(_))));
    }
}

//! Engine configuration: typed sections with defaults, TOML file loading,
//! `CROUPIER_*` environment overrides, and a validation pass.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency symbol passed through to the balance ledger.
    pub currency: String,
    /// Ring-buffer capacity for settled-round history.
    pub history_capacity: usize,
    /// Broadcast channel capacity for lifecycle events.
    pub event_capacity: usize,
    pub fairness: FairnessConfig,
    pub crash: CrashConfig,
    pub dice: DiceConfig,
    pub plinko: PlinkoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessConfig {
    /// House edge as a fraction, shared by every game's outcome mapping.
    pub house_edge: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    /// Instant-crash multiplier and lower clamp.
    pub floor_multiplier: f64,
    /// Upper clamp on the crash point.
    pub max_multiplier: f64,
    /// Growth constant in the multiplier curve `exp(elapsed_ms / growth)`.
    pub growth_constant_ms: f64,
    /// Fixed tick period for multiplier recomputation.
    pub tick_interval_ms: u64,
    /// Betting window before Open transitions to Running.
    pub countdown_ms: u64,
    /// Pause between a settled round and the next round opening.
    pub inter_round_pause_ms: u64,
    pub min_bet: f64,
    pub max_bet: f64,
    /// Participant capacity per round.
    pub max_players: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceConfig {
    pub min_bet: f64,
    pub max_bet: f64,
    /// Win-chance bounds in percent; prevents multiplier overflow at the
    /// extremes.
    pub min_chance: f64,
    pub max_chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlinkoConfig {
    pub min_bet: f64,
    pub max_bet: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            history_capacity: 100,
            event_capacity: 1024,
            fairness: FairnessConfig::default(),
            crash: CrashConfig::default(),
            dice: DiceConfig::default(),
            plinko: PlinkoConfig::default(),
        }
    }
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self { house_edge: 0.01 }
    }
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            floor_multiplier: 1.0,
            max_multiplier: 10_000.0,
            growth_constant_ms: 5_000.0,
            tick_interval_ms: 100,
            countdown_ms: 5_000,
            inter_round_pause_ms: 3_000,
            min_bet: 0.1,
            max_bet: 1_000.0,
            max_players: 500,
        }
    }
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            min_bet: 0.1,
            max_bet: 1_000.0,
            min_chance: 0.1,
            max_chance: 98.0,
        }
    }
}

impl Default for PlinkoConfig {
    fn default() -> Self {
        Self {
            min_bet: 0.1,
            max_bet: 1_000.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration: defaults, optional TOML file, environment
    /// overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    ConfigError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
                })?;
                toml::from_str(&content)
                    .map_err(|e| ConfigError::LoadFailed(format!("Failed to parse TOML: {}", e)))?
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(edge) = env::var("CROUPIER_HOUSE_EDGE") {
            self.fairness.house_edge = parse_env("CROUPIER_HOUSE_EDGE", &edge)?;
        }
        if let Ok(tick) = env::var("CROUPIER_TICK_INTERVAL_MS") {
            self.crash.tick_interval_ms = parse_env("CROUPIER_TICK_INTERVAL_MS", &tick)?;
        }
        if let Ok(growth) = env::var("CROUPIER_GROWTH_CONSTANT_MS") {
            self.crash.growth_constant_ms = parse_env("CROUPIER_GROWTH_CONSTANT_MS", &growth)?;
        }
        if let Ok(currency) = env::var("CROUPIER_CURRENCY") {
            self.currency = currency;
        }
        Ok(())
    }

    /// Reject configurations the engine cannot run safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.fairness.house_edge) || self.fairness.house_edge == 0.0 {
            return Err(invalid(
                "fairness.house_edge",
                self.fairness.house_edge,
                "must lie in (0, 1)",
            ));
        }
        if self.crash.floor_multiplier < 1.0 {
            return Err(invalid(
                "crash.floor_multiplier",
                self.crash.floor_multiplier,
                "must be at least 1.0",
            ));
        }
        if self.crash.max_multiplier <= self.crash.floor_multiplier {
            return Err(invalid(
                "crash.max_multiplier",
                self.crash.max_multiplier,
                "must exceed the floor multiplier",
            ));
        }
        if self.crash.growth_constant_ms <= 0.0 {
            return Err(invalid(
                "crash.growth_constant_ms",
                self.crash.growth_constant_ms,
                "must be positive",
            ));
        }
        if self.crash.tick_interval_ms == 0 {
            return Err(invalid(
                "crash.tick_interval_ms",
                self.crash.tick_interval_ms,
                "must be positive",
            ));
        }
        if self.crash.min_bet <= 0.0 || self.crash.min_bet > self.crash.max_bet {
            return Err(invalid(
                "crash.min_bet",
                self.crash.min_bet,
                "must be positive and no greater than max_bet",
            ));
        }
        if self.crash.max_players == 0 {
            return Err(invalid("crash.max_players", 0, "must be positive"));
        }
        if self.dice.min_bet <= 0.0 || self.dice.min_bet > self.dice.max_bet {
            return Err(invalid(
                "dice.min_bet",
                self.dice.min_bet,
                "must be positive and no greater than max_bet",
            ));
        }
        if self.dice.min_chance <= 0.0 || self.dice.min_chance >= self.dice.max_chance {
            return Err(invalid(
                "dice.min_chance",
                self.dice.min_chance,
                "must be positive and below max_chance",
            ));
        }
        if self.dice.max_chance >= 100.0 {
            return Err(invalid(
                "dice.max_chance",
                self.dice.max_chance,
                "must stay below 100",
            ));
        }
        if self.plinko.min_bet <= 0.0 || self.plinko.min_bet > self.plinko.max_bet {
            return Err(invalid(
                "plinko.min_bet",
                self.plinko.min_bet,
                "must be positive and no greater than max_bet",
            ));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity", 0, "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl std::fmt::Display, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: "failed to parse".to_string(),
    })
}

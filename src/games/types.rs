use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Crash,
    Dice,
    Plinko,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Crash => write!(f, "crash"),
            GameType::Dice => write!(f, "dice"),
            GameType::Plinko => write!(f, "plinko"),
        }
    }
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
}

/// Dice bet direction relative to the target
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiceDirection {
    Over,
    Under,
}

impl fmt::Display for DiceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiceDirection::Over => write!(f, "over"),
            DiceDirection::Under => write!(f, "under"),
        }
    }
}

/// Plinko risk tier selecting the payout table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => write!(f, "low"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::High => write!(f, "high"),
        }
    }
}

/// Request to resolve a dice bet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DicePlayRequest {
    pub player_id: String,
    pub stake: f64,
    /// Roll target in `[0.01, 99.98]` at two decimals.
    pub target: f64,
    pub direction: DiceDirection,
}

/// Resolved dice bet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceResult {
    pub player_id: String,
    pub roll: f64,
    pub target: f64,
    pub direction: DiceDirection,
    /// Win chance in percent.
    pub win_chance: f64,
    pub payout_multiplier: f64,
    pub outcome: GameOutcome,
    pub stake: f64,
    pub payout: f64,
}

/// Request to resolve a plinko drop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlinkoPlayRequest {
    pub player_id: String,
    pub stake: f64,
    pub risk: RiskTier,
    pub rows: u8,
}

/// Resolved plinko drop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlinkoResult {
    pub player_id: String,
    pub risk: RiskTier,
    pub rows: u8,
    pub path: Vec<crate::fairness::Direction>,
    /// Landing slot, counted from the left edge.
    pub slot: usize,
    pub payout_multiplier: f64,
    pub outcome: GameOutcome,
    pub stake: f64,
    pub payout: f64,
}

/// Validation failures for the stateless resolvers. Returned synchronously,
/// never logged as anomalies; no state is mutated.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Stake {stake} outside allowed range [{min}, {max}]")]
    StakeOutOfRange { stake: f64, min: f64, max: f64 },

    #[error("Win chance {chance}% outside allowed range [{min}%, {max}%]")]
    ChanceOutOfRange { chance: f64, min: f64, max: f64 },

    #[error("Dice target {0} must lie in [0.01, 99.98] at two decimals")]
    InvalidTarget(f64),

    #[error("Unsupported plinko row count {0} (supported: 8, 12, 16)")]
    UnsupportedRows(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_serde_tags() {
        assert_eq!(serde_json::to_string(&GameType::Crash).unwrap(), "\"crash\"");
        assert_eq!(serde_json::to_string(&RiskTier::Medium).unwrap(), "\"medium\"");
        let dir: DiceDirection = serde_json::from_str("\"under\"").unwrap();
        assert_eq!(dir, DiceDirection::Under);
    }
}

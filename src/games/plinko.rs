//! Stateless plinko resolver.
//!
//! The fairness layer derives one left/right decision per pin row; the ball
//! lands in the slot counted by rightward bounces and pays the tier table
//! multiplier for that slot. No shared state between calls.

use crate::config::PlinkoConfig;
use crate::fairness::{self, Direction, SeedPair};
use crate::games::types::{GameOutcome, PlinkoPlayRequest, PlinkoResult, ResolveError};

/// Supported board heights.
pub const SUPPORTED_ROWS: [u8; 3] = [8, 12, 16];

// Payout tables per (rows, tier), slots left to right. Center-heavy binomial
// landing probabilities make the aggressive edges rare enough that each table
// keeps the configured return-to-player.
const LOW_8: [f64; 9] = [5.6, 2.1, 1.1, 1.0, 0.5, 1.0, 1.1, 2.1, 5.6];
const MEDIUM_8: [f64; 9] = [13.0, 3.0, 1.3, 0.7, 0.4, 0.7, 1.3, 3.0, 13.0];
const HIGH_8: [f64; 9] = [29.0, 4.0, 1.5, 0.3, 0.2, 0.3, 1.5, 4.0, 29.0];

const LOW_12: [f64; 13] = [10.0, 3.0, 1.6, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 1.6, 3.0, 10.0];
const MEDIUM_12: [f64; 13] = [33.0, 11.0, 4.0, 2.0, 1.1, 0.6, 0.3, 0.6, 1.1, 2.0, 4.0, 11.0, 33.0];
const HIGH_12: [f64; 13] = [170.0, 24.0, 8.1, 2.0, 0.7, 0.2, 0.2, 0.2, 0.7, 2.0, 8.1, 24.0, 170.0];

const LOW_16: [f64; 17] = [
    16.0, 9.0, 2.0, 1.4, 1.4, 1.2, 1.1, 1.0, 0.5, 1.0, 1.1, 1.2, 1.4, 1.4, 2.0, 9.0, 16.0,
];
const MEDIUM_16: [f64; 17] = [
    110.0, 41.0, 10.0, 5.0, 3.0, 1.5, 1.0, 0.5, 0.3, 0.5, 1.0, 1.5, 3.0, 5.0, 10.0, 41.0, 110.0,
];
const HIGH_16: [f64; 17] = [
    1000.0, 130.0, 26.0, 9.0, 4.0, 2.0, 0.2, 0.2, 0.2, 0.2, 0.2, 2.0, 4.0, 9.0, 26.0, 130.0, 1000.0,
];

pub struct PlinkoResolver {
    config: PlinkoConfig,
}

impl PlinkoResolver {
    pub fn new(config: PlinkoConfig) -> Self {
        Self { config }
    }

    /// Payout table for a (rows, tier) pair.
    pub fn multiplier_table(rows: u8, risk: crate::games::types::RiskTier) -> Result<&'static [f64], ResolveError> {
        use crate::games::types::RiskTier::*;
        match (rows, risk) {
            (8, Low) => Ok(&LOW_8),
            (8, Medium) => Ok(&MEDIUM_8),
            (8, High) => Ok(&HIGH_8),
            (12, Low) => Ok(&LOW_12),
            (12, Medium) => Ok(&MEDIUM_12),
            (12, High) => Ok(&HIGH_12),
            (16, Low) => Ok(&LOW_16),
            (16, Medium) => Ok(&MEDIUM_16),
            (16, High) => Ok(&HIGH_16),
            (rows, _) => Err(ResolveError::UnsupportedRows(rows)),
        }
    }

    /// Resolve a plinko drop against the path derived from `(seed, nonce)`.
    pub fn resolve(
        &self,
        request: &PlinkoPlayRequest,
        seed: &SeedPair,
        nonce: u64,
    ) -> Result<PlinkoResult, ResolveError> {
        if !request.stake.is_finite()
            || request.stake < self.config.min_bet
            || request.stake > self.config.max_bet
        {
            return Err(ResolveError::StakeOutOfRange {
                stake: request.stake,
                min: self.config.min_bet,
                max: self.config.max_bet,
            });
        }

        let table = Self::multiplier_table(request.rows, request.risk)?;
        let path = fairness::outcome_to_plinko_path(seed, nonce, request.rows);
        let slot = path.iter().filter(|d| **d == Direction::Right).count();
        let payout_multiplier = table[slot];
        let payout = request.stake * payout_multiplier;

        Ok(PlinkoResult {
            player_id: request.player_id.clone(),
            risk: request.risk,
            rows: request.rows,
            path,
            slot,
            payout_multiplier,
            outcome: if payout_multiplier >= 1.0 { GameOutcome::Win } else { GameOutcome::Loss },
            stake: request.stake,
            payout,
        })
    }
}

//! Stateless dice resolver.
//!
//! Each bet is resolved in a single call from a freshly derived outcome
//! digest; there is no round concept and no shared state, so calls are safe
//! under unbounded parallelism.

use crate::config::DiceConfig;
use crate::fairness::{self, SeedPair};
use crate::games::types::{DiceDirection, DicePlayRequest, DiceResult, GameOutcome, ResolveError};

/// Rolls live on a 0.00..=99.99 lattice.
const ROLL_STEPS: u32 = 10_000;

pub struct DiceResolver {
    config: DiceConfig,
    house_edge: f64,
}

impl DiceResolver {
    pub fn new(config: DiceConfig, house_edge: f64) -> Self {
        Self { config, house_edge }
    }

    /// Win chance in percent for a target/direction pair.
    ///
    /// The roll lattice has 10,000 outcomes; `Under` wins on rolls strictly
    /// below the target, `Over` on rolls strictly above.
    pub fn win_chance(target: f64, direction: DiceDirection) -> Result<f64, ResolveError> {
        let units = (target * 100.0).round();
        if !(1.0..=(ROLL_STEPS as f64 - 2.0)).contains(&units) || (units - target * 100.0).abs() > 1e-6 {
            return Err(ResolveError::InvalidTarget(target));
        }
        let winning = match direction {
            DiceDirection::Under => units as u32,
            DiceDirection::Over => ROLL_STEPS - 1 - units as u32,
        };
        Ok(winning as f64 * 100.0 / ROLL_STEPS as f64)
    }

    /// Payout multiplier for a win chance, carrying the configured house edge:
    /// `(100 - edge%) / chance`, so `P(win) * multiplier == 1 - edge` for
    /// every achievable parameterization.
    pub fn payout_multiplier(&self, win_chance: f64) -> f64 {
        (1.0 - self.house_edge) * 100.0 / win_chance
    }

    /// Resolve a dice bet against the outcome derived from `(seed, nonce)`.
    pub fn resolve(
        &self,
        request: &DicePlayRequest,
        seed: &SeedPair,
        nonce: u64,
    ) -> Result<DiceResult, ResolveError> {
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

        let win_chance = Self::win_chance(request.target, request.direction)?;
        if win_chance < self.config.min_chance || win_chance > self.config.max_chance {
            return Err(ResolveError::ChanceOutOfRange {
                chance: win_chance,
                min: self.config.min_chance,
                max: self.config.max_chance,
            });
        }

        let digest = fairness::derive_outcome(seed, nonce);
        let roll = fairness::outcome_to_dice_roll(fairness::outcome_to_unit_float(&digest));

        let won = match request.direction {
            DiceDirection::Under => roll < request.target,
            DiceDirection::Over => roll > request.target,
        };
        let payout_multiplier = self.payout_multiplier(win_chance);
        let payout = if won { request.stake * payout_multiplier } else { 0.0 };

        Ok(DiceResult {
            player_id: request.player_id.clone(),
            roll,
            target: request.target,
            direction: request.direction,
            win_chance,
            payout_multiplier,
            outcome: if won { GameOutcome::Win } else { GameOutcome::Loss },
            stake: request.stake,
            payout,
        })
    }
}

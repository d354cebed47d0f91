//! The live crash round: a single shared state machine advancing a
//! multiplier on a fixed tick until a pre-committed, undisclosed crash point.
//!
//! Phases: `Open → Running → Crashed → Settled`. Every mutation — bet
//! placement, the tick sweep, manual cash-out, settlement — serializes
//! through one per-round lock, which is what makes bet settlement
//! exactly-once: the first path to observe an unsettled bet and mark it
//! settled wins; the loser receives `AlreadySettled`.

use crate::config::CrashConfig;
use crate::events::{EventBus, RoundEvent};
use crate::fairness::{RevealedSeed, SeedPair};
use crate::history::HistoryEntry;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Round lifecycle phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Open,
    Running,
    Crashed,
    Settled,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Open => write!(f, "open"),
            RoundPhase::Running => write!(f, "running"),
            RoundPhase::Crashed => write!(f, "crashed"),
            RoundPhase::Settled => write!(f, "settled"),
        }
    }
}

/// Bet-facing errors. Validation failures and lost settlement races are
/// returned synchronously to the caller and never mutate round state.
#[derive(Debug, thiserror::Error)]
pub enum BetError {
    #[error("Round is in the {0} phase")]
    WrongPhase(RoundPhase),

    #[error("Player {0} already has a bet in this round")]
    DuplicateBet(String),

    #[error("Stake {stake} outside allowed range [{min}, {max}]")]
    StakeOutOfRange { stake: f64, min: f64, max: f64 },

    #[error("Round is at capacity ({0} participants)")]
    RoundFull(usize),

    #[error("Auto cash-out {0} must exceed the floor multiplier")]
    InvalidAutoCashOut(f64),

    #[error("No bet found for player {0}")]
    NoBet(String),

    #[error("Bet for player {0} is already settled")]
    AlreadySettled(String),

    #[error("No active round")]
    NoActiveRound,
}

/// A participant's bet. Mutated at most once, to its terminal settled value.
#[derive(Debug, Clone, Serialize)]
pub struct Bet {
    pub player_id: String,
    pub stake: f64,
    pub auto_cash_out: Option<f64>,
    pub cashed_out_at: Option<f64>,
    pub settled: bool,
}

/// Receipt for a successful cash-out (manual or auto).
#[derive(Debug, Clone, Serialize)]
pub struct CashOut {
    pub player_id: String,
    pub multiplier: f64,
    pub payout: f64,
}

/// Ledger-facing settlement line for one participant.
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub player_id: String,
    pub stake: f64,
    pub payout: f64,
    pub profit: f64,
}

/// Outcome of one tick.
#[derive(Debug)]
pub enum TickResult {
    /// Round continues; `cashed_out` holds this tick's auto cash-outs, in
    /// ascending player-id order.
    Running { multiplier: f64, cashed_out: Vec<CashOut> },
    /// The crash point was reached on this tick; no further ticks may fire.
    Crashed { crash_point: f64 },
    /// The round is not running; the caller should stop its ticker.
    Idle,
}

struct RoundInner {
    phase: RoundPhase,
    started_at: Option<Instant>,
    current_multiplier: f64,
    bets: BTreeMap<String, Bet>,
}

/// One crash round. Created by the scheduler with a committed seed pair and
/// a crash point derived from it; both stay hidden until the crash.
pub struct CrashRound {
    round_id: String,
    seed: SeedPair,
    crash_point: f64,
    config: CrashConfig,
    events: EventBus,
    inner: Mutex<RoundInner>,
}

/// Multiplier growth curve: `exp(elapsed_ms / growth_constant_ms)`.
pub fn multiplier_at(elapsed: Duration, growth_constant_ms: f64) -> f64 {
    (elapsed.as_secs_f64() * 1_000.0 / growth_constant_ms).exp()
}

impl CrashRound {
    pub fn new(seed: SeedPair, crash_point: f64, config: CrashConfig, events: EventBus) -> Self {
        let floor = config.floor_multiplier;
        Self {
            round_id: Uuid::new_v4().to_string(),
            seed,
            crash_point,
            config,
            events,
            inner: Mutex::new(RoundInner {
                phase: RoundPhase::Open,
                started_at: None,
                current_multiplier: floor,
                bets: BTreeMap::new(),
            }),
        }
    }

    fn locked(&self) -> MutexGuard<'_, RoundInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn round_id(&self) -> &str {
        &self.round_id
    }

    /// The published commitment for this round's server seed.
    pub fn server_seed_hash(&self) -> &str {
        &self.seed.server_seed_hash
    }

    pub fn client_seed(&self) -> &str {
        &self.seed.client_seed
    }

    pub fn phase(&self) -> RoundPhase {
        self.locked().phase
    }

    pub fn multiplier(&self) -> f64 {
        self.locked().current_multiplier
    }

    pub fn participant_count(&self) -> usize {
        self.locked().bets.len()
    }

    /// The crash point, observable only once the round has crashed.
    pub fn crash_point(&self) -> Option<f64> {
        match self.locked().phase {
            RoundPhase::Crashed | RoundPhase::Settled => Some(self.crash_point),
            _ => None,
        }
    }

    /// The revealed seed pair, observable only once the round has crashed.
    pub fn revealed_seed(&self) -> Option<RevealedSeed> {
        match self.locked().phase {
            RoundPhase::Crashed | RoundPhase::Settled => Some(self.seed.reveal()),
            _ => None,
        }
    }

    /// Accept a bet during the open window.
    pub fn place_bet(
        &self,
        player_id: &str,
        stake: f64,
        auto_cash_out: Option<f64>,
    ) -> Result<(), BetError> {
        let mut inner = self.locked();
        if inner.phase != RoundPhase::Open {
            return Err(BetError::WrongPhase(inner.phase));
        }
        if inner.bets.contains_key(player_id) {
            return Err(BetError::DuplicateBet(player_id.to_string()));
        }
        if !stake.is_finite() || stake < self.config.min_bet || stake > self.config.max_bet {
            return Err(BetError::StakeOutOfRange {
                stake,
                min: self.config.min_bet,
                max: self.config.max_bet,
            });
        }
        if inner.bets.len() >= self.config.max_players {
            return Err(BetError::RoundFull(self.config.max_players));
        }
        if let Some(auto) = auto_cash_out {
            if !auto.is_finite() || auto <= self.config.floor_multiplier {
                return Err(BetError::InvalidAutoCashOut(auto));
            }
        }

        inner.bets.insert(
            player_id.to_string(),
            Bet {
                player_id: player_id.to_string(),
                stake,
                auto_cash_out,
                cashed_out_at: None,
                settled: false,
            },
        );
        self.events.publish(RoundEvent::BetPlaced {
            round_id: self.round_id.clone(),
            player_id: player_id.to_string(),
            stake,
        });
        Ok(())
    }

    /// Close the betting window and start the multiplier clock.
    pub fn start(&self) -> Result<(), BetError> {
        let mut inner = self.locked();
        if inner.phase != RoundPhase::Open {
            return Err(BetError::WrongPhase(inner.phase));
        }
        inner.phase = RoundPhase::Running;
        inner.started_at = Some(Instant::now());
        debug!(round_id = %self.round_id, participants = inner.bets.len(), "round running");
        Ok(())
    }

    /// Recompute the multiplier from wall-clock elapsed time and apply one
    /// tick. Returns `Idle` when the round is not running.
    pub fn tick(&self) -> TickResult {
        let raw = {
            let inner = self.locked();
            match (inner.phase, inner.started_at) {
                (RoundPhase::Running, Some(started)) => {
                    multiplier_at(started.elapsed(), self.config.growth_constant_ms)
                }
                _ => return TickResult::Idle,
            }
        };
        self.apply_tick(raw)
    }

    /// One tick at an explicit multiplier value.
    ///
    /// If the crash point is reached the round transitions to `Crashed` with
    /// the multiplier clamped, and no sweep runs on that tick. Otherwise the
    /// update is published and the auto-cash-out sweep settles every
    /// triggered bet at the *current* multiplier, in ascending player-id
    /// order. The sweep completes under the round lock, so a later tick
    /// cannot crash the round past a half-finished sweep.
    fn apply_tick(&self, raw: f64) -> TickResult {
        let mut inner = self.locked();
        if inner.phase != RoundPhase::Running {
            return TickResult::Idle;
        }

        // Monotonic within the round.
        let multiplier = raw.max(inner.current_multiplier);

        if multiplier >= self.crash_point {
            inner.current_multiplier = self.crash_point;
            inner.phase = RoundPhase::Crashed;
            self.events.publish(RoundEvent::RoundCrashed {
                round_id: self.round_id.clone(),
                crash_point: self.crash_point,
                server_seed: self.seed.reveal().server_seed,
            });
            return TickResult::Crashed { crash_point: self.crash_point };
        }

        inner.current_multiplier = multiplier;
        self.events.publish(RoundEvent::MultiplierUpdated {
            round_id: self.round_id.clone(),
            multiplier,
        });

        let mut cashed_out = Vec::new();
        for (player_id, bet) in inner.bets.iter_mut() {
            if bet.settled {
                continue;
            }
            let Some(auto) = bet.auto_cash_out else {
                continue;
            };
            if auto <= multiplier {
                bet.settled = true;
                bet.cashed_out_at = Some(multiplier);
                cashed_out.push(CashOut {
                    player_id: player_id.clone(),
                    multiplier,
                    payout: bet.stake * multiplier,
                });
            }
        }
        for cash_out in &cashed_out {
            self.events.publish(RoundEvent::PlayerCashedOut {
                round_id: self.round_id.clone(),
                player_id: cash_out.player_id.clone(),
                multiplier: cash_out.multiplier,
                payout: cash_out.payout,
            });
        }

        TickResult::Running { multiplier, cashed_out }
    }

    /// Manual cash-out at the multiplier current at the instant of
    /// settlement. Races with the tick sweep resolve to exactly one winner.
    pub fn cash_out(&self, player_id: &str) -> Result<CashOut, BetError> {
        let mut inner = self.locked();
        if inner.phase != RoundPhase::Running {
            return Err(BetError::WrongPhase(inner.phase));
        }
        let multiplier = inner.current_multiplier;
        let bet = inner
            .bets
            .get_mut(player_id)
            .ok_or_else(|| BetError::NoBet(player_id.to_string()))?;
        if bet.settled {
            return Err(BetError::AlreadySettled(player_id.to_string()));
        }
        bet.settled = true;
        bet.cashed_out_at = Some(multiplier);
        let receipt = CashOut {
            player_id: player_id.to_string(),
            multiplier,
            payout: bet.stake * multiplier,
        };
        self.events.publish(RoundEvent::PlayerCashedOut {
            round_id: self.round_id.clone(),
            player_id: receipt.player_id.clone(),
            multiplier: receipt.multiplier,
            payout: receipt.payout,
        });
        Ok(receipt)
    }

    /// Resolve every outstanding bet after the crash and archive the round.
    ///
    /// Bets never cashed out are marked lost with payout 0 at the crash
    /// point. Returns the history entry and the per-player settlement batch
    /// for the ledger collaborator.
    pub fn settle(&self) -> Result<(HistoryEntry, Vec<Settlement>), BetError> {
        let mut inner = self.locked();
        if inner.phase != RoundPhase::Crashed {
            return Err(BetError::WrongPhase(inner.phase));
        }

        let mut settlements = Vec::with_capacity(inner.bets.len());
        let mut total_stake = 0.0;
        let mut total_payout = 0.0;
        for bet in inner.bets.values_mut() {
            if !bet.settled {
                bet.settled = true;
            }
            let payout = bet.cashed_out_at.map_or(0.0, |m| bet.stake * m);
            total_stake += bet.stake;
            total_payout += payout;
            settlements.push(Settlement {
                player_id: bet.player_id.clone(),
                stake: bet.stake,
                payout,
                profit: payout - bet.stake,
            });
        }
        inner.phase = RoundPhase::Settled;

        let entry = HistoryEntry {
            round_id: self.round_id.clone(),
            crash_point: self.crash_point,
            seeds: self.seed.reveal(),
            participants: settlements.len(),
            total_stake,
            total_payout,
            settled_at: Utc::now(),
        };
        self.events.publish(RoundEvent::RoundSettled {
            round_id: self.round_id.clone(),
            summary: entry.clone(),
        });
        Ok((entry, settlements))
    }
}

//! Round lifecycle driver.
//!
//! Owns the periodic ticker and the succession of crash rounds: seed →
//! countdown → run to crash → settle → pause → repeat. Exactly one round is
//! active at a time and the scheduler is the sole writer of which round is
//! current; the running flag guarantees at most one tick driver per process.

use crate::config::EngineConfig;
use crate::events::{EventBus, RoundEvent};
use crate::fairness::{self, SeedPair};
use crate::games::crash::{BetError, CashOut, CrashRound, RoundPhase, TickResult};
use crate::history::RoundHistory;
use crate::ledger::BalanceLedger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct RoundScheduler {
    config: EngineConfig,
    events: EventBus,
    ledger: Arc<dyn BalanceLedger>,
    history: Arc<RoundHistory>,
    current: RwLock<Option<Arc<CrashRound>>>,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
    next_client_seed: Mutex<Option<String>>,
}

impl RoundScheduler {
    pub fn new(config: EngineConfig, ledger: Arc<dyn BalanceLedger>) -> Arc<Self> {
        let events = EventBus::new(config.event_capacity);
        let history = Arc::new(RoundHistory::new(config.history_capacity));
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            config,
            events,
            ledger,
            history,
            current: RwLock::new(None),
            running: AtomicBool::new(false),
            shutdown,
            next_client_seed: Mutex::new(None),
        })
    }

    /// Spawn the driver task. Returns `None` if one is already running.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("round scheduler already running");
            return None;
        }
        self.shutdown.send_replace(false);
        let scheduler = self.clone();
        let shutdown_rx = self.shutdown.subscribe();
        Some(tokio::spawn(scheduler.run_loop(shutdown_rx)))
    }

    /// Signal the driver to stop. The current ticker is cancelled; no ticks
    /// fire for a discarded round.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn history(&self) -> Arc<RoundHistory> {
        self.history.clone()
    }

    pub fn current_round(&self) -> Option<Arc<CrashRound>> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Queue a client seed contribution for the next round's seed pair.
    pub fn set_next_client_seed(&self, seed: String) {
        let mut slot = self.next_client_seed.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(seed);
    }

    /// Place a bet on the current round. The in-memory decision is final
    /// before the stake debit is issued; a failed debit is logged for the
    /// ledger collaborator to reconcile and does not void the bet.
    pub async fn place_bet(
        &self,
        player_id: &str,
        stake: f64,
        auto_cash_out: Option<f64>,
    ) -> Result<(), BetError> {
        let round = self.current_round().ok_or(BetError::NoActiveRound)?;
        round.place_bet(player_id, stake, auto_cash_out)?;
        if let Err(e) = self.ledger.debit(player_id, stake, &self.config.currency).await {
            warn!(player_id, stake, error = %e, "stake debit failed after accepted bet");
        }
        Ok(())
    }

    /// Cash out the caller's bet on the current round at the current
    /// multiplier. Credit is issued only after the settlement is final.
    pub async fn cash_out(&self, player_id: &str) -> Result<CashOut, BetError> {
        let round = self.current_round().ok_or(BetError::NoActiveRound)?;
        let receipt = round.cash_out(player_id)?;
        if let Err(e) = self
            .ledger
            .credit(player_id, receipt.payout, &self.config.currency)
            .await
        {
            warn!(player_id, payout = receipt.payout, error = %e, "cash-out credit failed after settlement");
        }
        Ok(receipt)
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            house_edge = self.config.fairness.house_edge,
            tick_interval_ms = self.config.crash.tick_interval_ms,
            "round scheduler started"
        );

        while self.running.load(Ordering::SeqCst) {
            match self.run_one_round(&mut shutdown).await {
                Ok(()) => {}
                Err(e) => {
                    // Entropy failure is fatal: refuse to run further rounds
                    // rather than degrade to a weaker source.
                    error!(error = %e, "refusing to create a new round");
                    break;
                }
            }
            if *shutdown.borrow() {
                break;
            }
            if !self.pause(self.config.crash.inter_round_pause_ms, &mut shutdown).await {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        info!("round scheduler stopped");
    }

    async fn run_one_round(
        self: &Arc<Self>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), fairness::FairnessError> {
        let client_seed = self
            .next_client_seed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let seed = SeedPair::generate(client_seed)?;

        // Crash point from nonce 0, fixed at creation and never recomputed.
        let digest = fairness::derive_outcome(&seed, 0);
        let unit = fairness::outcome_to_unit_float(&digest);
        let crash_point = fairness::outcome_to_crash_multiplier(
            unit,
            self.config.fairness.house_edge,
            self.config.crash.floor_multiplier,
            self.config.crash.max_multiplier,
        );

        let round = Arc::new(CrashRound::new(
            seed,
            crash_point,
            self.config.crash.clone(),
            self.events.clone(),
        ));
        info!(round_id = %round.round_id(), commitment = %round.server_seed_hash(), "round open");

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(round.clone());
        self.events.publish(RoundEvent::RoundStarted {
            round_id: round.round_id().to_string(),
            server_seed_hash: round.server_seed_hash().to_string(),
            client_seed: round.client_seed().to_string(),
        });

        if !self.pause(self.config.crash.countdown_ms, shutdown).await {
            return Ok(());
        }
        if round.start().is_err() {
            return Ok(());
        }

        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.crash.tick_interval_ms));
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => match round.tick() {
                    TickResult::Running { cashed_out, .. } => {
                        // Per-player failures must not abort the sweep.
                        for cash_out in cashed_out {
                            if let Err(e) = self
                                .ledger
                                .credit(&cash_out.player_id, cash_out.payout, &self.config.currency)
                                .await
                            {
                                warn!(
                                    player_id = %cash_out.player_id,
                                    payout = cash_out.payout,
                                    error = %e,
                                    "auto cash-out credit failed after settlement"
                                );
                            }
                        }
                    }
                    TickResult::Crashed { crash_point } => {
                        info!(round_id = %round.round_id(), crash_point, "round crashed");
                        break;
                    }
                    TickResult::Idle => break,
                },
            }
        }

        if round.phase() == RoundPhase::Crashed {
            match round.settle() {
                Ok((entry, batch)) => {
                    if let Err(e) = self.ledger.settle_round(round.round_id(), &batch).await {
                        warn!(round_id = %round.round_id(), error = %e, "settlement batch hand-off failed");
                    }
                    self.history.record(entry);
                }
                Err(e) => warn!(round_id = %round.round_id(), error = %e, "settlement failed"),
            }
        }
        Ok(())
    }

    /// Sleep for a fixed scheduling delay; returns `false` on shutdown.
    async fn pause(&self, ms: u64, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(ms)) => true,
            _ = shutdown.changed() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    #[tokio::test]
    async fn test_at_most_one_driver() {
        let scheduler = RoundScheduler::new(EngineConfig::default(), Arc::new(MemoryLedger::new()));
        let handle = scheduler.start().expect("first start succeeds");
        assert!(scheduler.start().is_none());

        scheduler.stop();
        handle.await.expect("driver exits cleanly");
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_bets_require_an_active_round() {
        let scheduler = RoundScheduler::new(EngineConfig::default(), Arc::new(MemoryLedger::new()));
        assert!(matches!(
            scheduler.place_bet("p1", 10.0, None).await,
            Err(BetError::NoActiveRound)
        ));
        assert!(matches!(
            scheduler.cash_out("p1").await,
            Err(BetError::NoActiveRound)
        ));
    }
}

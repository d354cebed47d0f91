//! End-to-end scheduler lifecycle: open, bet, run, crash, settle, verify.

use croupier::events::RoundEvent;
use croupier::fairness::{self, OutcomeQuery, SeedPair, VerifiedOutcome};
use croupier::ledger::MemoryLedger;
use croupier::scheduler::RoundScheduler;
use croupier::{EngineConfig, RevealedSeed, RoundPhase};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.crash.countdown_ms = 250;
    config.crash.tick_interval_ms = 10;
    config.crash.inter_round_pause_ms = 50;
    config.crash.growth_constant_ms = 30.0;
    config.validate().expect("fast config is valid");
    config
}

#[tokio::test]
async fn test_full_round_lifecycle_with_verification() {
    let config = fast_config();
    let house_edge = config.fairness.house_edge;
    let floor = config.crash.floor_multiplier;
    let max = config.crash.max_multiplier;

    let ledger = Arc::new(MemoryLedger::new());
    ledger.deposit("p1", 1_000.0);

    let scheduler = RoundScheduler::new(config, ledger.clone());
    let mut events = scheduler.events().subscribe();
    let handle = scheduler.start().expect("scheduler starts");

    // === PHASE 1: wait for the round to open and place a bet ===
    let (round_id, server_seed_hash, client_seed) = loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("round opens in time")
            .expect("event stream alive");
        if let RoundEvent::RoundStarted { round_id, server_seed_hash, client_seed } = event {
            break (round_id, server_seed_hash, client_seed);
        }
    };

    let round = scheduler.current_round().expect("round is current");
    assert_eq!(round.round_id(), round_id);
    assert_eq!(round.phase(), RoundPhase::Open);
    // Commitment published, crash point and seed still hidden.
    assert_eq!(round.server_seed_hash(), server_seed_hash);
    assert!(round.crash_point().is_none());
    assert!(round.revealed_seed().is_none());

    scheduler
        .place_bet("p1", 10.0, Some(1.05))
        .await
        .expect("bet accepted during the open window");
    assert!((ledger.balance_of("p1") - 990.0).abs() < 1e-9);

    // === PHASE 2: collect events until the round settles ===
    let mut bet_seen = false;
    let mut multipliers = Vec::new();
    let mut cash_out: Option<(f64, f64)> = None;
    let mut crash: Option<(f64, String)> = None;
    let summary = loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("round settles in time")
            .expect("event stream alive");
        match event {
            RoundEvent::BetPlaced { player_id, stake, .. } => {
                assert_eq!(player_id, "p1");
                assert!((stake - 10.0).abs() < 1e-9);
                bet_seen = true;
            }
            RoundEvent::MultiplierUpdated { multiplier, .. } => multipliers.push(multiplier),
            RoundEvent::PlayerCashedOut { player_id, multiplier, payout, .. } => {
                assert_eq!(player_id, "p1");
                assert!(cash_out.is_none(), "at most one cash-out per bet");
                cash_out = Some((multiplier, payout));
            }
            RoundEvent::RoundCrashed { crash_point, server_seed, .. } => {
                crash = Some((crash_point, server_seed));
            }
            RoundEvent::RoundSettled { summary, .. } => break summary,
            RoundEvent::RoundStarted { .. } => panic!("next round started before settlement"),
        }
    };

    assert!(bet_seen);
    // Multiplier stream is monotonically non-decreasing.
    for pair in multipliers.windows(2) {
        assert!(pair[1] >= pair[0], "multiplier regressed: {:?}", pair);
    }

    let (crash_point, server_seed) = crash.expect("crash precedes settlement");
    assert_eq!(summary.round_id, round_id);
    assert!((summary.crash_point - crash_point).abs() < 1e-9);
    assert_eq!(summary.participants, 1);

    // === PHASE 3: externally verify the revealed seeds ===
    let revealed = RevealedSeed {
        server_seed,
        server_seed_hash,
        client_seed,
        nonce: 0,
    };
    let pair = SeedPair::from_revealed(&revealed).expect("commitment holds");
    match fairness::recompute_outcome(&pair, 0, &OutcomeQuery::Crash { house_edge, floor, max }) {
        VerifiedOutcome::Crash { multiplier } => {
            assert!((multiplier - crash_point).abs() < 1e-9, "crash point reproduces from seeds");
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    // === PHASE 4: ledger consistency ===
    match cash_out {
        Some((multiplier, payout)) => {
            assert!((payout - 10.0 * multiplier).abs() < 1e-9);
            assert!((summary.total_payout - payout).abs() < 1e-9);
            assert!((ledger.balance_of("p1") - (990.0 + payout)).abs() < 1e-9);
        }
        None => {
            // The round crashed before the auto threshold; stake is lost.
            assert_eq!(summary.total_payout, 0.0);
            assert!((ledger.balance_of("p1") - 990.0).abs() < 1e-9);
        }
    }

    scheduler.stop();
    handle.await.expect("driver exits cleanly");
    assert!(scheduler.current_round().is_none());
}

#[tokio::test]
async fn test_rounds_succeed_one_another() {
    let scheduler = RoundScheduler::new(fast_config(), Arc::new(MemoryLedger::new()));
    scheduler.set_next_client_seed("my-lucky-seed".to_string());
    let mut events = scheduler.events().subscribe();
    let handle = scheduler.start().expect("scheduler starts");

    let mut started = Vec::new();
    let mut settled = 0;
    while settled < 2 {
        let event = tokio::time::timeout(Duration::from_secs(15), events.recv())
            .await
            .expect("two rounds complete in time")
            .expect("event stream alive");
        match event {
            RoundEvent::RoundStarted { round_id, client_seed, .. } => {
                started.push((round_id, client_seed))
            }
            RoundEvent::RoundSettled { .. } => settled += 1,
            _ => {}
        }
    }

    // Each round carries a distinct id and its own seed pair.
    assert!(started.len() >= 2);
    assert_ne!(started[0].0, started[1].0);
    // The queued client seed contribution applies to the first round only.
    assert_eq!(started[0].1, "my-lucky-seed");
    assert_ne!(started[1].1, "my-lucky-seed");

    let history = scheduler.history();
    assert!(history.totals().rounds >= 2);
    let recent = history.recent(10);
    assert!(!recent.is_empty());
    // Every archived round exposes revealed seeds matching its commitment.
    for entry in &recent {
        SeedPair::from_revealed(&entry.seeds).expect("archived commitment holds");
    }

    scheduler.stop();
    handle.await.expect("driver exits cleanly");
}

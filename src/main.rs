//! Croupier demo binary
//!
//! Runs the round scheduler against the in-memory ledger with a handful of
//! scripted players and logs the lifecycle event stream.

use clap::Parser;
use croupier::events::RoundEvent;
use croupier::ledger::MemoryLedger;
use croupier::scheduler::RoundScheduler;
use croupier::EngineConfig;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "croupier")]
#[command(about = "Provably-fair round engine demo", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of rounds to run before exiting
    #[arg(long, default_value = "3")]
    rounds: u64,

    /// Number of scripted players
    #[arg(long, default_value = "4")]
    players: usize,

    /// Starting balance deposited per player
    #[arg(long, default_value = "1000.0")]
    bankroll: f64,

    /// Override the configured house edge
    #[arg(long)]
    house_edge: Option<f64>,

    /// Override the configured tick interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = EngineConfig::load(args.config.as_deref())?;
    if let Some(edge) = args.house_edge {
        config.fairness.house_edge = edge;
    }
    if let Some(tick) = args.tick_ms {
        config.crash.tick_interval_ms = tick;
    }
    config.validate()?;

    let ledger = Arc::new(MemoryLedger::new());
    for i in 0..args.players {
        ledger.deposit(&format!("player-{}", i), args.bankroll);
    }

    info!("🎰 croupier starting: {} rounds, {} players", args.rounds, args.players);
    let scheduler = RoundScheduler::new(config, ledger.clone());
    let mut events = scheduler.events().subscribe();
    let mut bettor_events = scheduler.events().subscribe();
    let handle = scheduler.start().expect("scheduler not yet running");

    // Scripted bettors: a bet per player at round open, some on auto.
    let bettor_scheduler = scheduler.clone();
    let player_count = args.players;
    let bettors = tokio::spawn(async move {
        while let Ok(event) = bettor_events.recv().await {
            if let RoundEvent::RoundStarted { .. } = event {
                for i in 0..player_count {
                    let (stake, auto) = {
                        let mut rng = rand::thread_rng();
                        let stake = rng.gen_range(1.0..10.0);
                        let auto = if rng.gen_bool(0.7) {
                            Some(rng.gen_range(1.2..3.0))
                        } else {
                            None
                        };
                        (stake, auto)
                    };
                    let player_id = format!("player-{}", i);
                    if let Err(e) = bettor_scheduler.place_bet(&player_id, stake, auto).await {
                        warn!(%player_id, error = %e, "bet rejected");
                    }
                }
            }
        }
    });

    let mut settled = 0u64;
    while settled < args.rounds {
        match events.recv().await {
            Ok(RoundEvent::RoundStarted { round_id, server_seed_hash, .. }) => {
                info!(%round_id, commitment = %server_seed_hash, "round open for bets");
            }
            Ok(RoundEvent::PlayerCashedOut { player_id, multiplier, payout, .. }) => {
                info!(%player_id, multiplier, payout, "cashed out");
            }
            Ok(RoundEvent::RoundCrashed { round_id, crash_point, .. }) => {
                info!(%round_id, crash_point, "crashed");
            }
            Ok(RoundEvent::RoundSettled { summary, .. }) => {
                settled += 1;
                info!(
                    round = settled,
                    crash_point = summary.crash_point,
                    participants = summary.participants,
                    total_stake = summary.total_stake,
                    total_payout = summary.total_payout,
                    "round settled"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "event stream interrupted");
                break;
            }
        }
    }

    scheduler.stop();
    let _ = handle.await;
    bettors.abort();

    let totals = scheduler.history().totals();
    info!(
        rounds = totals.rounds,
        wagered = totals.total_wagered,
        paid_out = totals.total_paid_out,
        "✅ done"
    );
    for i in 0..args.players {
        let player_id = format!("player-{}", i);
        info!(%player_id, balance = ledger.balance_of(&player_id), "final balance");
    }
    Ok(())
}

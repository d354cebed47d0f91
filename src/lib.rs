//! Croupier - Provably-Fair Round Engine
//!
//! Derives cryptographically verifiable game outcomes from committed seed
//! pairs and runs a continuously advancing, multi-participant crash round.
//! Dice and plinko resolve statelessly per bet; the crash round is a single
//! shared state machine driven by a cancelable ticker.
//!
//! Storage, transport, authentication and payment rails live outside this
//! crate; the engine talks to them through the [`ledger::BalanceLedger`]
//! trait and the [`events::EventBus`] lifecycle channel.

pub mod config;
pub mod events;
pub mod fairness;
pub mod games;
pub mod history;
pub mod ledger;
pub mod scheduler;

pub use config::EngineConfig;
pub use events::{EventBus, RoundEvent};
pub use fairness::{RevealedSeed, SeedPair, VerificationReport, VerifiedOutcome};
pub use games::crash::{BetError, CashOut, CrashRound, RoundPhase, Settlement};
pub use games::dice::DiceResolver;
pub use games::plinko::PlinkoResolver;
pub use games::types::{GameOutcome, GameType};
pub use history::{HistoryEntry, RoundHistory};
pub use ledger::{BalanceLedger, LedgerError, MemoryLedger};
pub use scheduler::RoundScheduler;

//! Balance-service collaborator interface.
//!
//! The engine finalizes settlement decisions in memory first; debits and
//! credits are issued afterwards and may be retried by the collaborator
//! without affecting the already-finalized outcome.

use crate::games::crash::Settlement;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient funds for player {player_id}: have {available}, need {required}")]
    InsufficientFunds {
        player_id: String,
        available: f64,
        required: f64,
    },

    #[error("Invalid amount {0}")]
    InvalidAmount(f64),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// External balance service. Implementations own persistence and retries.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    async fn debit(&self, player_id: &str, amount: f64, currency: &str) -> Result<(), LedgerError>;

    async fn credit(&self, player_id: &str, amount: f64, currency: &str) -> Result<(), LedgerError>;

    /// Receive the per-player settlement batch of a terminated round for
    /// reconciliation. Payouts were already credited at cash-out time, so
    /// the default implementation only records the hand-off.
    async fn settle_round(&self, round_id: &str, batch: &[Settlement]) -> Result<(), LedgerError> {
        debug!(round_id, settlements = batch.len(), "settlement batch handed off");
        Ok(())
    }
}

/// In-memory ledger for tests and the demo binary.
pub struct MemoryLedger {
    balances: RwLock<HashMap<String, f64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
        }
    }

    pub fn deposit(&self, player_id: &str, amount: f64) {
        let mut balances = self.balances.write().unwrap_or_else(|e| e.into_inner());
        *balances.entry(player_id.to_string()).or_insert(0.0) += amount;
    }

    pub fn balance_of(&self, player_id: &str) -> f64 {
        let balances = self.balances.read().unwrap_or_else(|e| e.into_inner());
        balances.get(player_id).copied().unwrap_or(0.0)
    }

    fn check_amount(amount: f64) -> Result<(), LedgerError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceLedger for MemoryLedger {
    async fn debit(&self, player_id: &str, amount: f64, _currency: &str) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;
        let mut balances = self.balances.write().unwrap_or_else(|e| e.into_inner());
        let balance = balances.entry(player_id.to_string()).or_insert(0.0);
        if *balance < amount {
            return Err(LedgerError::InsufficientFunds {
                player_id: player_id.to_string(),
                available: *balance,
                required: amount,
            });
        }
        *balance -= amount;
        Ok(())
    }

    async fn credit(&self, player_id: &str, amount: f64, _currency: &str) -> Result<(), LedgerError> {
        Self::check_amount(amount)?;
        let mut balances = self.balances.write().unwrap_or_else(|e| e.into_inner());
        *balances.entry(player_id.to_string()).or_insert(0.0) += amount;
        Ok(())
    }
}

//! Round history: a bounded, append-only ring of settled-round summaries.

use crate::fairness::RevealedSeed;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Summary of a terminated round. Seeds are revealed here, enabling external
/// verification of the crash point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub round_id: String,
    pub crash_point: f64,
    pub seeds: RevealedSeed,
    pub participants: usize,
    pub total_stake: f64,
    pub total_payout: f64,
    pub settled_at: DateTime<Utc>,
}

/// Lifetime counters across all recorded rounds (survives ring eviction).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HistoryTotals {
    pub rounds: u64,
    pub total_wagered: f64,
    pub total_paid_out: f64,
}

struct HistoryInner {
    entries: VecDeque<HistoryEntry>,
    totals: HistoryTotals,
}

/// Fixed-capacity round history, oldest entries evicted first.
pub struct RoundHistory {
    inner: RwLock<HistoryInner>,
    capacity: usize,
}

impl RoundHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(HistoryInner {
                entries: VecDeque::with_capacity(capacity.max(1)),
                totals: HistoryTotals::default(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Append a settled round, evicting the oldest entry at capacity.
    pub fn record(&self, entry: HistoryEntry) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.totals.rounds += 1;
        inner.totals.total_wagered += entry.total_stake;
        inner.totals.total_paid_out += entry.total_payout;
        inner.entries.push_back(entry);
    }

    /// The most recent `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.entries.iter().rev().take(n).cloned().collect()
    }

    /// The most recently settled round, if any.
    pub fn last(&self) -> Option<HistoryEntry> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.entries.back().cloned()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn totals(&self) -> HistoryTotals {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.totals
    }
}

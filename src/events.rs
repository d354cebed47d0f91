//! Typed publish-subscribe channel for round lifecycle events.
//!
//! The engine pushes events onto a broadcast channel; collaborators subscribe
//! without the engine holding references to them. Delivery is ordered and
//! at-least-once for subscribers that keep up; a lagged subscriber observes a
//! `Lagged` error from its receiver rather than blocking the engine.

use crate::history::HistoryEntry;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Round lifecycle events.
///
/// `RoundStarted` carries only the commitment; the server seed appears first
/// in `RoundCrashed`, after the round has terminated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    RoundStarted {
        round_id: String,
        server_seed_hash: String,
        client_seed: String,
    },
    MultiplierUpdated {
        round_id: String,
        multiplier: f64,
    },
    BetPlaced {
        round_id: String,
        player_id: String,
        stake: f64,
    },
    PlayerCashedOut {
        round_id: String,
        player_id: String,
        multiplier: f64,
        payout: f64,
    },
    RoundCrashed {
        round_id: String,
        crash_point: f64,
        server_seed: String,
    },
    RoundSettled {
        round_id: String,
        summary: HistoryEntry,
    },
}

/// Cloneable handle to the event channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RoundEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers. Never blocks; with no
    /// subscribers the event is dropped.
    pub fn publish(&self, event: RoundEvent) {
        if self.tx.send(event).is_err() {
            debug!("no event subscribers; event dropped");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

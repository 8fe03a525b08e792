//! Background monitor bridge.
//!
//! Entry points the OS calls while the app may not be running. Each callback
//! builds a fresh [`Ledger`] from the durable store, acts on it and drops it;
//! nothing is shared with the foreground process except the store record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::schedule::{ActivityName, EventName};
use crate::budget::{Ledger, LimitId, TickReport};
use crate::clock::Clock;
use crate::shield::ShieldController;
use crate::storage::KvStore;

/// Result of a threshold callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ThresholdOutcome {
    /// The limit had budget left and is now locked.
    Locked { limit_id: LimitId },
    /// The limit was already at zero; the shield was re-applied.
    AlreadyLocked { limit_id: LimitId },
    /// No limit matches the activity name.
    UnknownLimit,
}

pub struct MonitorBridge {
    store: Arc<dyn KvStore>,
    shield: ShieldController,
    clock: Arc<dyn Clock>,
}

impl MonitorBridge {
    pub fn new(store: Arc<dyn KvStore>, shield: ShieldController, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            shield,
            clock,
        }
    }

    fn open_ledger(&self) -> Ledger {
        Ledger::open(self.store.clone(), self.shield.clone(), self.clock.clone())
    }

    /// The OS measured the full budget for `activity`. Its measurement wins
    /// over local bookkeeping: the limit is forced to zero and shielded.
    pub fn on_threshold_reached(&self, event: &EventName, activity: &ActivityName) -> ThresholdOutcome {
        let Some(id) = activity.limit_id() else {
            warn!(event = %event, activity = %activity, "threshold for non-limit activity");
            return ThresholdOutcome::UnknownLimit;
        };

        let mut ledger = self.open_ledger();
        let was_locked = ledger.get(id).map(|l| l.is_locked());
        match ledger.expire_limit(id) {
            Ok(_) => {
                info!(event = %event, limit_id = %id, "threshold reached; limit locked");
                if was_locked == Some(true) {
                    ThresholdOutcome::AlreadyLocked { limit_id: id }
                } else {
                    ThresholdOutcome::Locked { limit_id: id }
                }
            }
            Err(e) => {
                warn!(event = %event, activity = %activity, error = %e, "no matching limit for threshold");
                ThresholdOutcome::UnknownLimit
            }
        }
    }

    pub fn on_interval_start(&self, activity: &ActivityName) -> TickReport {
        info!(activity = %activity, "interval started");
        self.resync()
    }

    pub fn on_interval_end(&self, activity: &ActivityName) -> TickReport {
        info!(activity = %activity, "interval ended");
        self.resync()
    }

    pub fn on_interval_will_start_warning(&self, activity: &ActivityName) {
        info!(activity = %activity, "interval will start");
    }

    pub fn on_interval_will_end_warning(&self, activity: &ActivityName) {
        info!(activity = %activity, "interval will end");
    }

    pub fn on_event_will_reach_threshold_warning(&self, event: &EventName, activity: &ActivityName) {
        info!(event = %event, activity = %activity, "event will reach threshold");
    }

    /// Reload, run a full pass and re-apply the shield.
    pub fn resync(&self) -> TickReport {
        let mut ledger = self.open_ledger();
        let report = ledger.tick_now();
        ledger.refresh_shield();
        report
    }
}

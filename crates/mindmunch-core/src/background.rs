//! Periodic background refresh.
//!
//! The OS wakes the app every so often (at least `refresh_interval` apart).
//! Each wake schedules the next one first, then brings the ledger and shield
//! up to date.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::budget::{Ledger, TickReport};
use crate::clock::Clock;
use crate::error::MonitorError;
use crate::shield::ShieldController;
use crate::storage::KvStore;

/// Key under which [`StoreWakeScheduler`] records the next requested wake.
pub const NEXT_WAKE_KEY: &str = "next_background_wake";

/// OS background task scheduler.
pub trait WakeScheduler: Send + Sync {
    /// Ask to be woken no earlier than `earliest`.
    fn schedule_wake(&self, earliest: DateTime<Utc>) -> Result<(), MonitorError>;
}

/// Records wake requests in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryWakeScheduler {
    requests: Arc<Mutex<Vec<DateTime<Utc>>>>,
}

impl MemoryWakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<DateTime<Utc>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl WakeScheduler for MemoryWakeScheduler {
    fn schedule_wake(&self, earliest: DateTime<Utc>) -> Result<(), MonitorError> {
        self.requests
            .lock()
            .map_err(|_| MonitorError::WakeFailed("lock poisoned".into()))?
            .push(earliest);
        Ok(())
    }
}

/// Records the next wake in the durable store, for hosts that drive wakes
/// externally (cron, systemd timers).
#[derive(Clone)]
pub struct StoreWakeScheduler {
    store: Arc<dyn KvStore>,
}

impl StoreWakeScheduler {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn next_wake(store: &dyn KvStore) -> Option<DateTime<Utc>> {
        let bytes = store.get(NEXT_WAKE_KEY).ok()??;
        serde_json::from_slice(&bytes).ok()
    }
}

impl WakeScheduler for StoreWakeScheduler {
    fn schedule_wake(&self, earliest: DateTime<Utc>) -> Result<(), MonitorError> {
        let bytes =
            serde_json::to_vec(&earliest).map_err(|e| MonitorError::WakeFailed(e.to_string()))?;
        self.store
            .set(NEXT_WAKE_KEY, &bytes)
            .map_err(|e| MonitorError::WakeFailed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeOutcome {
    pub success: bool,
    pub next_wake: Option<DateTime<Utc>>,
    pub report: Option<TickReport>,
}

pub struct BackgroundRefresh {
    store: Arc<dyn KvStore>,
    shield: ShieldController,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn WakeScheduler>,
    interval: Duration,
}

impl BackgroundRefresh {
    pub fn new(
        store: Arc<dyn KvStore>,
        shield: ShieldController,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn WakeScheduler>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            shield,
            clock,
            scheduler,
            interval,
        }
    }

    /// Request the next wake at now + interval.
    pub fn schedule_next(&self) -> Result<DateTime<Utc>, MonitorError> {
        let earliest = self.clock.now() + self.interval;
        self.scheduler.schedule_wake(earliest)?;
        Ok(earliest)
    }

    /// Handle one wake. A wake cancelled before it starts reports failure
    /// and leaves the ledger alone.
    pub fn handle_wake(&self, cancel: &CancellationToken) -> WakeOutcome {
        let next_wake = match self.schedule_next() {
            Ok(at) => Some(at),
            Err(e) => {
                warn!(error = %e, "failed to schedule next background wake");
                None
            }
        };

        if cancel.is_cancelled() {
            info!("background wake cancelled");
            return WakeOutcome {
                success: false,
                next_wake,
                report: None,
            };
        }

        let mut ledger = Ledger::open(self.store.clone(), self.shield.clone(), self.clock.clone());
        let report = ledger.tick_now();
        ledger.refresh_shield();
        info!(
            decremented = report.decremented,
            newly_locked = report.newly_locked.len(),
            "background refresh done"
        );
        WakeOutcome {
            success: true,
            next_wake,
            report: Some(report),
        }
    }
}

//! Foreground decrement driver.
//!
//! Runs one ledger pass per period while the host is in the foreground. The
//! period only controls how fresh the ledger is; correctness comes from the
//! delta-based pass, so skipped or late ticks lose nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ledger::Ledger;

/// Default pass period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct TickDriver {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TickDriver {
    /// Start ticking `ledger` every `period`. The first pass runs
    /// immediately, which catches up on any time spent suspended.
    pub fn spawn(ledger: Arc<Mutex<Ledger>>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_ms = period.as_millis() as u64, "tick driver started");

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => {
                        info!("tick driver stopping");
                        break;
                    }

                    _ = tick.tick() => {
                        let report = ledger.lock().await.tick_now();
                        if report.lock_state_changed() {
                            debug!(newly_locked = report.newly_locked.len(), "pass locked limits");
                        }
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    /// Token that stops the driver when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop ticking and wait for the task to exit. A pass already in
    /// progress completes first.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            debug!(error = %e, "tick driver task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::{Event, EventRecorder};
    use crate::selection::Selection;
    use crate::shield::{MemoryRestriction, ShieldController};
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn ticks(recorder: &EventRecorder) -> usize {
        recorder
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Ticked { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_every_period_until_stopped() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 31, 9, 0, 0).unwrap());
        let mut ledger = Ledger::open(
            Arc::new(MemoryStore::new()),
            ShieldController::new(Arc::new(MemoryRestriction::new())),
            Arc::new(clock.clone()),
        );
        ledger
            .add_limit(Selection::new().with_application("app.a"), 0, 5)
            .unwrap();
        let recorder = EventRecorder::new();
        ledger.subscribe(Arc::new(recorder.clone()));
        let ledger = Arc::new(Mutex::new(ledger));

        let driver = TickDriver::spawn(ledger.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert!(driver.is_running());
        let seen = ticks(&recorder);
        assert!(seen >= 3, "expected at least 3 passes, saw {seen}");

        driver.stop().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks(&recorder), seen);
    }
}

use std::sync::Arc;

use tracing::{debug, warn};

use super::schedule::{ActivityName, ActivitySchedule, ActivityScheduler, EventName, ThresholdEvent};
use crate::budget::{Limit, LimitId};
use crate::error::{ConfigError, MonitorError};
use crate::storage::Config;

/// Registers one daily activity per limit with the OS monitor, so the
/// background bridge is woken when a budget runs out while the app is closed.
pub struct MonitorRegistrar {
    scheduler: Arc<dyn ActivityScheduler>,
    schedule: ActivitySchedule,
    enabled: bool,
}

impl MonitorRegistrar {
    pub fn new(scheduler: Arc<dyn ActivityScheduler>, schedule: ActivitySchedule) -> Self {
        Self {
            scheduler,
            schedule,
            enabled: true,
        }
    }

    pub fn from_config(
        scheduler: Arc<dyn ActivityScheduler>,
        config: &Config,
    ) -> Result<Self, ConfigError> {
        let (start, end) = config.monitor_window()?;
        Ok(Self {
            scheduler,
            schedule: ActivitySchedule::daily(start, end),
            enabled: config.monitor.enabled,
        })
    }

    pub fn schedule(&self) -> &ActivitySchedule {
        &self.schedule
    }

    pub fn register(&self, limit: &Limit) -> Result<(), MonitorError> {
        if !self.enabled {
            return Ok(());
        }
        let activity = ActivityName::from(limit.id());
        let event = ThresholdEvent {
            name: EventName::threshold(limit.id()),
            selection: limit.selection().clone(),
            threshold_secs: limit.configured().as_secs(),
        };
        self.scheduler
            .start_monitoring(&activity, &self.schedule, std::slice::from_ref(&event))?;
        debug!(activity = %activity, threshold_secs = event.threshold_secs, "limit registered");
        Ok(())
    }

    pub fn unregister(&self, id: LimitId) -> Result<(), MonitorError> {
        if !self.enabled {
            return Ok(());
        }
        self.scheduler.stop_monitoring(&[ActivityName::from(id)])
    }

    /// Re-register every limit. Returns how many registrations failed.
    pub fn register_all(&self, limits: &[Limit]) -> usize {
        limits
            .iter()
            .filter(|limit| match self.register(limit) {
                Ok(()) => false,
                Err(e) => {
                    warn!(limit_id = %limit.id(), error = %e, "failed to register limit");
                    true
                }
            })
            .count()
    }
}

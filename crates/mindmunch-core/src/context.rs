//! Application context.
//!
//! Built once at startup and passed by reference. Holds the collaborators
//! every component is wired from, so no component reaches for globals.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::background::{BackgroundRefresh, StoreWakeScheduler, WakeScheduler};
use crate::budget::{Ledger, Limit, LimitId};
use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigError, CoreError};
use crate::monitor::{ActivityScheduler, MonitorBridge, MonitorRegistrar, StoreScheduler};
use crate::quiz::{ExtensionGate, StudySetLibrary};
use crate::selection::Selection;
use crate::shield::{
    handle_shield_action, Notification, Notifier, RestrictionControl, ShieldAction,
    ShieldActionResponse, ShieldController, ShieldedTarget, StoreRestriction,
};
use crate::storage::{Config, KvStore, SqliteStore};

/// Notifier that only logs. Used where no notification service exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> Result<(), String> {
        info!(
            title = %notification.title,
            body = %notification.body,
            deep_link = notification.deep_link.as_deref().unwrap_or(""),
            delay_secs = notification.delay_secs,
            "notification"
        );
        Ok(())
    }
}

pub struct AppContext {
    config: Config,
    store: Arc<dyn KvStore>,
    restriction: Arc<dyn RestrictionControl>,
    scheduler: Arc<dyn ActivityScheduler>,
    wakes: Arc<dyn WakeScheduler>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Context over `store` with store-backed collaborators and the system
    /// clock.
    pub fn new(config: Config, store: Arc<dyn KvStore>) -> Self {
        Self {
            config,
            restriction: Arc::new(StoreRestriction::new(store.clone())),
            scheduler: Arc::new(StoreScheduler::new(store.clone())),
            wakes: Arc::new(StoreWakeScheduler::new(store.clone())),
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
            store,
        }
    }

    /// Context over the SQLite database in the data directory.
    pub fn open(config: Config) -> Result<Self, CoreError> {
        let store = SqliteStore::open()?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn with_restriction(mut self, restriction: Arc<dyn RestrictionControl>) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn ActivityScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_wake_scheduler(mut self, wakes: Arc<dyn WakeScheduler>) -> Self {
        self.wakes = wakes;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.engine.tick_interval_ms)
    }

    pub fn shield_controller(&self) -> ShieldController {
        ShieldController::new(self.restriction.clone())
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::open(self.store.clone(), self.shield_controller(), self.clock.clone())
    }

    pub fn registrar(&self) -> Result<MonitorRegistrar, ConfigError> {
        MonitorRegistrar::from_config(self.scheduler.clone(), &self.config)
    }

    pub fn bridge(&self) -> MonitorBridge {
        MonitorBridge::new(self.store.clone(), self.shield_controller(), self.clock.clone())
    }

    pub fn background(&self) -> BackgroundRefresh {
        BackgroundRefresh::new(
            self.store.clone(),
            self.shield_controller(),
            self.clock.clone(),
            self.wakes.clone(),
            chrono::Duration::minutes(i64::from(self.config.background.refresh_interval_minutes)),
        )
    }

    pub fn library(&self) -> StudySetLibrary {
        StudySetLibrary::new(self.store.clone(), self.config.quiz.max_study_sets)
    }

    pub fn gate(&self) -> ExtensionGate {
        ExtensionGate::new(Arc::new(self.library()), self.config.quiz_policy())
    }

    /// Add a limit and register it with the activity monitor. Monitoring is
    /// best-effort: a registration failure is logged and the limit kept.
    pub fn add_limit(
        &self,
        ledger: &mut Ledger,
        selection: Selection,
        hours: u32,
        minutes: u32,
    ) -> Result<Limit, CoreError> {
        let limit = ledger.add_limit(selection, hours, minutes)?;
        match self.registrar() {
            Ok(registrar) => {
                if let Err(e) = registrar.register(&limit) {
                    warn!(limit_id = %limit.id(), error = %e, "failed to register limit with monitor");
                }
            }
            Err(e) => warn!(error = %e, "monitor window misconfigured; limit not registered"),
        }
        Ok(limit)
    }

    /// Delete a limit and stop monitoring it.
    pub fn delete_limit(&self, ledger: &mut Ledger, id: LimitId) -> Result<Limit, CoreError> {
        let removed = ledger.delete_limit(id)?;
        match self.registrar() {
            Ok(registrar) => {
                if let Err(e) = registrar.unregister(id) {
                    warn!(limit_id = %id, error = %e, "failed to unregister limit");
                }
            }
            Err(e) => warn!(error = %e, "monitor window misconfigured; limit not unregistered"),
        }
        Ok(removed)
    }

    pub fn handle_shield_action(
        &self,
        action: ShieldAction,
        target: ShieldedTarget,
    ) -> ShieldActionResponse {
        handle_shield_action(action, target, self.notifier.as_ref())
    }
}

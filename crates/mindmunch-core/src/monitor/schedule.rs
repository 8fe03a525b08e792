use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::budget::LimitId;
use crate::error::MonitorError;
use crate::selection::Selection;
use crate::storage::KvStore;

/// Key under which [`StoreScheduler`] records registered activities.
pub const MONITORED_ACTIVITIES_KEY: &str = "monitored_activities";

/// Name of a monitored activity. For limits this is the limit id string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityName(String);

impl ActivityName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The limit this activity belongs to, if the name is a limit id.
    pub fn limit_id(&self) -> Option<LimitId> {
        self.0.parse().ok()
    }
}

impl From<LimitId> for ActivityName {
    fn from(id: LimitId) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ActivityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventName(String);

impl EventName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Threshold event registered for a limit: `"<id>.threshold"`.
    pub fn threshold(id: LimitId) -> Self {
        Self(format!("{id}.threshold"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Daily monitoring window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySchedule {
    pub interval_start: NaiveTime,
    pub interval_end: NaiveTime,
    pub repeats: bool,
}

impl ActivitySchedule {
    pub fn daily(interval_start: NaiveTime, interval_end: NaiveTime) -> Self {
        Self {
            interval_start,
            interval_end,
            repeats: true,
        }
    }
}

/// Fires once the selection has been used for `threshold_secs` within the
/// current interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdEvent {
    pub name: EventName,
    pub selection: Selection,
    pub threshold_secs: u64,
}

/// One registered activity as recorded by the in-process schedulers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredActivity {
    pub activity: ActivityName,
    pub schedule: ActivitySchedule,
    pub events: Vec<ThresholdEvent>,
}

/// OS activity monitor scheduler.
pub trait ActivityScheduler: Send + Sync {
    /// Register (or re-register) an activity with its threshold events.
    fn start_monitoring(
        &self,
        activity: &ActivityName,
        schedule: &ActivitySchedule,
        events: &[ThresholdEvent],
    ) -> Result<(), MonitorError>;

    /// Unregister activities. Unknown names are ignored.
    fn stop_monitoring(&self, activities: &[ActivityName]) -> Result<(), MonitorError>;
}

type ActivityMap = BTreeMap<ActivityName, MonitoredActivity>;

fn record(map: &mut ActivityMap, activity: &ActivityName, schedule: &ActivitySchedule, events: &[ThresholdEvent]) {
    map.insert(
        activity.clone(),
        MonitoredActivity {
            activity: activity.clone(),
            schedule: *schedule,
            events: events.to_vec(),
        },
    );
}

/// In-memory scheduler for tests and embedded hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryScheduler {
    activities: Arc<Mutex<ActivityMap>>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activities(&self) -> Vec<MonitoredActivity> {
        self.activities
            .lock()
            .map(|a| a.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_monitoring(&self, activity: &ActivityName) -> bool {
        self.activities
            .lock()
            .map(|a| a.contains_key(activity))
            .unwrap_or(false)
    }
}

impl ActivityScheduler for MemoryScheduler {
    fn start_monitoring(
        &self,
        activity: &ActivityName,
        schedule: &ActivitySchedule,
        events: &[ThresholdEvent],
    ) -> Result<(), MonitorError> {
        let mut map = self.activities.lock().map_err(|_| MonitorError::StartFailed {
            activity: activity.to_string(),
            message: "lock poisoned".into(),
        })?;
        record(&mut map, activity, schedule, events);
        Ok(())
    }

    fn stop_monitoring(&self, activities: &[ActivityName]) -> Result<(), MonitorError> {
        let mut map = self
            .activities
            .lock()
            .map_err(|_| MonitorError::StopFailed("lock poisoned".into()))?;
        for activity in activities {
            map.remove(activity);
        }
        Ok(())
    }
}

/// Scheduler that records registrations in the durable store, for hosts
/// without an OS activity monitor.
#[derive(Clone)]
pub struct StoreScheduler {
    store: Arc<dyn KvStore>,
}

impl StoreScheduler {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Activities currently registered. Unreadable records read as empty.
    pub fn load(store: &dyn KvStore) -> Vec<MonitoredActivity> {
        read_map(store)
            .map(|m| m.into_values().collect())
            .unwrap_or_default()
    }

    fn write(&self, map: &ActivityMap) -> Result<(), String> {
        let bytes = serde_json::to_vec(map).map_err(|e| e.to_string())?;
        self.store
            .set(MONITORED_ACTIVITIES_KEY, &bytes)
            .map_err(|e| e.to_string())
    }
}

fn read_map(store: &dyn KvStore) -> Result<ActivityMap, String> {
    match store.get(MONITORED_ACTIVITIES_KEY).map_err(|e| e.to_string())? {
        None => Ok(ActivityMap::new()),
        Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| e.to_string()),
    }
}

impl ActivityScheduler for StoreScheduler {
    fn start_monitoring(
        &self,
        activity: &ActivityName,
        schedule: &ActivitySchedule,
        events: &[ThresholdEvent],
    ) -> Result<(), MonitorError> {
        let failed = |message: String| MonitorError::StartFailed {
            activity: activity.to_string(),
            message,
        };
        let mut map = read_map(self.store.as_ref()).map_err(failed)?;
        record(&mut map, activity, schedule, events);
        self.write(&map).map_err(failed)?;
        info!(activity = %activity, events = events.len(), "monitoring started");
        Ok(())
    }

    fn stop_monitoring(&self, activities: &[ActivityName]) -> Result<(), MonitorError> {
        let mut map = read_map(self.store.as_ref()).map_err(MonitorError::StopFailed)?;
        for activity in activities {
            map.remove(activity);
        }
        self.write(&map).map_err(MonitorError::StopFailed)?;
        info!(count = activities.len(), "monitoring stopped");
        Ok(())
    }
}

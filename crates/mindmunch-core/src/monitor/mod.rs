//! OS activity monitoring.
//!
//! [`MonitorRegistrar`] tells the OS which usage thresholds to watch;
//! [`MonitorBridge`] handles the callbacks when they fire.

mod bridge;
mod registrar;
mod schedule;

pub use bridge::{MonitorBridge, ThresholdOutcome};
pub use registrar::MonitorRegistrar;
pub use schedule::{
    ActivityName, ActivitySchedule, ActivityScheduler, EventName, MemoryScheduler,
    MonitoredActivity, StoreScheduler, ThresholdEvent, MONITORED_ACTIVITIES_KEY,
};

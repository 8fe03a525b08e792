use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::LimitId;

/// Every ledger mutation produces Events.
/// Views subscribe to them instead of observing ledger fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    LimitAdded {
        limit_id: LimitId,
        hours: u32,
        minutes: u32,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    LimitDeleted {
        limit_id: LimitId,
        at: DateTime<Utc>,
    },
    LimitExtended {
        limit_id: LimitId,
        added_minutes: u32,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Budget reached zero; the selection is now shielded.
    LimitLocked {
        limit_id: LimitId,
        at: DateTime<Utc>,
    },
    Ticked {
        decremented: usize,
        newly_locked: usize,
        at: DateTime<Utc>,
    },
    ShieldRefreshed {
        applications: usize,
        categories: usize,
        web_domains: usize,
        at: DateTime<Utc>,
    },
    LedgerReloaded {
        limits: usize,
        at: DateTime<Utc>,
    },
}

/// Receives ledger events after the mutation has been persisted.
pub trait LedgerObserver: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> LedgerObserver for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Observer that keeps every event it sees.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl LedgerObserver for EventRecorder {
    fn on_event(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

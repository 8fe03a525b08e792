//! Budget ledger.
//!
//! The ledger owns the list of limits and is the only writer of
//! `remaining_ms` and `last_observed_at`. The whole list lives in one durable
//! record; every mutating operation runs read-record → mutate → write-record,
//! then notifies observers. The background monitor works on its own `Ledger`
//! built from the same store, so the record is the only shared state.
//!
//! ## Persistence failures
//!
//! - Missing or undecodable record at `open`: start empty.
//! - Unreadable record before a mutation: keep the in-memory list.
//! - Failed write: logged, in-memory list stays authoritative, the next
//!   mutation writes the whole record again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::decrement::{decrement, decrement_all, TickReport};
use super::limit::{Limit, LimitDuration, LimitId};
use crate::clock::Clock;
use crate::error::{CoreError, LedgerError};
use crate::events::{Event, LedgerObserver};
use crate::quiz::ExtensionGrant;
use crate::selection::Selection;
use crate::shield::{ShieldController, ShieldRefresh, ShieldState};
use crate::storage::KvStore;

/// Durable key of the ledger record.
pub const LIMITS_KEY: &str = "daily_limits";

const RECORD_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct LedgerRecord {
    version: u32,
    limits: Vec<Limit>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Versioned(LedgerRecord),
    /// Records written before the envelope existed.
    Bare(Vec<Limit>),
}

pub struct Ledger {
    store: Arc<dyn KvStore>,
    shield: ShieldController,
    clock: Arc<dyn Clock>,
    limits: Vec<Limit>,
    shield_state: ShieldState,
    /// Set when the last apply failed; the next tick re-applies.
    shield_pending: bool,
    observers: Vec<Arc<dyn LedgerObserver>>,
}

impl Ledger {
    /// Load the ledger from `store`. Never fails: a missing or corrupt record
    /// yields an empty ledger.
    ///
    /// The shield is not touched here; call [`Ledger::refresh_shield`] to
    /// re-apply it.
    pub fn open(
        store: Arc<dyn KvStore>,
        shield: ShieldController,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limits = match read_record(store.as_ref()) {
            Ok(Some(limits)) => {
                debug!(count = limits.len(), "loaded limits");
                limits
            }
            Ok(None) => {
                debug!("no limits record yet");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "failed to load limits record; starting empty");
                Vec::new()
            }
        };
        let shield_state = ShieldState::from_limits(&limits);
        Self {
            store,
            shield,
            clock,
            limits,
            shield_state,
            shield_pending: false,
            observers: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn limits(&self) -> &[Limit] {
        &self.limits
    }

    pub fn get(&self, id: LimitId) -> Option<&Limit> {
        self.limits.iter().find(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Shield state as of the last refresh.
    pub fn shield_state(&self) -> &ShieldState {
        &self.shield_state
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn LedgerObserver>) {
        self.observers.push(observer);
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a limit and run an immediate decrement + shield pass, so a
    /// zero-length budget locks at once.
    pub fn add_limit(
        &mut self,
        selection: Selection,
        hours: u32,
        minutes: u32,
    ) -> Result<Limit, LedgerError> {
        let configured = LimitDuration::new(hours, minutes);
        if !configured.is_valid() {
            return Err(LedgerError::InvalidDuration { hours, minutes });
        }

        self.sync_from_store();
        let now = self.clock.now();
        let limit = Limit::new(selection, configured, now);
        let created = limit.clone();
        self.limits.push(limit);

        let mut events = vec![Event::LimitAdded {
            limit_id: created.id,
            hours,
            minutes,
            remaining_secs: created.remaining_secs(),
            at: now,
        }];
        if created.is_locked() {
            events.push(Event::LimitLocked {
                limit_id: created.id,
                at: now,
            });
        }
        let report = decrement_all(&mut self.limits, now);
        events.extend(lock_events(&report));
        self.apply_shield(now, &mut events);
        self.commit(events);

        info!(limit_id = %created.id, duration = %configured, selection = %created.selection, "limit added");
        Ok(created)
    }

    /// Remove a limit and re-derive the shield from what remains.
    ///
    /// Returns `NotFound` (and leaves the ledger untouched) for an unknown id.
    pub fn delete_limit(&mut self, id: LimitId) -> Result<Limit, LedgerError> {
        self.sync_from_store();
        let Some(pos) = self.limits.iter().position(|l| l.id == id) else {
            debug!(limit_id = %id, "delete for unknown limit");
            return Err(LedgerError::NotFound(id));
        };
        let now = self.clock.now();
        let removed = self.limits.remove(pos);

        let mut events = vec![Event::LimitDeleted { limit_id: id, at: now }];
        self.apply_shield(now, &mut events);
        self.commit(events);

        info!(limit_id = %id, "limit deleted");
        Ok(removed)
    }

    /// Add the granted minutes to a limit and lift its shield.
    ///
    /// Only a completed quiz session produces an [`ExtensionGrant`]. A grant
    /// for a limit deleted in the meantime is reported as `NotFound`.
    pub fn extend_limit(&mut self, grant: ExtensionGrant) -> Result<Limit, LedgerError> {
        let id = grant.limit_id();
        let minutes = grant.minutes();

        self.sync_from_store();
        let now = self.clock.now();
        let Some(limit) = self.limits.iter_mut().find(|l| l.id == id) else {
            debug!(limit_id = %id, "extension for unknown limit");
            return Err(LedgerError::NotFound(id));
        };

        // Account for usage up to now before adding time.
        decrement(limit, now);
        limit.remaining_ms = limit
            .remaining_ms
            .saturating_add(u64::from(minutes).saturating_mul(60_000));
        if now > limit.last_observed_at {
            limit.last_observed_at = now;
        }
        limit.extensions = limit.extensions.saturating_add(1);
        let extended = limit.clone();

        let mut events = vec![Event::LimitExtended {
            limit_id: id,
            added_minutes: minutes,
            remaining_secs: extended.remaining_secs(),
            at: now,
        }];
        self.apply_shield(now, &mut events);
        self.commit(events);

        info!(limit_id = %id, added_minutes = minutes, remaining_secs = extended.remaining_secs(), "limit extended");
        Ok(extended)
    }

    /// One decrement pass at `now`.
    ///
    /// Persists once for the whole batch. The shield is refreshed when a limit
    /// locked during this pass, when the record reloaded from the store
    /// derives a different shield than the one last applied (another process
    /// changed the ledger), or when the previous apply failed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        self.sync_from_store();
        let report = decrement_all(&mut self.limits, now);

        let mut events = lock_events(&report);
        events.push(Event::Ticked {
            decremented: report.decremented,
            newly_locked: report.newly_locked.len(),
            at: now,
        });
        if report.lock_state_changed()
            || self.shield_pending
            || ShieldState::from_limits(&self.limits) != self.shield_state
        {
            self.apply_shield(now, &mut events);
        }
        self.commit(events);

        if report.lock_state_changed() {
            info!(locked = report.newly_locked.len(), "limits exhausted");
        }
        report
    }

    /// Tick at the clock's current time.
    pub fn tick_now(&mut self) -> TickReport {
        let now = self.clock.now();
        self.tick(now)
    }

    /// Force a limit to zero. Used when the OS reports the usage threshold
    /// as reached, which is authoritative regardless of local bookkeeping.
    pub fn expire_limit(&mut self, id: LimitId) -> Result<Limit, LedgerError> {
        self.sync_from_store();
        let now = self.clock.now();
        let Some(limit) = self.limits.iter_mut().find(|l| l.id == id) else {
            return Err(LedgerError::NotFound(id));
        };

        let was_locked = limit.is_locked();
        limit.remaining_ms = 0;
        if now > limit.last_observed_at {
            limit.last_observed_at = now;
        }
        let expired = limit.clone();

        let mut events = Vec::new();
        if !was_locked {
            events.push(Event::LimitLocked { limit_id: id, at: now });
        }
        self.apply_shield(now, &mut events);
        self.commit(events);

        info!(limit_id = %id, was_locked, "limit expired by threshold");
        Ok(expired)
    }

    /// Re-read the durable record. Keeps the in-memory list if the record is
    /// missing or unreadable.
    pub fn reload(&mut self) {
        self.sync_from_store();
        let event = Event::LedgerReloaded {
            limits: self.limits.len(),
            at: self.clock.now(),
        };
        self.notify(&[event]);
    }

    /// Re-derive and re-apply the shield without changing any limit.
    pub fn refresh_shield(&mut self) -> ShieldState {
        let now = self.clock.now();
        let mut events = Vec::new();
        self.apply_shield(now, &mut events);
        self.notify(&events);
        self.shield_state.clone()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn sync_from_store(&mut self) {
        match read_record(self.store.as_ref()) {
            Ok(Some(limits)) => self.limits = limits,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read limits record; keeping in-memory ledger"),
        }
    }

    fn apply_shield(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        let ShieldRefresh { state, applied } = self.shield.refresh(&self.limits);
        self.shield_pending = !applied;
        events.push(Event::ShieldRefreshed {
            applications: state.applications.len(),
            categories: state.categories.len(),
            web_domains: state.web_domains.len(),
            at: now,
        });
        self.shield_state = state;
    }

    /// Exactly one whole-record write, then observer notification.
    fn commit(&mut self, events: Vec<Event>) {
        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to persist limits record");
        }
        self.notify(&events);
    }

    fn persist(&self) -> Result<(), CoreError> {
        let record = LedgerRecord {
            version: RECORD_VERSION,
            limits: self.limits.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;
        self.store.set(LIMITS_KEY, &bytes)?;
        Ok(())
    }

    fn notify(&self, events: &[Event]) {
        for event in events {
            for observer in &self.observers {
                observer.on_event(event);
            }
        }
    }
}

fn read_record(store: &dyn KvStore) -> Result<Option<Vec<Limit>>, CoreError> {
    let Some(bytes) = store.get(LIMITS_KEY)? else {
        return Ok(None);
    };
    let limits = match serde_json::from_slice::<StoredRecord>(&bytes)? {
        StoredRecord::Versioned(record) => {
            if record.version > RECORD_VERSION {
                warn!(version = record.version, "limits record is newer than this build");
            }
            record.limits
        }
        StoredRecord::Bare(limits) => limits,
    };
    Ok(Some(limits))
}

fn lock_events(report: &TickReport) -> Vec<Event> {
    report
        .newly_locked
        .iter()
        .map(|id| Event::LimitLocked {
            limit_id: *id,
            at: report.at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::EventRecorder;
    use crate::shield::{MemoryRestriction, RestrictionControl};
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        store: MemoryStore,
        restriction: MemoryRestriction,
        clock: ManualClock,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                restriction: MemoryRestriction::new(),
                clock: ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 31, 9, 0, 0).unwrap()),
            }
        }

        fn ledger(&self) -> Ledger {
            Ledger::open(
                Arc::new(self.store.clone()),
                ShieldController::new(Arc::new(self.restriction.clone())),
                Arc::new(self.clock.clone()),
            )
        }
    }

    fn app(token: &str) -> Selection {
        Selection::new().with_application(token)
    }

    #[test]
    fn zero_duration_limit_locks_immediately() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let limit = ledger.add_limit(app("AppA"), 0, 0).unwrap();

        assert_eq!(limit.remaining_ms(), 0);
        assert!(ledger.shield_state().blocks_application(&"AppA".into()));
        assert_eq!(fx.restriction.current(), Some(ledger.shield_state().clone()));
    }

    #[test]
    fn one_minute_limit_locks_after_61_seconds() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let limit = ledger.add_limit(app("AppA"), 0, 1).unwrap();
        assert!(fx.restriction.current().is_none());

        let report = ledger.tick(fx.clock.now() + Duration::seconds(61));
        assert_eq!(report.newly_locked, vec![limit.id()]);
        assert_eq!(ledger.get(limit.id()).unwrap().remaining_ms(), 0);
        assert!(ledger.shield_state().blocks_application(&"AppA".into()));
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        assert_eq!(
            ledger.add_limit(app("AppA"), 0, 60),
            Err(LedgerError::InvalidDuration { hours: 0, minutes: 60 })
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn extension_unlocks_with_fifteen_minutes() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let limit = ledger.add_limit(app("AppA"), 0, 0).unwrap();

        let extended = ledger
            .extend_limit(ExtensionGrant::for_tests(limit.id(), 15))
            .unwrap();
        assert_eq!(extended.remaining_secs(), 900);
        assert_eq!(extended.extensions(), 1);
        assert!(ledger.shield_state().is_empty());
        assert!(fx.restriction.current().is_none());
    }

    #[test]
    fn extension_charges_usage_before_adding_time() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let limit = ledger.add_limit(app("AppA"), 0, 10).unwrap();

        fx.clock.advance(Duration::minutes(4));
        let extended = ledger
            .extend_limit(ExtensionGrant::for_tests(limit.id(), 15))
            .unwrap();
        assert_eq!(extended.remaining_secs(), (6 + 15) * 60);
        assert_eq!(extended.last_observed_at(), fx.clock.now());
    }

    #[test]
    fn stale_ids_report_not_found() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        ledger.add_limit(app("AppA"), 1, 0).unwrap();
        let before = ledger.limits().to_vec();
        let ghost = LimitId::new();

        assert_eq!(ledger.delete_limit(ghost), Err(LedgerError::NotFound(ghost)));
        assert_eq!(
            ledger.extend_limit(ExtensionGrant::for_tests(ghost, 15)),
            Err(LedgerError::NotFound(ghost))
        );
        assert_eq!(ledger.limits(), before.as_slice());
    }

    #[test]
    fn deleting_the_only_locking_limit_unblocks() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let locked = ledger.add_limit(app("AppA"), 0, 0).unwrap();
        ledger.add_limit(app("AppB"), 2, 0).unwrap();
        assert!(ledger.shield_state().blocks_application(&"AppA".into()));

        ledger.delete_limit(locked.id()).unwrap();
        assert!(!ledger.shield_state().blocks_application(&"AppA".into()));
        assert!(fx.restriction.current().is_none());
    }

    #[test]
    fn mutations_persist_and_reopen() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let limit = ledger.add_limit(app("AppA"), 0, 30).unwrap();
        ledger.tick(fx.clock.now() + Duration::minutes(10));

        let reopened = fx.ledger();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(limit.id()).unwrap().remaining_secs(), 20 * 60);
    }

    #[test]
    fn corrupt_record_starts_empty() {
        let fx = Fixture::new();
        fx.store.set(LIMITS_KEY, b"{not json").unwrap();
        let ledger = fx.ledger();
        assert!(ledger.is_empty());
    }

    #[test]
    fn bare_array_record_is_accepted() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        ledger.add_limit(app("AppA"), 0, 5).unwrap();
        let bare = serde_json::to_vec(ledger.limits()).unwrap();
        fx.store.set(LIMITS_KEY, &bare).unwrap();

        assert_eq!(fx.ledger().len(), 1);
    }

    #[test]
    fn every_mutation_notifies_observers() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        let recorder = EventRecorder::new();
        ledger.subscribe(Arc::new(recorder.clone()));

        let limit = ledger.add_limit(app("AppA"), 0, 1).unwrap();
        ledger.tick(fx.clock.now() + Duration::seconds(61));
        ledger.delete_limit(limit.id()).unwrap();

        let events = recorder.events();
        assert!(matches!(events[0], Event::LimitAdded { .. }));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::LimitLocked { limit_id, .. } if *limit_id == limit.id())));
        assert!(matches!(events.last(), Some(Event::ShieldRefreshed { .. })));
        assert!(events.iter().any(|e| matches!(e, Event::LimitDeleted { .. })));
    }

    #[test]
    fn tick_without_lock_change_does_not_touch_shield() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        ledger.add_limit(app("AppA"), 1, 0).unwrap();
        let applies = fx.restriction.apply_calls();
        let clears = fx.restriction.clear_calls();

        ledger.tick(fx.clock.now() + Duration::seconds(5));
        assert_eq!(fx.restriction.apply_calls(), applies);
        assert_eq!(fx.restriction.clear_calls(), clears);
    }

    #[test]
    fn failed_shield_apply_is_retried_on_next_tick() {
        let fx = Fixture::new();
        let mut ledger = fx.ledger();
        fx.restriction.set_failing(true);
        ledger.add_limit(app("AppA"), 0, 0).unwrap();
        assert!(fx.restriction.current().is_none());

        // Still failing: the retry fails too and stays pending.
        ledger.tick(fx.clock.now() + Duration::seconds(1));
        assert!(fx.restriction.current().is_none());

        fx.restriction.set_failing(false);
        ledger.tick(fx.clock.now() + Duration::seconds(2));
        assert_eq!(fx.restriction.current(), Some(ledger.shield_state().clone()));
        assert!(ledger.shield_state().blocks_application(&"AppA".into()));

        let applies = fx.restriction.apply_calls();
        ledger.tick(fx.clock.now() + Duration::seconds(3));
        assert_eq!(fx.restriction.apply_calls(), applies);
    }

    #[test]
    fn tick_picks_up_changes_from_another_ledger() {
        let fx = Fixture::new();
        let mut foreground = fx.ledger();
        let limit = foreground.add_limit(app("AppA"), 1, 0).unwrap();

        let mut background = fx.ledger();
        background.expire_limit(limit.id()).unwrap();
        fx.restriction.clear().unwrap();

        foreground.tick(fx.clock.now());
        assert!(foreground.get(limit.id()).unwrap().is_locked());
        assert!(fx
            .restriction
            .current()
            .is_some_and(|s| s.blocks_application(&"AppA".into())));
    }
}

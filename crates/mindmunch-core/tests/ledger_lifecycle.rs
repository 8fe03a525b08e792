//! Integration tests for the limit lifecycle.
//!
//! Add → use → lock → quiz → extend → delete, against the SQLite store and
//! the in-memory restriction.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use mindmunch_core::quiz::ExtensionGrant;
use mindmunch_core::shield::MemoryRestriction;
use mindmunch_core::{
    Event, EventRecorder, ExtensionGate, Flashcard, Ledger, LedgerError, LimitId, ManualClock,
    Progress, QuizPolicy, Selection, ShieldController, SqliteStore, StudySet,
};

struct Harness {
    store: Arc<SqliteStore>,
    restriction: MemoryRestriction,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(SqliteStore::open_memory().unwrap()),
            restriction: MemoryRestriction::new(),
            clock: ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 31, 8, 0, 0).unwrap()),
        }
    }

    fn ledger(&self) -> Ledger {
        Ledger::open(
            self.store.clone(),
            ShieldController::new(Arc::new(self.restriction.clone())),
            Arc::new(self.clock.clone()),
        )
    }

    fn blocks(&self, app: &str) -> bool {
        self.restriction
            .current()
            .is_some_and(|s| s.blocks_application(&app.into()))
    }
}

fn deck() -> StudySet {
    StudySet::new(
        "elements",
        None,
        vec![
            Flashcard::new(1, "H", "Hydrogen"),
            Flashcard::new(2, "He", "Helium"),
            Flashcard::new(3, "Li", "Lithium"),
            Flashcard::new(4, "Be", "Beryllium"),
        ],
    )
}

/// Pass the quiz for `limit_id` and return the grant.
fn pass_quiz(limit_id: LimitId) -> ExtensionGrant {
    let set = deck();
    let answer = |term: &str| {
        set.flashcards
            .iter()
            .find(|c| c.term == term)
            .map(|c| c.definition.clone())
            .unwrap()
    };
    let mut gate = ExtensionGate::with_seed(Arc::new(deck()), QuizPolicy::default(), 42);
    let mut question = gate.start(limit_id).unwrap();
    loop {
        match gate.submit(&answer(&question.term)).unwrap() {
            Progress::Completed(grant) => return grant,
            Progress::Answered(_) => question = gate.next_question().unwrap(),
        }
    }
}

#[test]
fn test_zero_duration_limit_is_locked_on_add() {
    let h = Harness::new();
    let mut ledger = h.ledger();
    let limit = ledger
        .add_limit(Selection::new().with_application("AppA"), 0, 0)
        .unwrap();

    assert!(limit.is_locked());
    assert!(h.blocks("AppA"));
}

#[test]
fn test_limit_locks_after_budget_is_used() {
    let h = Harness::new();
    let mut ledger = h.ledger();
    ledger
        .add_limit(Selection::new().with_application("AppA"), 0, 1)
        .unwrap();
    assert!(!h.blocks("AppA"));

    h.clock.advance(Duration::seconds(30));
    ledger.tick_now();
    assert!(!h.blocks("AppA"));

    h.clock.advance(Duration::seconds(31));
    let report = ledger.tick_now();
    assert_eq!(report.newly_locked.len(), 1);
    assert!(h.blocks("AppA"));
}

#[test]
fn test_quiz_extension_unlocks_for_fifteen_minutes() {
    let h = Harness::new();
    let mut ledger = h.ledger();
    let limit = ledger
        .add_limit(Selection::new().with_application("AppA"), 0, 0)
        .unwrap();

    let grant = pass_quiz(limit.id());
    let extended = ledger.extend_limit(grant).unwrap();
    assert_eq!(extended.remaining_secs(), 900);
    assert!(!h.blocks("AppA"));

    h.clock.advance(Duration::minutes(15));
    ledger.tick_now();
    assert!(h.blocks("AppA"));
}

#[test]
fn test_extension_for_deleted_limit_is_not_found() {
    let h = Harness::new();
    let mut ledger = h.ledger();
    let limit = ledger
        .add_limit(Selection::new().with_application("AppA"), 0, 0)
        .unwrap();
    let grant = pass_quiz(limit.id());

    ledger.delete_limit(limit.id()).unwrap();
    assert_eq!(
        ledger.extend_limit(grant),
        Err(LedgerError::NotFound(limit.id()))
    );
}

#[test]
fn test_stale_delete_leaves_ledger_unchanged() {
    let h = Harness::new();
    let mut ledger = h.ledger();
    ledger
        .add_limit(Selection::new().with_application("AppA"), 2, 0)
        .unwrap();
    let before = ledger.limits().to_vec();

    let ghost = LimitId::new();
    assert_eq!(ledger.delete_limit(ghost), Err(LedgerError::NotFound(ghost)));
    assert_eq!(ledger.limits(), before.as_slice());
    assert_eq!(h.ledger().limits(), before.as_slice());
}

#[test]
fn test_shared_token_stays_blocked_while_any_locked_limit_covers_it() {
    let h = Harness::new();
    let mut ledger = h.ledger();
    let social = ledger
        .add_limit(
            Selection::new().with_application("AppA").with_application("AppB"),
            0,
            0,
        )
        .unwrap();
    let just_a = ledger
        .add_limit(Selection::new().with_application("AppA"), 0, 0)
        .unwrap();

    ledger.delete_limit(social.id()).unwrap();
    assert!(h.blocks("AppA"));
    assert!(!h.blocks("AppB"));

    ledger.delete_limit(just_a.id()).unwrap();
    assert!(h.restriction.current().is_none());
}

#[test]
fn test_state_survives_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mindmunch.db");
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 31, 8, 0, 0).unwrap());
    let restriction = MemoryRestriction::new();
    let open = || {
        Ledger::open(
            Arc::new(SqliteStore::open_at(&path).unwrap()),
            ShieldController::new(Arc::new(restriction.clone())),
            Arc::new(clock.clone()),
        )
    };

    let id = {
        let mut ledger = open();
        ledger
            .add_limit(Selection::new().with_web_domain("example.com"), 1, 0)
            .unwrap()
            .id()
    };

    clock.advance(Duration::minutes(20));
    let mut ledger = open();
    ledger.tick_now();
    assert_eq!(ledger.get(id).unwrap().remaining_secs(), 40 * 60);
}

#[test]
fn test_observers_see_lock_and_extension() {
    let h = Harness::new();
    let mut ledger = h.ledger();
    let recorder = EventRecorder::new();
    ledger.subscribe(Arc::new(recorder.clone()));

    let limit = ledger
        .add_limit(Selection::new().with_category("games"), 0, 0)
        .unwrap();
    ledger.extend_limit(pass_quiz(limit.id())).unwrap();

    let events = recorder.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::LimitLocked { limit_id, .. } if *limit_id == limit.id())));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::LimitExtended { added_minutes: 15, .. })));
}

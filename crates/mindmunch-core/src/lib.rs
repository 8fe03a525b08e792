//! # MindMunch Core Library
//!
//! This library provides the core logic for MindMunch, a screen-time limiter
//! that blocks selected apps once their daily budget is used up and only
//! grants more time after a short flashcard quiz. Hosts (the CLI binary, a
//! mobile shell) provide the OS collaborators through traits and drive the
//! engine.
//!
//! ## Architecture
//!
//! - **Budget**: a ledger of limits, decremented by wall-clock deltas and
//!   persisted as one durable record
//! - **Shield**: derives the blocked set from locked limits and pushes it to
//!   the OS restriction
//! - **Monitor**: registers usage thresholds with the OS and handles its
//!   background callbacks
//! - **Quiz**: the extension gate and the study sets it draws cards from
//! - **Storage**: SQLite key-value store and TOML configuration
//!
//! ## Key Components
//!
//! - [`Ledger`]: single owner of budget state
//! - [`TickDriver`]: foreground decrement loop
//! - [`ShieldController`]: ledger-to-restriction reflection
//! - [`MonitorBridge`]: background threshold and interval callbacks
//! - [`ExtensionGate`]: quiz state machine minting [`ExtensionGrant`]s
//! - [`AppContext`]: wiring of all of the above

pub mod background;
pub mod budget;
pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod monitor;
pub mod quiz;
pub mod report;
pub mod selection;
pub mod shield;
pub mod storage;

pub use background::{BackgroundRefresh, WakeOutcome, WakeScheduler};
pub use budget::{Ledger, Limit, LimitDuration, LimitId, TickDriver, TickReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{AppContext, LogNotifier};
pub use error::{
    ConfigError, CoreError, LedgerError, MonitorError, NoQuizReason, QuizError, ShieldError,
    StoreError, ValidationError,
};
pub use events::{Event, EventRecorder, LedgerObserver};
pub use monitor::{ActivityName, ActivityScheduler, EventName, MonitorBridge, MonitorRegistrar, ThresholdOutcome};
pub use quiz::{
    ExtensionGate, ExtensionGrant, Flashcard, FlashcardProvider, GateState, Progress, Question,
    QuizPolicy, StudySet, StudySetLibrary, Verdict,
};
pub use report::UsageReport;
pub use selection::{ApplicationToken, CategoryToken, Selection, WebDomainToken};
pub use shield::{RestrictionControl, ShieldController, ShieldRefresh, ShieldState};
pub use storage::{Config, KvStore, MemoryStore, SqliteStore};

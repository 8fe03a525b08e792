//! Restriction control implementations for hosts without a platform shield.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::info;

use super::controller::{RestrictionControl, ShieldState};
use crate::error::ShieldError;
use crate::storage::KvStore;

/// Key under which [`StoreRestriction`] records the applied shield.
pub const SHIELD_KEY: &str = "shield";

/// In-memory restriction, used by tests and embedded hosts.
///
/// `current()` is `None` when the restriction is cleared.
#[derive(Debug, Clone, Default)]
pub struct MemoryRestriction {
    current: Arc<Mutex<Option<ShieldState>>>,
    applies: Arc<AtomicUsize>,
    clears: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryRestriction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ShieldState> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    pub fn apply_calls(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Make every call fail, simulating an OS that rejects the update.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl RestrictionControl for MemoryRestriction {
    fn apply(&self, state: &ShieldState) -> Result<(), ShieldError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShieldError::ApplyFailed("restriction unavailable".into()));
        }
        let mut current = self
            .current
            .lock()
            .map_err(|_| ShieldError::ApplyFailed("lock poisoned".into()))?;
        *current = Some(state.clone());
        self.applies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<(), ShieldError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShieldError::ClearFailed("restriction unavailable".into()));
        }
        let mut current = self
            .current
            .lock()
            .map_err(|_| ShieldError::ClearFailed("lock poisoned".into()))?;
        *current = None;
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Restriction that records the applied shield in the durable store.
///
/// The CLI host uses it in place of the platform shield so that the enforced
/// state can be inspected between invocations.
#[derive(Clone)]
pub struct StoreRestriction {
    store: Arc<dyn KvStore>,
}

impl StoreRestriction {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Read the last applied shield. `None` if cleared, never applied, or
    /// unreadable.
    pub fn load(store: &dyn KvStore) -> Option<ShieldState> {
        let bytes = store.get(SHIELD_KEY).ok()??;
        serde_json::from_slice::<Option<ShieldState>>(&bytes).ok()?
    }

    fn write(&self, state: Option<&ShieldState>) -> Result<(), String> {
        let bytes = serde_json::to_vec(&state).map_err(|e| e.to_string())?;
        self.store.set(SHIELD_KEY, &bytes).map_err(|e| e.to_string())
    }
}

impl RestrictionControl for StoreRestriction {
    fn apply(&self, state: &ShieldState) -> Result<(), ShieldError> {
        self.write(Some(state)).map_err(ShieldError::ApplyFailed)?;
        info!(
            applications = state.applications.len(),
            categories = state.categories.len(),
            web_domains = state.web_domains.len(),
            "shield applied"
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), ShieldError> {
        self.write(None).map_err(ShieldError::ClearFailed)?;
        info!("shield cleared");
        Ok(())
    }
}

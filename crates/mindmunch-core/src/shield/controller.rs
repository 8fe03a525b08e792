//! Shield controller.
//!
//! Derives the blocked set from the ledger and pushes it to the OS
//! restriction. A refresh always recomputes from scratch and replaces the whole
//! restriction; nothing is patched incrementally, so enforced state cannot
//! drift from ledger state and a failed apply is retried by the next refresh.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::budget::Limit;
use crate::error::ShieldError;
use crate::selection::{ApplicationToken, CategoryToken, Selection, WebDomainToken};

/// Union of the selections of every locked limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldState {
    #[serde(default)]
    pub applications: BTreeSet<ApplicationToken>,
    #[serde(default)]
    pub categories: BTreeSet<CategoryToken>,
    #[serde(default)]
    pub web_domains: BTreeSet<WebDomainToken>,
}

impl ShieldState {
    /// Compute the blocked set from limits. Only limits with no budget left
    /// contribute.
    pub fn from_limits<'a>(limits: impl IntoIterator<Item = &'a Limit>) -> Self {
        let mut blocked = Selection::new();
        for limit in limits.into_iter().filter(|l| l.is_locked()) {
            blocked.extend_from(limit.selection());
        }
        Self {
            applications: blocked.applications,
            categories: blocked.categories,
            web_domains: blocked.web_domains,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.categories.is_empty() && self.web_domains.is_empty()
    }

    pub fn blocks_application(&self, token: &ApplicationToken) -> bool {
        self.applications.contains(token)
    }

    pub fn blocks_category(&self, token: &CategoryToken) -> bool {
        self.categories.contains(token)
    }

    pub fn blocks_web_domain(&self, token: &WebDomainToken) -> bool {
        self.web_domains.contains(token)
    }
}

/// OS-level restriction ("shield") control.
pub trait RestrictionControl: Send + Sync {
    /// Replace the current restriction with `state`. Never called with an
    /// empty state.
    fn apply(&self, state: &ShieldState) -> Result<(), ShieldError>;

    /// Remove the restriction entirely.
    fn clear(&self) -> Result<(), ShieldError>;
}

/// Outcome of one [`ShieldController::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShieldRefresh {
    /// Blocked set derived from the limits.
    pub state: ShieldState,
    /// False when the OS rejected the apply (or clear); the restriction then
    /// still holds whatever was there before.
    pub applied: bool,
}

/// Reflects ledger state into the OS restriction. Never mutates limits.
#[derive(Clone)]
pub struct ShieldController {
    control: Arc<dyn RestrictionControl>,
}

impl ShieldController {
    pub fn new(control: Arc<dyn RestrictionControl>) -> Self {
        Self { control }
    }

    /// Recompute the blocked set and apply it.
    ///
    /// An empty blocked set clears the restriction instead of applying an
    /// empty one. Failures are logged; the computed state is returned either
    /// way and remains authoritative, with `applied` telling the caller to
    /// retry.
    pub fn refresh(&self, limits: &[Limit]) -> ShieldRefresh {
        let state = ShieldState::from_limits(limits);
        let result = if state.is_empty() {
            self.control.clear()
        } else {
            self.control.apply(&state)
        };
        let applied = match result {
            Ok(()) => {
                debug!(
                    applications = state.applications.len(),
                    categories = state.categories.len(),
                    web_domains = state.web_domains.len(),
                    "shield refreshed"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "shield refresh failed; will retry on next refresh");
                false
            }
        };
        ShieldRefresh { state, applied }
    }
}

impl std::fmt::Debug for ShieldController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShieldController").finish_non_exhaustive()
    }
}

//! Delta-based decrement pass.
//!
//! Each pass subtracts the wall-clock time since `last_observed_at` rather
//! than a fixed step, so a pass after any gap (app suspended, driver stopped)
//! catches up in one go and consecutive passes compose:
//!
//! ```text
//! pass(now = t0 + e1); pass(now = t0 + e1 + e2)  ==  pass(now = t0 + e1 + e2)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::limit::{Limit, LimitId};
use crate::clock::elapsed_ms;

/// Outcome of one decrement pass over the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    /// Limits that still had budget and were decremented.
    pub decremented: usize,
    /// Limits that reached zero during this pass.
    pub newly_locked: Vec<LimitId>,
}

impl TickReport {
    pub fn lock_state_changed(&self) -> bool {
        !self.newly_locked.is_empty()
    }
}

/// Decrement one limit. Returns true if it crossed to zero on this call.
///
/// Locked limits are left alone, including their `last_observed_at`; an
/// extension resets that timestamp. A clock that moved backwards counts as
/// no elapsed time and does not rewind `last_observed_at`.
pub(crate) fn decrement(limit: &mut Limit, now: DateTime<Utc>) -> bool {
    if limit.remaining_ms == 0 {
        return false;
    }
    let elapsed = elapsed_ms(limit.last_observed_at, now);
    limit.remaining_ms = limit.remaining_ms.saturating_sub(elapsed);
    if now > limit.last_observed_at {
        limit.last_observed_at = now;
    }
    limit.remaining_ms == 0
}

/// Decrement every limit with budget left.
pub(crate) fn decrement_all(limits: &mut [Limit], now: DateTime<Utc>) -> TickReport {
    let mut report = TickReport {
        at: now,
        decremented: 0,
        newly_locked: Vec::new(),
    };
    for limit in limits.iter_mut().filter(|l| !l.is_locked()) {
        report.decremented += 1;
        if decrement(limit, now) {
            report.newly_locked.push(limit.id);
        }
    }
    report
}

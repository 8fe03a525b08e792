//! Daily usage budgets.
//!
//! [`Ledger`] is the single owner of budget state. [`TickDriver`] feeds it
//! periodic decrement passes while the host is in the foreground.

mod decrement;
mod driver;
mod ledger;
mod limit;

pub use decrement::TickReport;
pub use driver::{TickDriver, DEFAULT_TICK_INTERVAL};
pub use ledger::{Ledger, LIMITS_KEY};
pub use limit::{Limit, LimitDuration, LimitId};

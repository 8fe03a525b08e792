mod action;
mod controller;
mod restriction;

pub use action::{
    handle_shield_action, Notification, Notifier, ShieldAction, ShieldActionResponse,
    ShieldAppearance, ShieldedTarget,
};
pub use controller::{RestrictionControl, ShieldController, ShieldRefresh, ShieldState};
pub use restriction::{MemoryRestriction, StoreRestriction, SHIELD_KEY};

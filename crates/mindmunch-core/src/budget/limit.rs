use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::selection::Selection;

/// Stable identifier of a [`Limit`].
///
/// Its hyphenated string form doubles as the OS activity name, which is how
/// background threshold callbacks find their limit again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LimitId(Uuid);

impl LimitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LimitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LimitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for LimitId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

impl From<Uuid> for LimitId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Budget as picked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitDuration {
    pub hours: u32,
    pub minutes: u32,
}

impl LimitDuration {
    pub const MAX_HOURS: u32 = 23;
    pub const MAX_MINUTES: u32 = 59;

    pub fn new(hours: u32, minutes: u32) -> Self {
        Self { hours, minutes }
    }

    /// Whether the duration fits the picker ranges (0-23 h, 0-59 m).
    pub fn is_valid(&self) -> bool {
        self.hours <= Self::MAX_HOURS && self.minutes <= Self::MAX_MINUTES
    }

    pub fn as_secs(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60
    }

    pub fn as_ms(&self) -> u64 {
        self.as_secs().saturating_mul(1000)
    }

    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.as_secs() as i64)
    }
}

impl fmt::Display for LimitDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

/// A time budget attached to a selection.
///
/// Only the ledger writes `remaining_ms` and `last_observed_at`; everything
/// else reads limits through `&Limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub(crate) id: LimitId,
    pub(crate) selection: Selection,
    pub(crate) configured: LimitDuration,
    /// Remaining budget in milliseconds. Saturates at zero.
    pub(crate) remaining_ms: u64,
    /// Last instant the budget was decremented (or extended).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub(crate) last_observed_at: DateTime<Utc>,
    #[serde(default = "Utc::now", with = "chrono::serde::ts_milliseconds")]
    pub(crate) created_at: DateTime<Utc>,
    /// Number of quiz extensions granted so far.
    #[serde(default)]
    pub(crate) extensions: u32,
}

impl Limit {
    pub(crate) fn new(selection: Selection, configured: LimitDuration, now: DateTime<Utc>) -> Self {
        Self {
            id: LimitId::new(),
            selection,
            configured,
            remaining_ms: configured.as_ms(),
            last_observed_at: now,
            created_at: now,
            extensions: 0,
        }
    }

    pub fn id(&self) -> LimitId {
        self.id
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn configured(&self) -> LimitDuration {
        self.configured
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Remaining budget in whole seconds, rounded down.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_ms / 1000
    }

    pub fn last_observed_at(&self) -> DateTime<Utc> {
        self.last_observed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn extensions(&self) -> u32 {
        self.extensions
    }

    /// A limit with no budget left must be shielded.
    pub fn is_locked(&self) -> bool {
        self.remaining_ms == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_limit_starts_with_full_budget() {
        let now = Utc.with_ymd_and_hms(2024, 7, 31, 9, 0, 0).unwrap();
        let limit = Limit::new(
            Selection::new().with_application("app.a"),
            LimitDuration::new(1, 30),
            now,
        );
        assert_eq!(limit.remaining_secs(), 5400);
        assert_eq!(limit.last_observed_at(), now);
        assert!(!limit.is_locked());
    }

    #[test]
    fn zero_duration_is_locked_from_the_start() {
        let limit = Limit::new(Selection::new(), LimitDuration::new(0, 0), Utc::now());
        assert!(limit.is_locked());
    }

    #[test]
    fn duration_validation_matches_picker_ranges() {
        assert!(LimitDuration::new(23, 59).is_valid());
        assert!(!LimitDuration::new(24, 0).is_valid());
        assert!(!LimitDuration::new(0, 60).is_valid());
    }

    #[test]
    fn limit_id_roundtrips_through_activity_name() {
        let id = LimitId::new();
        let parsed: LimitId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<LimitId>().is_err());
    }

    #[test]
    fn record_without_newer_fields_still_decodes() {
        let json = r#"{
            "id": "2f1c3f7e-9a55-4f5e-8d1e-3c1f2b7a9d10",
            "selection": {"applications": ["app.a"]},
            "configured": {"hours": 0, "minutes": 5},
            "remaining_ms": 120000,
            "last_observed_at": 1722416400000
        }"#;
        let limit: Limit = serde_json::from_str(json).unwrap();
        assert_eq!(limit.remaining_secs(), 120);
        assert_eq!(limit.extensions(), 0);
    }
}

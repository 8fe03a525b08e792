//! Usage report built from OS activity segments.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::selection::CategoryToken;

/// Usage of one application inside a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationActivity {
    pub bundle_id: String,
    pub name: String,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryActivity {
    pub category: CategoryToken,
    #[serde(default)]
    pub applications: Vec<ApplicationActivity>,
}

/// One reporting segment (typically an hour) as delivered by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySegment {
    pub start: DateTime<Utc>,
    pub total_activity_secs: u64,
    #[serde(default)]
    pub categories: Vec<CategoryActivity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsage {
    pub bundle_id: String,
    pub name: String,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub total_secs: u64,
    /// Most used first.
    pub apps: Vec<AppUsage>,
}

impl UsageReport {
    /// Sum the segments. An app showing up in several segments or
    /// categories is reported once with its durations added.
    pub fn from_segments(segments: &[ActivitySegment]) -> Self {
        let total_secs = segments.iter().map(|s| s.total_activity_secs).sum();

        let mut by_bundle: BTreeMap<&str, AppUsage> = BTreeMap::new();
        let apps = segments
            .iter()
            .flat_map(|s| &s.categories)
            .flat_map(|c| &c.applications);
        for app in apps {
            by_bundle
                .entry(app.bundle_id.as_str())
                .and_modify(|u| u.duration_secs += app.duration_secs)
                .or_insert_with(|| AppUsage {
                    bundle_id: app.bundle_id.clone(),
                    name: app.name.clone(),
                    duration_secs: app.duration_secs,
                });
        }

        let mut apps: Vec<AppUsage> = by_bundle.into_values().collect();
        apps.sort_by(|a, b| {
            b.duration_secs
                .cmp(&a.duration_secs)
                .then_with(|| a.name.cmp(&b.name))
        });
        Self { total_secs, apps }
    }
}

/// "HH:MM", hours not capped at 24.
pub fn format_hhmm(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 3600, (secs / 60) % 60)
}

/// "Xh Ym Zs"
pub fn format_remaining(secs: u64) -> String {
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// "Xh MMm SSs", or "MMm SSs" below an hour.
pub fn format_usage(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else {
        format!("{minutes:02}m {seconds:02}s")
    }
}

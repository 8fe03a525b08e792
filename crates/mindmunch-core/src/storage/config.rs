//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Decrement engine cadence
//! - Quiz policy for budget extensions
//! - Activity monitor window
//! - Background refresh interval
//! - Shield appearance
//! - Log filter
//!
//! Configuration is stored at `~/.config/mindmunch/config.toml`.

use std::path::PathBuf;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::quiz::QuizPolicy;
use crate::shield::ShieldAppearance;

/// Decrement engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Foreground tick cadence in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Extension gate configuration.
///
/// The pass threshold and the granted minutes are fixed in the gate; stale
/// `required_correct` / `extension_minutes` keys in an old file are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Pending product decision: an incorrect answer keeps earned progress
    /// unless this is set.
    #[serde(default)]
    pub reset_streak_on_incorrect: bool,
    #[serde(default = "default_max_study_sets")]
    pub max_study_sets: usize,
}

/// Activity monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Daily window start, "HH:MM".
    #[serde(default = "default_window_start")]
    pub window_start: String,
    /// Daily window end, "HH:MM".
    #[serde(default = "default_window_end")]
    pub window_end: String,
}

/// Background refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: u32,
}

/// Shield screen configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldConfig {
    #[serde(default = "default_shield_title")]
    pub title: String,
    #[serde(default = "default_shield_subtitle")]
    pub subtitle: String,
    #[serde(default = "default_shield_button")]
    pub primary_button: String,
    #[serde(default = "default_shield_background")]
    pub background_color: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by RUST_LOG.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mindmunch/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub shield: ShieldConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_max_study_sets() -> usize {
    3
}
fn default_true() -> bool {
    true
}
fn default_window_start() -> String {
    "00:00".into()
}
fn default_window_end() -> String {
    "23:59".into()
}
fn default_refresh_interval_minutes() -> u32 {
    15
}
fn default_shield_title() -> String {
    "Hey,\nIt's MunchTime".into()
}
fn default_shield_subtitle() -> String {
    "Go to MindMunch to unlock this app.".into()
}
fn default_shield_button() -> String {
    "Close".into()
}
fn default_shield_background() -> String {
    "#051123".into()
}
fn default_log_filter() -> String {
    "info".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            reset_streak_on_incorrect: false,
            max_study_sets: default_max_study_sets(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_start: default_window_start(),
            window_end: default_window_end(),
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: default_refresh_interval_minutes(),
        }
    }
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            title: default_shield_title(),
            subtitle: default_shield_subtitle(),
            primary_button: default_shield_button(),
            background_color: default_shield_background(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. Returns error if key is unknown
    /// or the new value does not validate.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "engine.tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.quiz.max_study_sets == 0 {
            return Err(ConfigError::InvalidValue {
                key: "quiz.max_study_sets".into(),
                message: "must be greater than zero".into(),
            });
        }
        self.monitor_window()?;
        Ok(())
    }

    /// Parsed monitor window bounds.
    pub fn monitor_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        let parse = |key: &str, raw: &str| {
            NaiveTime::parse_from_str(raw, "%H:%M").map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{raw}': {e}"),
            })
        };
        let start = parse("monitor.window_start", &self.monitor.window_start)?;
        let end = parse("monitor.window_end", &self.monitor.window_end)?;
        if end <= start {
            return Err(ConfigError::InvalidValue {
                key: "monitor.window_end".into(),
                message: "must be later than monitor.window_start".into(),
            });
        }
        Ok((start, end))
    }

    pub fn quiz_policy(&self) -> QuizPolicy {
        QuizPolicy {
            reset_streak_on_incorrect: self.quiz.reset_streak_on_incorrect,
        }
    }

    pub fn shield_appearance(&self) -> ShieldAppearance {
        ShieldAppearance {
            title: self.shield.title.clone(),
            subtitle: self.shield.subtitle.clone(),
            primary_button: self.shield.primary_button.clone(),
            background_color: self.shield.background_color.clone(),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.quiz.max_study_sets, 3);
        assert_eq!(parsed.shield.title, "Hey,\nIt's MunchTime");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[quiz]\nreset_streak_on_incorrect = true\n").unwrap();
        assert!(parsed.quiz.reset_streak_on_incorrect);
        assert_eq!(parsed.quiz.max_study_sets, 3);
        assert_eq!(parsed.engine.tick_interval_ms, 1000);
        assert_eq!(parsed.background.refresh_interval_minutes, 15);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("quiz.max_study_sets").as_deref(), Some("3"));
        assert_eq!(cfg.get("monitor.window_start").as_deref(), Some("00:00"));
        assert_eq!(cfg.get("monitor.enabled").as_deref(), Some("true"));
        assert!(cfg.get("quiz.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("quiz.reset_streak_on_incorrect", "true").unwrap();
        cfg.apply("engine.tick_interval_ms", "500").unwrap();
        cfg.apply("shield.subtitle", "Take a break").unwrap();
        assert!(cfg.quiz.reset_streak_on_incorrect);
        assert_eq!(cfg.engine.tick_interval_ms, 500);
        assert_eq!(cfg.shield.subtitle, "Take a break");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("quiz.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("monitor.enabled", "not_a_bool").is_err());
        assert!(cfg.apply("engine.tick_interval_ms", "fast").is_err());
    }

    #[test]
    fn apply_rejects_values_that_fail_validation() {
        let mut cfg = Config::default();
        assert!(cfg.apply("engine.tick_interval_ms", "0").is_err());
        assert!(cfg.apply("monitor.window_end", "25:00").is_err());
        assert_eq!(cfg.engine.tick_interval_ms, 1000);
        assert_eq!(cfg.monitor.window_end, "23:59");
    }

    #[test]
    fn monitor_window_parses_defaults() {
        let (start, end) = Config::default().monitor_window().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[test]
    fn quiz_policy_mirrors_config() {
        let mut cfg = Config::default();
        cfg.quiz.reset_streak_on_incorrect = true;
        assert!(cfg.quiz_policy().reset_streak_on_incorrect);
    }

    #[test]
    fn quiz_threshold_and_minutes_are_not_settable() {
        let mut cfg = Config::default();
        for key in ["quiz.required_correct", "quiz.extension_minutes"] {
            let err = cfg.apply(key, "1").unwrap_err();
            assert!(matches!(err, ConfigError::UnknownKey(_)), "{key}: {err:?}");
            assert!(cfg.get(key).is_none());
        }
    }

    #[test]
    fn edited_file_cannot_lower_quiz_threshold() {
        let parsed: Config =
            toml::from_str("[quiz]\nrequired_correct = 1\nextension_minutes = 600\n").unwrap();
        assert_eq!(parsed.quiz_policy(), QuizPolicy::default());
    }
}

//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Daily productive goal and unproductive limit (fractional minutes)
//! - Focus areas used by the keyword classifier
//! - Identity used for leaderboard sync
//! - Sync, remote classifier and observer tuning
//!
//! Configuration is stored at `~/.config/mission-focus/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::accounting::{Limits, DEFAULT_PRODUCTIVE_GOAL, DEFAULT_UNPRODUCTIVE_LIMIT};
use crate::classifier::{parse_focus_areas, DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::error::{ConfigError, ValidationError};

/// Ranking backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_rank_interval")]
    pub rank_interval_secs: u64,
}

/// Remote classifier configuration. The API key lives in the keyring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_classifier_model")]
    pub model: String,
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

/// Page observer tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_message_timeout")]
    pub message_timeout_ms: u64,
    #[serde(default = "default_classify_timeout")]
    pub classify_timeout_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/mission-focus/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_productive_goal")]
    pub productive_goal: f64,
    #[serde(default = "default_unproductive_limit")]
    pub unproductive_limit: f64,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub setup_complete: bool,
    /// Email used for leaderboard sync. Unset disables sync.
    #[serde(default)]
    pub user_identity: Option<String>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub observer: ObserverConfig,
}

// Default functions
fn default_productive_goal() -> f64 {
    DEFAULT_PRODUCTIVE_GOAL
}
fn default_unproductive_limit() -> f64 {
    DEFAULT_UNPRODUCTIVE_LIMIT
}
fn default_true() -> bool {
    true
}
fn default_backend_url() -> String {
    "http://localhost:3000".into()
}
fn default_sync_interval() -> u64 {
    30
}
fn default_rank_interval() -> u64 {
    60
}
fn default_classifier_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.into()
}
fn default_classifier_model() -> String {
    DEFAULT_GEMINI_MODEL.into()
}
fn default_classifier_timeout() -> u64 {
    8
}
fn default_retry_attempts() -> u32 {
    20
}
fn default_retry_interval() -> u64 {
    500
}
fn default_message_timeout() -> u64 {
    4000
}
fn default_classify_timeout() -> u64 {
    7000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend_url: default_backend_url(),
            sync_interval_secs: default_sync_interval(),
            rank_interval_secs: default_rank_interval(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_classifier_endpoint(),
            model: default_classifier_model(),
            timeout_secs: default_classifier_timeout(),
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_interval_ms: default_retry_interval(),
            message_timeout_ms: default_message_timeout(),
            classify_timeout_ms: default_classify_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            productive_goal: DEFAULT_PRODUCTIVE_GOAL,
            unproductive_limit: DEFAULT_UNPRODUCTIVE_LIMIT,
            focus_areas: Vec::new(),
            setup_complete: false,
            user_identity: None,
            sync: SyncConfig::default(),
            classifier: ClassifierConfig::default(),
            observer: ObserverConfig::default(),
        }
    }
}

/// Convert an hours/minutes/seconds entry to fractional minutes.
/// Zero totals are rejected.
pub fn minutes_from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<f64, ValidationError> {
    let total = f64::from(hours) * 60.0 + f64::from(minutes) + f64::from(seconds) / 60.0;
    if total <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "duration".into(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(total)
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
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                // Lists accept JSON or the comma-separated form.
                serde_json::Value::Array(_) => match serde_json::from_str(value) {
                    Ok(v @ serde_json::Value::Array(_)) => v,
                    _ => serde_json::Value::Array(
                        value
                            .split(',')
                            .map(|s| serde_json::Value::String(s.to_string()))
                            .collect(),
                    ),
                },
                serde_json::Value::Object(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default, writing the default out.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("using default configuration: {e}");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Whether `key` names a known setting, set or not.
    pub fn has_key(&self, key: &str) -> bool {
        serde_json::to_value(self)
            .ok()
            .is_some_and(|json| Self::get_json_value_by_path(&json, key).is_some())
    }

    /// Apply a value in memory, validating the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is rejected.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let mut updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.normalize();
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// Replace both thresholds (fractional minutes).
    pub fn set_goals(&mut self, productive_goal: f64, unproductive_limit: f64) -> Result<(), ConfigError> {
        let mut updated = self.clone();
        updated.productive_goal = productive_goal;
        updated.unproductive_limit = unproductive_limit;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("productive_goal", self.productive_goal)?;
        check_positive("unproductive_limit", self.unproductive_limit)?;
        if self.sync.sync_interval_secs == 0 {
            return Err(invalid_value("sync.sync_interval_secs", "must be greater than zero"));
        }
        if self.sync.rank_interval_secs == 0 {
            return Err(invalid_value("sync.rank_interval_secs", "must be greater than zero"));
        }
        if self.classifier.timeout_secs == 0 {
            return Err(invalid_value("classifier.timeout_secs", "must be greater than zero"));
        }
        if let Some(identity) = &self.user_identity {
            crate::sync::validate_email(identity)
                .map_err(|e| invalid_value("user_identity", &e.to_string()))?;
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.focus_areas = parse_focus_areas(&self.focus_areas.join(","));
        self.user_identity = self
            .user_identity
            .take()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
    }

    pub fn limits(&self) -> Limits {
        Limits::new(self.productive_goal, self.unproductive_limit)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.sync_interval_secs)
    }

    pub fn rank_interval(&self) -> Duration {
        Duration::from_secs(self.sync.rank_interval_secs)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier.timeout_secs)
    }
}

fn invalid_value(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn check_positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid_value(key, "must be a positive number of minutes"))
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
        assert_eq!(parsed.productive_goal, 120.0);
        assert_eq!(parsed.unproductive_limit, 30.0);
        assert_eq!(parsed.sync.sync_interval_secs, 30);
        assert_eq!(parsed.observer.retry_attempts, 20);
        assert!(parsed.user_identity.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("productive_goal = 45.5\n[sync]\nenabled = false\n").unwrap();
        assert_eq!(parsed.productive_goal, 45.5);
        assert_eq!(parsed.unproductive_limit, 30.0);
        assert!(!parsed.sync.enabled);
        assert_eq!(parsed.sync.backend_url, "http://localhost:3000");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("productive_goal").as_deref(), Some("120.0"));
        assert_eq!(cfg.get("sync.rank_interval_secs").as_deref(), Some("60"));
        assert_eq!(cfg.get("classifier.model").as_deref(), Some("gemini-2.5-flash"));
        assert!(cfg.get("user_identity").is_none());
        assert!(cfg.get("sync.missing_key").is_none());
        assert!(cfg.has_key("user_identity"));
        assert!(!cfg.has_key("nope"));
    }

    #[test]
    fn update_accepts_fractional_minutes() {
        let mut cfg = Config::default();
        cfg.update("unproductive_limit", "0.5").unwrap();
        assert_eq!(cfg.unproductive_limit, 0.5);
        cfg.update("productive_goal", "90").unwrap();
        assert_eq!(cfg.productive_goal, 90.0);
    }

    #[test]
    fn update_rejects_non_positive_goals() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.update("productive_goal", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.update("unproductive_limit", "-5").is_err());
        assert_eq!(cfg.productive_goal, 120.0);
        assert_eq!(cfg.unproductive_limit, 30.0);
    }

    #[test]
    fn update_focus_areas_from_comma_string() {
        let mut cfg = Config::default();
        cfg.update("focus_areas", " Rust, chess ,,").unwrap();
        assert_eq!(cfg.focus_areas, vec!["rust", "chess"]);
        cfg.update("focus_areas", r#"["Go"]"#).unwrap();
        assert_eq!(cfg.focus_areas, vec!["go"]);
    }

    #[test]
    fn update_identity_validates_email() {
        let mut cfg = Config::default();
        cfg.update("user_identity", "me@example.com").unwrap();
        assert_eq!(cfg.user_identity.as_deref(), Some("me@example.com"));
        assert!(cfg.update("user_identity", "not-an-email").is_err());
        cfg.update("user_identity", "  ").unwrap();
        assert!(cfg.user_identity.is_none());
    }

    #[test]
    fn update_rejects_unknown_key_and_bad_types() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.update("sync.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.update("setup_complete", "not_a_bool").is_err());
        assert!(cfg.update("sync.sync_interval_secs", "0").is_err());
    }

    #[test]
    fn minutes_from_hms_converts_and_rejects_zero() {
        assert_eq!(minutes_from_hms(1, 30, 0).unwrap(), 90.0);
        assert_eq!(minutes_from_hms(0, 0, 30).unwrap(), 0.5);
        assert!(minutes_from_hms(0, 0, 0).is_err());
    }

    #[test]
    fn set_goals_validates_both() {
        let mut cfg = Config::default();
        cfg.set_goals(60.0, 15.0).unwrap();
        assert_eq!(cfg.limits(), Limits::new(60.0, 15.0));
        assert!(cfg.set_goals(0.0, 15.0).is_err());
        assert_eq!(cfg.productive_goal, 60.0);
    }

    #[test]
    fn load_from_writes_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.productive_goal, 120.0);
        assert!(path.exists());

        let mut cfg = cfg;
        cfg.update("focus_areas", "rust").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().focus_areas, vec!["rust"]);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "productive_goal = \"lots\"").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}

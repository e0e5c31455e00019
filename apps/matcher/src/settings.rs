//! Settings collaborator: where the skill similarity threshold comes from.
//!
//! The threshold is read on every scoring call so operators can tune matching
//! sensitivity without a restart. Read failures never fail scoring: they fall
//! back to `DEFAULT_SKILL_THRESHOLD`.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::SettingsError;

pub const DEFAULT_SKILL_THRESHOLD: f64 = 0.62;

/// JSON key holding the threshold in the settings file.
pub const SKILL_THRESHOLD_KEY: &str = "skill_threshold";

/// Source of the skill similarity threshold.
pub trait ThresholdSource: Send + Sync {
    fn skill_threshold(&self) -> f64;
}

/// A compiled-in or CLI-supplied threshold.
#[derive(Debug, Clone, Copy)]
pub struct FixedThreshold(pub f64);

impl Default for FixedThreshold {
    fn default() -> Self {
        Self(DEFAULT_SKILL_THRESHOLD)
    }
}

impl ThresholdSource for FixedThreshold {
    fn skill_threshold(&self) -> f64 {
        if self.0.is_finite() {
            self.0
        } else {
            DEFAULT_SKILL_THRESHOLD
        }
    }
}

/// Threshold stored in a JSON file: `{"skill_threshold": 0.62}`.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists a new threshold, keeping any other keys already in the file.
    pub fn set_skill_threshold(&self, threshold: f64) -> Result<f64, SettingsError> {
        if !threshold.is_finite() {
            return Err(SettingsError::InvalidThreshold(threshold));
        }

        let mut settings = match self.read() {
            Ok(Some(map)) => map,
            Ok(None) => Map::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Overwriting unreadable settings file");
                Map::new()
            }
        };
        settings.insert(SKILL_THRESHOLD_KEY.to_string(), Value::from(threshold));

        let body = serde_json::to_string_pretty(&Value::Object(settings))?;
        std::fs::write(&self.path, body)?;
        Ok(threshold)
    }

    /// `Ok(None)` when the file does not exist.
    fn read(&self) -> Result<Option<Map<String, Value>>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Ok(Some(Map::new())),
        }
    }
}

impl ThresholdSource for JsonFileSettings {
    fn skill_threshold(&self) -> f64 {
        match self.read() {
            Ok(Some(map)) => map
                .get(SKILL_THRESHOLD_KEY)
                .and_then(threshold_from_value)
                .unwrap_or(DEFAULT_SKILL_THRESHOLD),
            Ok(None) => {
                debug!(path = %self.path.display(), "No settings file; using default threshold");
                DEFAULT_SKILL_THRESHOLD
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read settings; using default threshold");
                DEFAULT_SKILL_THRESHOLD
            }
        }
    }
}

/// Threshold taken from an environment variable, re-read on every call.
#[derive(Debug, Clone)]
pub struct EnvThreshold {
    key: String,
}

impl EnvThreshold {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl ThresholdSource for EnvThreshold {
    fn skill_threshold(&self) -> f64 {
        match std::env::var(&self.key) {
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    warn!(key = %self.key, value = %raw, "Invalid threshold in environment; using default");
                    DEFAULT_SKILL_THRESHOLD
                }
            },
            Err(_) => DEFAULT_SKILL_THRESHOLD,
        }
    }
}

/// Accepts numbers and numeric strings ("0.7").
fn threshold_from_value(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

//! # cita-settings
//!
//! Layered configuration for the cita engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CitaSettings::default()`]
//! 2. **JSON file**: deep-merged over defaults
//! 3. **Environment variables**: `CITA_*` overrides (highest priority)
//!
//! The loaded value is injected explicitly: construct once at startup and
//! pass down. Components never reach for a global.

#![deny(unsafe_code)]

pub mod types;

pub use types::*;

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// Settings loading failures.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON.
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Deep-merge `overlay` into `base`.
///
/// Objects merge recursively; any other value in `overlay` replaces the
/// one in `base`.
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from a JSON file layered over defaults, then apply env
/// overrides and validate.
///
/// A missing file is not an error: defaults plus env overrides apply.
pub fn load_from_path(path: &Path) -> Result<CitaSettings> {
    let defaults = serde_json::to_value(CitaSettings::default())?;

    let merged = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        let file_value: Value = serde_json::from_str(&raw)?;
        deep_merge(defaults, file_value)
    } else {
        tracing::debug!(?path, "no settings file, using defaults");
        defaults
    };

    let mut settings: CitaSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Apply `CITA_*` environment variable overrides.
fn apply_env_overrides(settings: &mut CitaSettings) {
    fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
        let raw = std::env::var(name).ok()?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(name, raw, "ignoring unparseable env override");
                None
            }
        }
    }

    if let Some(v) = parse_env("CITA_RETRY_THRESHOLD") {
        settings.retry.escalation_threshold = v;
    }
    if let Some(v) = parse_env("CITA_PLANNER_TIMEOUT_MS") {
        settings.planner.timeout_ms = v;
    }
    if let Some(v) = parse_env("CITA_TOOL_TIMEOUT_MS") {
        settings.tools.timeout_ms = v;
    }
    if let Some(v) = parse_env("CITA_SESSION_IDLE_TTL_HOURS") {
        settings.session.idle_ttl_hours = v;
    }
    if let Some(v) = parse_env("CITA_CACHE_MAX_ENTRIES") {
        settings.cache.max_entries = v;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

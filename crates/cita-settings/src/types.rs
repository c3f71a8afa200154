//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial
//! JSON files work: missing fields get their production default during
//! deserialization. Each type implements [`Default`] with the values the
//! engine ships with.

use serde::{Deserialize, Serialize};

/// Root settings type for the cita engine.
///
/// Constructed once at startup (defaults ← file ← env overrides) and passed
/// down explicitly to the components that need it; there is no global
/// singleton.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CitaSettings {
    /// Settings schema version.
    pub version: String,
    /// Retry/escalation policy settings.
    pub retry: RetrySettings,
    /// Planner (LLM collaborator) settings.
    pub planner: PlannerSettings,
    /// Tool backend settings.
    pub tools: ToolTimeoutSettings,
    /// Session store settings.
    pub session: SessionSettings,
    /// Shared TTL cache settings.
    pub cache: CacheSettings,
}

impl Default for CitaSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            retry: RetrySettings::default(),
            planner: PlannerSettings::default(),
            tools: ToolTimeoutSettings::default(),
            session: SessionSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl CitaSettings {
    /// Correct invalid invariants in place.
    ///
    /// Out-of-range values are fixed with a warning rather than rejected,
    /// so operators get corrected behavior instead of a startup failure.
    pub fn validate(&mut self) {
        if self.retry.escalation_threshold == 0 {
            tracing::warn!("escalationThreshold must be at least 1, using 1");
            self.retry.escalation_threshold = 1;
        }
        if self.session.history_window == 0 {
            tracing::warn!("historyWindow must be at least 1, using 1");
            self.session.history_window = 1;
        }
        if self.cache.max_entries == 0 {
            tracing::warn!("cache maxEntries must be at least 1, using 1");
            self.cache.max_entries = 1;
        }
    }
}

/// Retry/escalation policy settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// User-error count at which a flow escalates to the hub.
    pub escalation_threshold: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            escalation_threshold: 2,
        }
    }
}

/// Planner call settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerSettings {
    /// Planner call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self { timeout_ms: 15_000 }
    }
}

/// Tool backend call settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolTimeoutSettings {
    /// Per-call tool timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ToolTimeoutSettings {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Session store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Sessions idle longer than this many hours are evicted.
    pub idle_ttl_hours: u64,
    /// How many history messages the planner sees per call.
    pub history_window: usize,
    /// Persistence commit timeout in milliseconds.
    pub commit_timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_ttl_hours: 48,
            history_window: 20,
            commit_timeout_ms: 5_000,
        }
    }
}

/// Shared TTL cache settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Sweep trigger: entries above this count start a sweep.
    pub max_entries: usize,
    /// Default entry TTL in seconds.
    pub default_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_production_values() {
        let settings = CitaSettings::default();
        assert_eq!(settings.retry.escalation_threshold, 2);
        assert_eq!(settings.planner.timeout_ms, 15_000);
        assert_eq!(settings.session.idle_ttl_hours, 48);
        assert_eq!(settings.session.history_window, 20);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: CitaSettings =
            serde_json::from_str(r#"{"retry": {"escalationThreshold": 3}}"#).unwrap();
        assert_eq!(settings.retry.escalation_threshold, 3);
        assert_eq!(settings.planner.timeout_ms, 15_000);
    }

    #[test]
    fn validate_fixes_zero_threshold() {
        let mut settings = CitaSettings::default();
        settings.retry.escalation_threshold = 0;
        settings.cache.max_entries = 0;
        settings.validate();
        assert_eq!(settings.retry.escalation_threshold, 1);
        assert_eq!(settings.cache.max_entries, 1);
    }
}

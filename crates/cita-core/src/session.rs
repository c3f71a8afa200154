//! The session aggregate: state, collected data, retry counters, history.
//!
//! A [`Session`] is exclusively owned by at most one in-flight turn; the
//! store enforces that property (see `cita-runtime`). Everything here is
//! plain owned data so a turn can work on a draft and commit atomically.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::Language;
use crate::messages::{History, Message};
use crate::state::State;

// ─────────────────────────────────────────────────────────────────────────────
// Collected data
// ─────────────────────────────────────────────────────────────────────────────

/// Open string-keyed map of flow-scoped fields (service id, date, time,
/// contact fields, confirmation number, new date/time for rescheduling).
/// Owned exclusively by the session; never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedData {
    fields: BTreeMap<String, String>,
}

impl CollectedData {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Set a field, returning the previous value if any.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    /// Remove a field.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    /// Merge a batch of fields (planner-proposed data updates).
    pub fn merge(&mut self, updates: impl IntoIterator<Item = (String, String)>) {
        self.fields.extend(updates);
    }

    /// Number of collected fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry counters
// ─────────────────────────────────────────────────────────────────────────────

/// Per-flow retry counters.
///
/// Invariants: a counter is reset to 0 immediately after an escalation
/// fires, and never exceeds the configured threshold before escalation is
/// forced. The retry policy in `cita-runtime` is the only writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetryCounters {
    counts: BTreeMap<String, u32>,
}

impl RetryCounters {
    /// All counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for a flow key (0 when absent).
    #[must_use]
    pub fn get(&self, flow_key: &str) -> u32 {
        self.counts.get(flow_key).copied().unwrap_or(0)
    }

    /// Increment a flow's counter and return the new value.
    pub fn bump(&mut self, flow_key: &str) -> u32 {
        let count = self.counts.entry(flow_key.to_owned()).or_insert(0);
        *count += 1;
        *count
    }

    /// Reset a flow's counter to zero.
    pub fn reset(&mut self, flow_key: &str) {
        let _ = self.counts.remove(flow_key);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// The per-conversation aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Internal thread id.
    pub id: String,
    /// Current conversational state.
    pub state: State,
    /// Flow-scoped collected fields.
    pub data: CollectedData,
    /// Per-flow retry counters.
    pub retries: RetryCounters,
    /// Append-ordered message history.
    pub history: History,
    /// Detected user language, once known.
    pub language: Option<Language>,
    /// Transport hint supplied by the caller (e.g. "whatsapp", "web").
    pub platform: Option<String>,
    /// Last turn-completion instant; drives idle eviction.
    pub last_active: DateTime<Utc>,
}

impl Session {
    /// A fresh session in [`State::Start`].
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: State::Start,
            data: CollectedData::new(),
            retries: RetryCounters::new(),
            history: History::new(),
            language: None,
            platform: None,
            last_active: Utc::now(),
        }
    }

    /// Append a message to the history.
    pub fn push_message(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Record activity now. Called by the store on commit.
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Update the detected language if the new detection carries signal.
    pub fn observe_language(&mut self, detected: Option<Language>) {
        if let Some(lang) = detected {
            self.language = Some(lang);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_at_start() {
        let session = Session::new("t-1");
        assert_eq!(session.state, State::Start);
        assert!(session.history.is_empty());
        assert!(session.data.is_empty());
        assert_eq!(session.retries.get("cancel"), 0);
    }

    #[test]
    fn collected_data_set_and_merge() {
        let mut data = CollectedData::new();
        assert!(data.set("service", "haircut").is_none());
        assert_eq!(data.set("service", "manicure").as_deref(), Some("haircut"));

        data.merge([
            ("date".to_owned(), "2026-08-12".to_owned()),
            ("time".to_owned(), "15:00".to_owned()),
        ]);
        assert_eq!(data.len(), 3);
        assert_eq!(data.get("time"), Some("15:00"));
    }

    #[test]
    fn counters_bump_and_reset() {
        let mut counters = RetryCounters::new();
        assert_eq!(counters.get("cancel"), 0);
        assert_eq!(counters.bump("cancel"), 1);
        assert_eq!(counters.bump("cancel"), 2);
        assert_eq!(counters.get("reschedule"), 0);

        counters.reset("cancel");
        assert_eq!(counters.get("cancel"), 0);
    }

    #[test]
    fn language_only_overwritten_on_signal() {
        let mut session = Session::new("t-1");
        session.observe_language(Some(Language::Es));
        assert_eq!(session.language, Some(Language::Es));

        // A bare confirmation number carries no signal; keep the old value.
        session.observe_language(None);
        assert_eq!(session.language, Some(Language::Es));
    }

    #[test]
    fn serde_round_trip() {
        let mut session = Session::new("t-9");
        session.state = State::CancelVerify;
        let _ = session.data.set("confirmation", "CNF-22");
        let _ = session.retries.bump("cancel");
        session.push_message(Message::user("cancelar"));

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}

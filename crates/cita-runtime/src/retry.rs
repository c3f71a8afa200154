//! Bounded-retry / escalation policy.
//!
//! Classifies a tool result string into success / user error / system
//! error, and decides, given the flow's retry counter, whether to retry,
//! escalate, or pass through. This module is the only place threshold and
//! escalation logic lives; it is independent of how many tool calls
//! happened in the turn (only the last relevant result is classified).
//!
//! Classification is marker-based and is the wire contract with the tool
//! backend: changing tool-result phrasing changes behavior here.

use cita_core::session::RetryCounters;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Result string markers
// ─────────────────────────────────────────────────────────────────────────────

/// Prefix tagging a successful tool result.
pub const SUCCESS_PREFIX: &str = "SUCCESS:";
/// Prefix tagging a failed tool result.
pub const ERROR_PREFIX: &str = "ERROR:";

/// Substrings (lowercase) marking an error as user-caused: the user likely
/// mistyped something and a retry is worthwhile.
const USER_ERROR_MARKERS: [&str; 3] = ["not found", "invalid format", "no appointment"];

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of a tool result string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The tool did what was asked.
    Success,
    /// The tool failed on user-supplied data; retrying can help.
    UserError,
    /// The tool failed on our side (connectivity, timeout); retrying
    /// won't help the user.
    SystemError,
}

/// Classify a tagged tool result string.
///
/// A result beginning with [`SUCCESS_PREFIX`] is a success; so is one
/// carrying no error marker at all (informational results). An
/// [`ERROR_PREFIX`] result with a user-error substring is a user error;
/// any other error (connectivity, timeout, or unqualified) is a system
/// error, because retrying an unknown failure cannot be shown to help.
#[must_use]
pub fn classify(result: &str) -> Outcome {
    let trimmed = result.trim_start();
    if trimmed.starts_with(SUCCESS_PREFIX) || !trimmed.starts_with(ERROR_PREFIX) {
        return Outcome::Success;
    }
    let lowered = trimmed.to_lowercase();
    if USER_ERROR_MARKERS.iter().any(|m| lowered.contains(m)) {
        Outcome::UserError
    } else {
        Outcome::SystemError
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────────────────────────────────────

/// Why an escalation fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// The flow exhausted its retry budget on user errors.
    RetryLimit,
    /// A system-side failure; escalate without consuming a retry.
    SystemFailure,
}

/// What the policy decided for this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Success: counter cleared, the flow moves forward.
    Proceed,
    /// User error below the threshold: stay in the verify state and
    /// re-prompt.
    Reprompt,
    /// Forced transition to the hub.
    Escalate(EscalationReason),
}

/// The bounded-retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    threshold: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { threshold: 2 }
    }
}

impl RetryPolicy {
    /// Policy with an explicit escalation threshold.
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    /// The configured escalation threshold.
    #[must_use]
    pub fn threshold(self) -> u32 {
        self.threshold
    }

    /// Apply an outcome to a flow's counter and decide the next move.
    ///
    /// Counter invariants: cleared on success; untouched on system error;
    /// incremented on user error, and reset to 0 the moment the increment
    /// reaches the threshold and escalation fires.
    pub fn apply(self, counters: &mut RetryCounters, flow_key: &str, outcome: Outcome) -> Action {
        match outcome {
            Outcome::Success => {
                counters.reset(flow_key);
                Action::Proceed
            }
            Outcome::SystemError => {
                warn!(flow_key, "system error, escalating without retry");
                Action::Escalate(EscalationReason::SystemFailure)
            }
            Outcome::UserError => {
                let count = counters.bump(flow_key);
                if count >= self.threshold {
                    counters.reset(flow_key);
                    warn!(flow_key, count, "retry budget exhausted, escalating");
                    Action::Escalate(EscalationReason::RetryLimit)
                } else {
                    debug!(flow_key, count, "user error, re-prompting");
                    Action::Reprompt
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn classify_success_prefix() {
        assert_eq!(classify("SUCCESS: booking CNF-12 created"), Outcome::Success);
        assert_eq!(classify("  SUCCESS: found"), Outcome::Success);
    }

    #[test]
    fn classify_untagged_as_success() {
        assert_eq!(classify("3 slots available tomorrow"), Outcome::Success);
    }

    #[test]
    fn classify_user_errors() {
        assert_eq!(
            classify("ERROR: appointment not found for CNF-99"),
            Outcome::UserError
        );
        assert_eq!(
            classify("ERROR: confirmation number has invalid format"),
            Outcome::UserError
        );
    }

    #[test]
    fn classify_system_errors() {
        assert_eq!(
            classify("ERROR: could not connect to booking backend"),
            Outcome::SystemError
        );
        assert_eq!(classify("ERROR: request timed out"), Outcome::SystemError);
    }

    #[test]
    fn classify_unqualified_error_as_system() {
        assert_eq!(classify("ERROR: something odd happened"), Outcome::SystemError);
    }

    #[test]
    fn success_clears_counter() {
        let policy = RetryPolicy::default();
        let mut counters = RetryCounters::new();
        let _ = counters.bump("cancel");

        let action = policy.apply(&mut counters, "cancel", Outcome::Success);
        assert_matches!(action, Action::Proceed);
        assert_eq!(counters.get("cancel"), 0);
    }

    #[test]
    fn system_error_escalates_and_leaves_counter() {
        let policy = RetryPolicy::default();
        let mut counters = RetryCounters::new();
        let _ = counters.bump("reschedule");

        let action = policy.apply(&mut counters, "reschedule", Outcome::SystemError);
        assert_matches!(action, Action::Escalate(EscalationReason::SystemFailure));
        assert_eq!(counters.get("reschedule"), 1);
    }

    #[test]
    fn first_user_error_reprompts() {
        let policy = RetryPolicy::default();
        let mut counters = RetryCounters::new();

        let action = policy.apply(&mut counters, "cancel", Outcome::UserError);
        assert_matches!(action, Action::Reprompt);
        assert_eq!(counters.get("cancel"), 1);
    }

    #[test]
    fn second_user_error_escalates_and_resets() {
        let policy = RetryPolicy::default();
        let mut counters = RetryCounters::new();

        assert_matches!(
            policy.apply(&mut counters, "cancel", Outcome::UserError),
            Action::Reprompt
        );
        assert_matches!(
            policy.apply(&mut counters, "cancel", Outcome::UserError),
            Action::Escalate(EscalationReason::RetryLimit)
        );
        assert_eq!(counters.get("cancel"), 0);
    }

    #[test]
    fn counter_never_reaches_threshold_without_escalating() {
        let policy = RetryPolicy::new(3);
        let mut counters = RetryCounters::new();

        for _ in 0..2 {
            let _ = policy.apply(&mut counters, "cancel", Outcome::UserError);
            assert!(counters.get("cancel") < 3);
        }
        assert_matches!(
            policy.apply(&mut counters, "cancel", Outcome::UserError),
            Action::Escalate(EscalationReason::RetryLimit)
        );
        assert_eq!(counters.get("cancel"), 0);
    }

    #[test]
    fn flows_count_independently() {
        let policy = RetryPolicy::default();
        let mut counters = RetryCounters::new();

        let _ = policy.apply(&mut counters, "cancel", Outcome::UserError);
        let _ = policy.apply(&mut counters, "reschedule", Outcome::UserError);
        assert_eq!(counters.get("cancel"), 1);
        assert_eq!(counters.get("reschedule"), 1);

        assert_matches!(
            policy.apply(&mut counters, "cancel", Outcome::UserError),
            Action::Escalate(EscalationReason::RetryLimit)
        );
        // The other flow's counter is untouched by the escalation.
        assert_eq!(counters.get("reschedule"), 1);
    }

    #[test]
    fn zero_threshold_clamped_to_one() {
        let policy = RetryPolicy::new(0);
        let mut counters = RetryCounters::new();
        assert_matches!(
            policy.apply(&mut counters, "cancel", Outcome::UserError),
            Action::Escalate(EscalationReason::RetryLimit)
        );
    }
}

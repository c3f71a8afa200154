//! Planner error types.

use thiserror::Error;

/// Failures at the planner seam.
///
/// The orchestrator maps [`PlannerError::Timeout`] to system-error
/// semantics (immediate escalation); the other variants resolve to the
/// recoverable-error path.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The collaborator did not answer within the caller-supplied timeout.
    #[error("planner timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The collaborator failed to produce a response (network, provider
    /// outage). Treated like a timeout by the engine.
    #[error("planner transport failure: {0}")]
    Transport(String),

    /// The collaborator answered with something the engine cannot use
    /// (no message and no tool calls).
    #[error("malformed planner response: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_carries_millis() {
        let err = PlannerError::Timeout { timeout_ms: 15_000 };
        assert!(err.to_string().contains("15000"));
    }
}

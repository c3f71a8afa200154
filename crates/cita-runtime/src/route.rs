//! Conditional routing: does this turn need the retry policy at all?
//!
//! Only the two verify states parse tool results through the policy; the
//! 90%+ of turns elsewhere skip the classification entirely. This is a
//! latency optimization, never a correctness requirement; the policy is a
//! no-op outside these states.

use cita_core::state::State;

/// Whether the retry/escalation policy must run for a turn ending in
/// `state`. Pure O(1) lookup.
#[must_use]
pub fn needs_retry_policy(state: State) -> bool {
    matches!(state, State::CancelVerify | State::RescheduleVerify)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cita_core::state::ALL_STATES;

    #[test]
    fn only_verify_states_need_the_policy() {
        for state in ALL_STATES {
            let expected = state == State::CancelVerify || state == State::RescheduleVerify;
            assert_eq!(needs_retry_policy(state), expected, "{state}");
        }
    }
}

//! Error types for the core vocabulary.
//!
//! Kept deliberately small: the core crate only fails in two ways:
//! an out-of-table transition request, or an unknown wire label. Richer
//! failure modes (planner, tools, persistence) live in the crates that
//! own those collaborators.

use thiserror::Error;

use crate::state::State;

/// Errors produced by the core state machinery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A transition was requested that the table does not list.
    ///
    /// The caller must keep the session in `from` and surface a
    /// recoverable message; accepting the request would corrupt the
    /// session.
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        /// State the session is currently in.
        from: State,
        /// State that was requested.
        to: State,
    },

    /// A wire label did not name any known state.
    ///
    /// Planner proposals arrive as labels; an unknown label never
    /// constructs a [`State`].
    #[error("unknown state label: {0:?}")]
    UnknownStateLabel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_display_names_both_states() {
        let err = CoreError::IllegalTransition {
            from: State::Start,
            to: State::BookingProcess,
        };
        let text = err.to_string();
        assert!(text.contains("start"));
        assert!(text.contains("booking.process"));
    }

    #[test]
    fn unknown_label_display() {
        let err = CoreError::UnknownStateLabel("bogus".into());
        assert!(err.to_string().contains("bogus"));
    }
}

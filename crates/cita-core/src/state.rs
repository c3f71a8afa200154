//! Flow/state taxonomy and the transition-legality table.
//!
//! Every conversational state is a variant of the closed [`State`] enum, so
//! a typo'd or unknown state cannot compile, and planner proposals (which
//! arrive as strings) must round-trip through [`State::from_label`] before
//! they can touch a session.
//!
//! The [`TransitionTable`] is the single authority on which state changes
//! are legal. Intent overrides are modeled *inside* the table: every
//! non-terminal state lists the two override entry states and [`State::Complete`]
//! as universally legal edges, rather than letting the intent router bypass
//! validation.

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ─────────────────────────────────────────────────────────────────────────────
// Flow
// ─────────────────────────────────────────────────────────────────────────────

/// One of the three independent conversational goals.
///
/// A session is in exactly one flow at a time, except while sitting in a
/// hub state (`Start`, `PostAction`, `Complete`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Booking a new appointment.
    Booking,
    /// Cancelling an existing appointment.
    Cancellation,
    /// Moving an existing appointment to a new date/time.
    Rescheduling,
}

impl Flow {
    /// Key used for this flow's retry counter.
    #[must_use]
    pub fn retry_key(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Cancellation => "cancel",
            Self::Rescheduling => "reschedule",
        }
    }

    /// The state a session enters when this flow begins.
    #[must_use]
    pub fn entry_state(self) -> State {
        match self {
            Self::Booking => State::BookingCollectService,
            Self::Cancellation => State::CancelAskConfirmation,
            Self::Rescheduling => State::RescheduleAskConfirmation,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// A conversational state, scoped to a flow or to the hub.
///
/// Wire labels (see [`State::label`]) are stable: they appear in persisted
/// snapshots and in planner proposals. Renaming a variant must not change
/// its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum State {
    /// Initial state of a fresh session (hub).
    Start,
    /// Booking: ask which service the customer wants.
    BookingCollectService,
    /// Booking: ask for a date and time slot.
    BookingSelectDateTime,
    /// Booking: collect name and contact details.
    BookingCollectContact,
    /// Booking: read the summary back and ask for a yes.
    BookingConfirm,
    /// Booking: create the appointment in the backend.
    BookingProcess,
    /// Cancellation: confirm the customer really wants to cancel.
    CancelAskConfirmation,
    /// Cancellation: look the appointment up by confirmation number.
    CancelVerify,
    /// Cancellation: cancel the appointment in the backend.
    CancelProcess,
    /// Rescheduling: confirm the customer wants to move the appointment.
    RescheduleAskConfirmation,
    /// Rescheduling: look the appointment up by confirmation number.
    RescheduleVerify,
    /// Rescheduling: ask for the new date and time.
    RescheduleSelectDateTime,
    /// Rescheduling: move the appointment in the backend.
    RescheduleProcess,
    /// Hub: appointment handled, ask whether anything else is needed.
    PostAction,
    /// Terminal: the conversation is over.
    Complete,
}

/// All states, in declaration order. Used by table-exhaustiveness tests.
pub const ALL_STATES: [State; 15] = [
    State::Start,
    State::BookingCollectService,
    State::BookingSelectDateTime,
    State::BookingCollectContact,
    State::BookingConfirm,
    State::BookingProcess,
    State::CancelAskConfirmation,
    State::CancelVerify,
    State::CancelProcess,
    State::RescheduleAskConfirmation,
    State::RescheduleVerify,
    State::RescheduleSelectDateTime,
    State::RescheduleProcess,
    State::PostAction,
    State::Complete,
];

impl State {
    /// Stable wire label for persistence and planner proposals.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::BookingCollectService => "booking.collect_service",
            Self::BookingSelectDateTime => "booking.select_datetime",
            Self::BookingCollectContact => "booking.collect_contact",
            Self::BookingConfirm => "booking.confirm",
            Self::BookingProcess => "booking.process",
            Self::CancelAskConfirmation => "cancel.ask_confirmation",
            Self::CancelVerify => "cancel.verify",
            Self::CancelProcess => "cancel.process",
            Self::RescheduleAskConfirmation => "reschedule.ask_confirmation",
            Self::RescheduleVerify => "reschedule.verify",
            Self::RescheduleSelectDateTime => "reschedule.select_datetime",
            Self::RescheduleProcess => "reschedule.process",
            Self::PostAction => "hub.post_action",
            Self::Complete => "complete",
        }
    }

    /// Parse a wire label. Unknown labels never construct a `State`.
    pub fn from_label(label: &str) -> Result<Self, CoreError> {
        ALL_STATES
            .into_iter()
            .find(|s| s.label() == label)
            .ok_or_else(|| CoreError::UnknownStateLabel(label.to_owned()))
    }

    /// The flow this state belongs to, or `None` for hub/terminal states.
    #[must_use]
    pub fn flow(self) -> Option<Flow> {
        match self {
            Self::BookingCollectService
            | Self::BookingSelectDateTime
            | Self::BookingCollectContact
            | Self::BookingConfirm
            | Self::BookingProcess => Some(Flow::Booking),
            Self::CancelAskConfirmation | Self::CancelVerify | Self::CancelProcess => {
                Some(Flow::Cancellation)
            }
            Self::RescheduleAskConfirmation
            | Self::RescheduleVerify
            | Self::RescheduleSelectDateTime
            | Self::RescheduleProcess => Some(Flow::Rescheduling),
            Self::Start | Self::PostAction | Self::Complete => None,
        }
    }

    /// Whether this state ends the conversation.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Complete
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<String> for State {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_label(&value)
    }
}

impl From<State> for String {
    fn from(state: State) -> Self {
        state.label().to_owned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transition table
// ─────────────────────────────────────────────────────────────────────────────

/// Entry states reachable from anywhere via intent override, plus the
/// terminal state. Added to every non-terminal state's successor set.
const UNIVERSAL_EDGES: [State; 3] = [
    State::CancelAskConfirmation,
    State::RescheduleAskConfirmation,
    State::Complete,
];

/// The transition-legality table.
///
/// Pure and side-effect free: [`TransitionTable::validate`] with the same
/// pair always yields the same result. The table is closed: every state
/// reachable from [`State::Start`] has at least one outgoing edge except
/// the terminal [`State::Complete`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TransitionTable;

impl TransitionTable {
    /// Create the table.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Legal successor states of `state`.
    ///
    /// The set is the flow's own forward edges plus the universal override
    /// edges (minus self-loops). `PostAction` fans out to exactly the three
    /// flow entry states plus `Complete`; `Complete` has no successors.
    #[must_use]
    pub fn successors(self, state: State) -> Vec<State> {
        let forward: &[State] = match state {
            State::Start => &[State::BookingCollectService],
            State::BookingCollectService => &[State::BookingSelectDateTime],
            State::BookingSelectDateTime => &[State::BookingCollectContact],
            State::BookingCollectContact => &[State::BookingConfirm],
            State::BookingConfirm => &[State::BookingProcess],
            State::CancelAskConfirmation => &[State::CancelVerify],
            // Verify states carry a forward edge and an escalation edge;
            // the retry policy, not this table, picks between them.
            State::CancelVerify => &[State::CancelProcess, State::PostAction],
            State::RescheduleAskConfirmation => &[State::RescheduleVerify],
            State::RescheduleVerify => &[State::RescheduleSelectDateTime, State::PostAction],
            State::RescheduleSelectDateTime => &[State::RescheduleProcess],
            State::BookingProcess | State::CancelProcess | State::RescheduleProcess => {
                &[State::PostAction]
            }
            State::PostAction => &[State::BookingCollectService],
            State::Complete => &[],
        };

        if state.is_terminal() {
            return Vec::new();
        }

        let mut set = forward.to_vec();
        for edge in UNIVERSAL_EDGES {
            if edge != state && !set.contains(&edge) {
                set.push(edge);
            }
        }
        set
    }

    /// Whether `requested` is a legal successor of `current`.
    #[must_use]
    pub fn is_legal(self, current: State, requested: State) -> bool {
        self.successors(current).contains(&requested)
    }

    /// Validate a requested transition.
    ///
    /// Returns the requested state when legal. On an illegal request the
    /// engine must not silently accept an out-of-table state: the caller
    /// keeps the session in `current` and surfaces a recoverable error.
    pub fn validate(self, current: State, requested: State) -> Result<State, CoreError> {
        if self.is_legal(current, requested) {
            Ok(requested)
        } else {
            Err(CoreError::IllegalTransition {
                from: current,
                to: requested,
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Directives
// ─────────────────────────────────────────────────────────────────────────────

/// Static per-state instruction used to parametrize the planner call.
///
/// This is configuration, not computed: what the flow expects next and
/// which backend tool (if any) the planner should reach for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    /// What the assistant is trying to accomplish in this state.
    pub objective: &'static str,
    /// The backend tool the planner is expected to call, if any.
    pub expected_tool: Option<&'static str>,
}

/// Directive for `state`.
#[must_use]
pub fn directive_for(state: State) -> Directive {
    match state {
        State::Start => Directive {
            objective: "Greet the customer and find out what they need.",
            expected_tool: None,
        },
        State::BookingCollectService => Directive {
            objective: "Ask which service the customer wants to book.",
            expected_tool: Some("list_services"),
        },
        State::BookingSelectDateTime => Directive {
            objective: "Offer available slots and ask for a date and time.",
            expected_tool: Some("fetch_availability"),
        },
        State::BookingCollectContact => Directive {
            objective: "Collect the customer's name and phone number.",
            expected_tool: None,
        },
        State::BookingConfirm => Directive {
            objective: "Read the booking summary back and ask for confirmation.",
            expected_tool: None,
        },
        State::BookingProcess => Directive {
            objective: "Create the appointment and report the confirmation number.",
            expected_tool: Some("create_booking"),
        },
        State::CancelAskConfirmation => Directive {
            objective: "Confirm the customer wants to cancel and ask for their confirmation number.",
            expected_tool: None,
        },
        State::CancelVerify => Directive {
            objective: "Look the appointment up by confirmation number.",
            expected_tool: Some("find_booking"),
        },
        State::CancelProcess => Directive {
            objective: "Cancel the appointment and confirm it is gone.",
            expected_tool: Some("cancel_booking"),
        },
        State::RescheduleAskConfirmation => Directive {
            objective: "Confirm the customer wants to move their appointment and ask for their confirmation number.",
            expected_tool: None,
        },
        State::RescheduleVerify => Directive {
            objective: "Look the appointment up by confirmation number.",
            expected_tool: Some("find_booking"),
        },
        State::RescheduleSelectDateTime => Directive {
            objective: "Offer available slots and ask for the new date and time.",
            expected_tool: Some("fetch_availability"),
        },
        State::RescheduleProcess => Directive {
            objective: "Move the appointment and report the updated details.",
            expected_tool: Some("reschedule_booking"),
        },
        State::PostAction => Directive {
            objective: "Ask whether the customer needs anything else.",
            expected_tool: None,
        },
        State::Complete => Directive {
            objective: "Say goodbye.",
            expected_tool: None,
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn labels_round_trip() {
        for state in ALL_STATES {
            assert_eq!(State::from_label(state.label()).unwrap(), state);
        }
    }

    #[test]
    fn unknown_label_rejected() {
        assert_matches!(
            State::from_label("booking.typo"),
            Err(CoreError::UnknownStateLabel(_))
        );
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&State::CancelVerify).unwrap();
        assert_eq!(json, "\"cancel.verify\"");
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, State::CancelVerify);
    }

    #[test]
    fn serde_rejects_unknown_label() {
        let result: Result<State, _> = serde_json::from_str("\"nope\"");
        assert!(result.is_err());
    }

    #[test]
    fn every_state_has_a_flow_or_is_hub() {
        assert_eq!(State::BookingConfirm.flow(), Some(Flow::Booking));
        assert_eq!(State::CancelVerify.flow(), Some(Flow::Cancellation));
        assert_eq!(State::RescheduleProcess.flow(), Some(Flow::Rescheduling));
        assert_eq!(State::Start.flow(), None);
        assert_eq!(State::PostAction.flow(), None);
        assert_eq!(State::Complete.flow(), None);
    }

    #[test]
    fn table_is_closed() {
        let table = TransitionTable::new();
        for state in ALL_STATES {
            if state.is_terminal() {
                assert!(table.successors(state).is_empty());
            } else {
                assert!(
                    !table.successors(state).is_empty(),
                    "{state} has no outgoing edge"
                );
            }
        }
    }

    #[test]
    fn post_action_fans_out_to_exactly_entries_and_terminal() {
        let table = TransitionTable::new();
        let mut successors = table.successors(State::PostAction);
        successors.sort_by_key(|s| s.label());

        let mut expected = vec![
            State::BookingCollectService,
            State::CancelAskConfirmation,
            State::RescheduleAskConfirmation,
            State::Complete,
        ];
        expected.sort_by_key(|s| s.label());

        assert_eq!(successors, expected);
    }

    #[test]
    fn post_action_rejects_arbitrary_states() {
        let table = TransitionTable::new();
        for state in [
            State::BookingSelectDateTime,
            State::CancelVerify,
            State::RescheduleProcess,
            State::Start,
        ] {
            assert_matches!(
                table.validate(State::PostAction, state),
                Err(CoreError::IllegalTransition { .. })
            );
        }
    }

    #[test]
    fn process_states_reach_post_action() {
        let table = TransitionTable::new();
        for state in [
            State::BookingProcess,
            State::CancelProcess,
            State::RescheduleProcess,
        ] {
            assert_eq!(table.validate(state, State::PostAction), Ok(State::PostAction));
        }
    }

    #[test]
    fn verify_states_carry_forward_and_escalation_edges() {
        let table = TransitionTable::new();
        assert!(table.is_legal(State::CancelVerify, State::CancelProcess));
        assert!(table.is_legal(State::CancelVerify, State::PostAction));
        assert!(table.is_legal(State::RescheduleVerify, State::RescheduleSelectDateTime));
        assert!(table.is_legal(State::RescheduleVerify, State::PostAction));
    }

    #[test]
    fn overrides_are_legal_from_every_non_terminal_state() {
        let table = TransitionTable::new();
        for state in ALL_STATES {
            if state.is_terminal() {
                continue;
            }
            for target in UNIVERSAL_EDGES {
                if target == state {
                    continue;
                }
                assert!(
                    table.is_legal(state, target),
                    "override {target} should be legal from {state}"
                );
            }
        }
    }

    #[test]
    fn terminal_rejects_everything() {
        let table = TransitionTable::new();
        for state in ALL_STATES {
            assert!(!table.is_legal(State::Complete, state));
        }
    }

    #[test]
    fn mid_booking_cannot_skip_ahead() {
        let table = TransitionTable::new();
        assert_matches!(
            table.validate(State::BookingCollectService, State::BookingProcess),
            Err(CoreError::IllegalTransition { .. })
        );
        assert_matches!(
            table.validate(State::BookingCollectService, State::BookingConfirm),
            Err(CoreError::IllegalTransition { .. })
        );
    }

    #[test]
    fn directives_expected_tools() {
        assert_eq!(
            directive_for(State::CancelVerify).expected_tool,
            Some("find_booking")
        );
        assert_eq!(directive_for(State::PostAction).expected_tool, None);
        assert_eq!(
            directive_for(State::BookingProcess).expected_tool,
            Some("create_booking")
        );
    }

    #[test]
    fn flow_entry_states() {
        assert_eq!(Flow::Booking.entry_state(), State::BookingCollectService);
        assert_eq!(Flow::Cancellation.entry_state(), State::CancelAskConfirmation);
        assert_eq!(
            Flow::Rescheduling.entry_state(),
            State::RescheduleAskConfirmation
        );
    }

    proptest! {
        /// validate is a pure function: same pair, same answer.
        #[test]
        fn validate_is_idempotent(a in 0usize..15, b in 0usize..15) {
            let table = TransitionTable::new();
            let (from, to) = (ALL_STATES[a], ALL_STATES[b]);
            let first = table.validate(from, to);
            let second = table.validate(from, to);
            prop_assert_eq!(first, second);
        }

        /// validate agrees with the successor set, both ways.
        #[test]
        fn validate_matches_successors(a in 0usize..15, b in 0usize..15) {
            let table = TransitionTable::new();
            let (from, to) = (ALL_STATES[a], ALL_STATES[b]);
            let listed = table.successors(from).contains(&to);
            prop_assert_eq!(table.validate(from, to).is_ok(), listed);
        }
    }
}

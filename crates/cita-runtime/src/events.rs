//! Engine lifecycle events, broadcast to any attached transport.
//!
//! Emission is non-blocking: slow receivers lag and drop rather than
//! stalling a turn.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use cita_core::state::State;

use crate::retry::EscalationReason;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// Something the engine did that an observer may care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A turn began for a session.
    TurnStarted {
        /// Thread id.
        session_id: String,
    },
    /// A turn committed.
    TurnCompleted {
        /// Thread id.
        session_id: String,
        /// State the session ended the turn in.
        state: State,
    },
    /// An intent override pre-empted normal progression.
    OverrideFired {
        /// Thread id.
        session_id: String,
        /// The flow-entry state the override targeted.
        target: State,
    },
    /// The retry policy forced a transition to the hub.
    EscalationFired {
        /// Thread id.
        session_id: String,
        /// Why the escalation fired.
        reason: EscalationReason,
    },
    /// The idle sweep evicted sessions.
    SessionsEvicted {
        /// How many sessions were dropped.
        count: usize,
    },
}

/// Broadcast emitter for [`EngineEvent`].
pub struct EventEmitter {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventEmitter {
    /// Emitter with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Emitter with a custom channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit to all subscribers; returns how many received it.
    pub fn emit(&self, event: EngineEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_is_fine() {
        let emitter = EventEmitter::new();
        let received = emitter.emit(EngineEvent::SessionsEvicted { count: 0 });
        assert_eq!(received, 0);
    }

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let emitter = EventEmitter::new();
        let mut rx = emitter.subscribe();

        let _ = emitter.emit(EngineEvent::TurnStarted {
            session_id: "t-1".into(),
        });
        let _ = emitter.emit(EngineEvent::TurnCompleted {
            session_id: "t-1".into(),
            state: State::PostAction,
        });

        assert_eq!(
            rx.recv().await.unwrap(),
            EngineEvent::TurnStarted {
                session_id: "t-1".into()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            EngineEvent::TurnCompleted {
                session_id: "t-1".into(),
                state: State::PostAction
            }
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(EngineEvent::EscalationFired {
            session_id: "t-1".into(),
            reason: EscalationReason::RetryLimit,
        })
        .unwrap();
        assert_eq!(json["type"], "escalation_fired");
        assert_eq!(json["reason"], "retry_limit");
    }
}

//! Runtime error types.
//!
//! Nothing in the engine crashes the process: planner and tool failures
//! resolve to canonical messages inside a turn, so the errors here are the
//! ones a *caller* must handle: a busy session, a missing session, a
//! persistence failure, or a cancelled turn.

use thiserror::Error;

/// Errors surfaced by the runtime to its caller.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The session already has a turn in flight. Per-session turns are
    /// strictly serialized; the caller should retry after the current
    /// turn completes.
    #[error("session busy: {0}")]
    SessionBusy(String),

    /// No session exists for the given thread id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The snapshot store failed or timed out; the turn committed nothing.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// The turn was cancelled mid-flight; the turn committed nothing.
    #[error("turn cancelled for session {0}")]
    Cancelled(String),
}

//! # cita-runtime
//!
//! Turn orchestration for the cita dialogue engine.
//!
//! - **Retry policy**: classify tool results, bound retries, escalate
//! - **Conditional router**: skip the policy outside the verify states
//! - **Tool execution**: concurrent when independent, ordered when
//!   dependent, per-call timeouts
//! - **Orchestrator step**: the per-turn driver
//! - **Session store**: identity resolution, per-session turn
//!   serialization, idle eviction
//! - **Persistence boundary**: atomic snapshot replace
//! - **TTL cache**: shared expiring memoization
//! - **Events**: engine lifecycle broadcast
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on: cita-core, cita-llm, cita-settings.

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;
pub mod events;
pub mod persist;
pub mod retry;
pub mod route;
pub mod step;
pub mod store;
pub mod testutil;
pub mod tools;

pub use cache::TtlCache;
pub use errors::RuntimeError;
pub use events::{EngineEvent, EventEmitter};
pub use persist::{MemorySnapshotStore, PersistError, Snapshot, SnapshotStore};
pub use retry::{Action, EscalationReason, Outcome, RetryPolicy, classify};
pub use route::needs_retry_policy;
pub use step::{DialogueEngine, TurnOutcome, TurnRequest};
pub use store::{SessionStore, TurnGuard};
pub use tools::{TaggedResult, ToolBackend, execute_batch};

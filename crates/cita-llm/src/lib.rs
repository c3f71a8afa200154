//! # cita-llm
//!
//! The planner boundary: the external LLM collaborator that proposes the
//! next utterance and/or tool invocations, specified here only at its
//! seam. The engine treats the planner as a synchronous request/response
//! collaborator with a caller-supplied timeout; on timeout the turn
//! resolves to system-error semantics instead of propagating a raw
//! failure.
//!
//! - **Types**: [`types::PlannerRequest`], [`types::PlannerResponse`],
//!   [`types::ToolRequest`] with declared dependencies
//! - **Trait**: [`planner::Planner`] plus [`planner::plan_with_timeout`]
//! - **Test support**: [`testutil::ScriptedPlanner`]
//!
//! ## Crate Position
//!
//! Boundary crate. Depends on: cita-core. Depended on by: cita-runtime.

#![deny(unsafe_code)]

pub mod errors;
pub mod planner;
pub mod testutil;
pub mod types;

pub use errors::PlannerError;
pub use planner::{DEFAULT_PLANNER_TIMEOUT, Planner, plan_with_timeout};
pub use types::{PlannerRequest, PlannerResponse, ToolRequest, ToolSchema};

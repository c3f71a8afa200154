//! The `Planner` trait and the timeout wrapper around it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::PlannerError;
use crate::types::{PlannerRequest, PlannerResponse};

/// Engine default for the planner call timeout.
pub const DEFAULT_PLANNER_TIMEOUT: Duration = Duration::from_secs(15);

/// The external LLM collaborator.
///
/// Given the current directive and trimmed history, proposes the next
/// utterance and/or a batch of tool invocations. Implementations live
/// outside this engine (HTTP providers, on-device models); the engine only
/// depends on this seam.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Produce the next step for a turn.
    async fn plan(&self, request: PlannerRequest) -> Result<PlannerResponse, PlannerError>;
}

/// Call the planner with a hard deadline.
///
/// An elapsed deadline resolves to [`PlannerError::Timeout`]; the
/// orchestrator treats that identically to a system-error tool result.
pub async fn plan_with_timeout(
    planner: &dyn Planner,
    request: PlannerRequest,
    timeout: Duration,
) -> Result<PlannerResponse, PlannerError> {
    debug!(
        history_len = request.history.len(),
        timeout_ms = timeout.as_millis() as u64,
        "calling planner"
    );
    match tokio::time::timeout(timeout, planner.plan(request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "planner timed out");
            Err(PlannerError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

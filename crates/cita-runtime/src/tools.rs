//! Tool backend seam and batch execution.
//!
//! The backend answers every invocation with a single tagged string, the
//! wire contract the retry policy classifies (see `retry`). Within one
//! turn, calls with no declared dependency execute concurrently and are
//! joined before routing; a batch containing any declared dependency
//! executes strictly in list order.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use cita_llm::types::{ToolRequest, ToolSchema};

/// The tool/backend collaborator.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Schemas of the tools this backend offers, for the planner request.
    fn schemas(&self) -> Vec<ToolSchema>;

    /// Invoke one tool. The returned string's prefix/substrings encode
    /// the outcome (`SUCCESS:` / `ERROR:` plus qualifying phrases).
    async fn invoke(&self, call: &ToolRequest) -> String;
}

/// One executed call with its tagged result string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedResult {
    /// Planner-assigned call id.
    pub call_id: String,
    /// Tool name.
    pub name: String,
    /// Tagged result string.
    pub text: String,
}

/// Execute a batch of tool calls.
///
/// Results come back in request order regardless of completion order, so
/// history appends stay deterministic. A call that outlives `timeout`
/// resolves to a timed-out error string (a system error to the
/// classifier); a cancelled turn resolves remaining calls to cancelled
/// error strings without invoking the backend.
#[instrument(skip_all, fields(calls = calls.len()))]
pub async fn execute_batch(
    backend: &dyn ToolBackend,
    calls: &[ToolRequest],
    timeout: Duration,
    cancel: &CancellationToken,
) -> Vec<TaggedResult> {
    if calls.is_empty() {
        return Vec::new();
    }

    let has_dependency = calls.iter().any(|call| !call.depends_on.is_empty());
    if has_dependency {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(invoke_one(backend, call, timeout, cancel).await);
        }
        results
    } else {
        join_all(
            calls
                .iter()
                .map(|call| invoke_one(backend, call, timeout, cancel)),
        )
        .await
    }
}

async fn invoke_one(
    backend: &dyn ToolBackend,
    call: &ToolRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> TaggedResult {
    let started = Instant::now();
    let text = if cancel.is_cancelled() {
        warn!(tool = %call.name, "skipping tool call, turn cancelled");
        format!("ERROR: {} cancelled", call.name)
    } else {
        match tokio::time::timeout(timeout, backend.invoke(call)).await {
            Ok(text) => text,
            Err(_) => {
                warn!(tool = %call.name, timeout_ms = timeout.as_millis() as u64, "tool call timed out");
                format!("ERROR: {} timed out", call.name)
            }
        }
    };

    counter!("tool_calls_total", "tool" => call.name.clone()).increment(1);
    histogram!("tool_call_duration_seconds", "tool" => call.name.clone())
        .record(started.elapsed().as_secs_f64());
    debug!(tool = %call.name, call_id = %call.id, "tool call finished");

    TaggedResult {
        call_id: call.id.clone(),
        name: call.name.clone(),
        text,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

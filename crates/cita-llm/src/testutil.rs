//! Test collaborators shared across the workspace's test suites.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::PlannerError;
use crate::planner::Planner;
use crate::types::{PlannerRequest, PlannerResponse};

/// A planner that replays a fixed script of responses, one per call.
///
/// An exhausted script answers [`PlannerError::Malformed`] so a test that
/// under-provisions its script fails loudly instead of hanging.
pub struct ScriptedPlanner {
    script: Mutex<VecDeque<PlannerResponse>>,
    requests: Mutex<Vec<PlannerRequest>>,
    delay: Option<Duration>,
}

impl ScriptedPlanner {
    /// Build a planner over a response script.
    pub fn new(script: impl IntoIterator<Item = PlannerResponse>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep this long before answering (for timeout tests).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests observed so far, in call order.
    pub fn seen_requests(&self) -> Vec<PlannerRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, request: PlannerRequest) -> Result<PlannerResponse, PlannerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().push(request);
        self.script
            .lock()
            .pop_front()
            .ok_or_else(|| PlannerError::Malformed("scripted planner exhausted".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_and_records_requests() {
        let planner = ScriptedPlanner::new([
            PlannerResponse::message_only("first"),
            PlannerResponse::message_only("second"),
        ]);
        let request = PlannerRequest {
            objective: "obj".into(),
            expected_tool: None,
            history: vec![],
            tools: vec![],
        };

        let a = planner.plan(request.clone()).await.unwrap();
        let b = planner.plan(request).await.unwrap();
        assert_eq!(a.message.as_deref(), Some("first"));
        assert_eq!(b.message.as_deref(), Some("second"));
        assert_eq!(planner.seen_requests().len(), 2);
    }
}

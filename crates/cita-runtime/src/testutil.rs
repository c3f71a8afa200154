//! Test collaborators for the runtime's own suites and downstream tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use cita_llm::types::{ToolRequest, ToolSchema};

use crate::tools::ToolBackend;

/// A tool backend that replays scripted result strings per tool name.
///
/// Each invocation of a tool pops the next scripted result for that name;
/// an unscripted invocation answers a connectivity error so the test
/// fails toward the escalation path rather than a silent success.
#[derive(Default)]
pub struct ScriptedToolBackend {
    scripts: Mutex<HashMap<String, VecDeque<String>>>,
    invocations: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedToolBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result string for a tool.
    #[must_use]
    pub fn with_result(self, tool: &str, result: &str) -> Self {
        self.scripts
            .lock()
            .entry(tool.to_owned())
            .or_default()
            .push_back(result.to_owned());
        self
    }

    /// Sleep this long inside every invocation (for timeout tests).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Tool names in the order they were actually invoked.
    pub fn invocation_order(&self) -> Vec<String> {
        self.invocations.lock().clone()
    }
}

#[async_trait]
impl ToolBackend for ScriptedToolBackend {
    fn schemas(&self) -> Vec<ToolSchema> {
        self.scripts
            .lock()
            .keys()
            .map(|name| ToolSchema {
                name: name.clone(),
                description: format!("scripted {name}"),
                parameters: json!({"type": "object"}),
            })
            .collect()
    }

    async fn invoke(&self, call: &ToolRequest) -> String {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.invocations.lock().push(call.name.clone());
        self.scripts
            .lock()
            .get_mut(&call.name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| format!("ERROR: could not connect to {}", call.name))
    }
}

//! Request/response types at the planner seam.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use cita_core::messages::Message;

/// Schema descriptor for one tool offered to the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name as the backend knows it.
    pub name: String,
    /// What the tool does, for the planner's benefit.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

/// A tool invocation requested by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Planner-assigned call id, referenced by `depends_on`.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Arguments object.
    pub arguments: Map<String, Value>,
    /// Ids of calls in the same batch that must complete first.
    ///
    /// Calls without dependencies may execute concurrently; a batch with
    /// any declared dependency executes strictly in list order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl ToolRequest {
    /// A dependency-free call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            depends_on: Vec::new(),
        }
    }

    /// Declare that this call depends on an earlier call in the batch.
    #[must_use]
    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }
}

/// What the engine sends the planner each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerRequest {
    /// The current state's objective (from the directive table).
    pub objective: String,
    /// The tool the directive expects the planner to reach for, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_tool: Option<String>,
    /// Trimmed message history, oldest first.
    pub history: Vec<Message>,
    /// Tools the planner may request.
    pub tools: Vec<ToolSchema>,
}

/// What the planner answers with.
///
/// Either a terminal assistant message, or a batch of tool calls, or both
/// (message accompanies the calls). The proposed next state is a raw wire
/// label, a *proposal* applied only if the transition table accepts it;
/// a malformed or unknown label defaults to "no transition requested".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerResponse {
    /// Terminal assistant message, if the planner produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Ordered tool-call batch (possibly empty).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolRequest>,
    /// Proposed next-state wire label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_state: Option<String>,
    /// Proposed collected-data updates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_updates: BTreeMap<String, String>,
}

impl PlannerResponse {
    /// A plain assistant message with no tool calls or proposals.
    #[must_use]
    pub fn message_only(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Self::default()
        }
    }

    /// Whether the response carries neither a message nor tool calls.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_request_dependency_builder() {
        let fetch = ToolRequest::new("c1", "fetch_availability", Map::new());
        let show = ToolRequest::new("c2", "show_availability", Map::new()).after("c1");
        assert!(fetch.depends_on.is_empty());
        assert_eq!(show.depends_on, ["c1"]);
    }

    #[test]
    fn response_serde_skips_empty_fields() {
        let response = PlannerResponse::message_only("hola");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, json!({"message": "hola"}));
    }

    #[test]
    fn response_round_trips_with_calls() {
        let mut args = Map::new();
        let _ = args.insert("confirmation".into(), json!("CNF-1"));
        let response = PlannerResponse {
            message: None,
            tool_calls: vec![ToolRequest::new("c1", "find_booking", args)],
            proposed_state: Some("cancel.verify".into()),
            data_updates: BTreeMap::from([("confirmation".to_owned(), "CNF-1".to_owned())]),
        };
        let json = serde_json::to_string(&response).unwrap();
        let back: PlannerResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn empty_response_detected() {
        assert!(PlannerResponse::default().is_empty());
        assert!(!PlannerResponse::message_only("x").is_empty());
    }
}

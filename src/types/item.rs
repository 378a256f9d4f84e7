//! Conversation items: raw protocol payloads and the append-only run log.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Raw protocol payload exchanged with the model.
///
/// These are the items a model client receives as input and returns as output.
/// Function-call arguments are kept as the raw JSON text the model produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseItem {
    Message {
        role: Role,
        content: String,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

impl ResponseItem {
    pub fn user(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn function_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::FunctionCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput {
            call_id: call_id.into(),
            output: output.into(),
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCall { call_id, .. } | Self::FunctionCallOutput { call_id, .. } => {
                Some(call_id)
            }
            Self::Message { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message { content, .. } => Some(content),
            _ => None,
        }
    }
}

/// One entry of the run log.
///
/// Items are appended in production order and never mutated afterwards. The producing
/// agent is recorded by name; agents themselves live in the [`AgentGraph`](crate::AgentGraph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunItem {
    pub agent: String,
    #[serde(flatten)]
    pub kind: RunItemKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum RunItemKind {
    /// Assistant message text.
    Message { raw: ResponseItem },
    /// A function call requested by the model, including hand-off calls.
    ToolCall { raw: ResponseItem },
    /// Output of a function call; `output` is the structured value, `raw` the wire form.
    ToolCallOutput {
        raw: ResponseItem,
        output: Value,
        is_error: bool,
    },
    /// Transfer of control between agents.
    Handoff {
        raw: ResponseItem,
        source: String,
        target: String,
    },
}

impl RunItem {
    pub fn message(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            kind: RunItemKind::Message {
                raw: ResponseItem::assistant(content),
            },
        }
    }

    pub fn tool_call(agent: impl Into<String>, raw: ResponseItem) -> Self {
        Self {
            agent: agent.into(),
            kind: RunItemKind::ToolCall { raw },
        }
    }

    pub fn tool_output(
        agent: impl Into<String>,
        call_id: impl Into<String>,
        output: Value,
        is_error: bool,
    ) -> Self {
        let raw = ResponseItem::function_call_output(call_id, value_to_text(&output));
        Self {
            agent: agent.into(),
            kind: RunItemKind::ToolCallOutput {
                raw,
                output,
                is_error,
            },
        }
    }

    pub fn handoff(
        call_id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        let raw = ResponseItem::function_call_output(
            call_id,
            serde_json::json!({ "assistant": target }).to_string(),
        );
        Self {
            agent: source.clone(),
            kind: RunItemKind::Handoff {
                raw,
                source,
                target,
            },
        }
    }

    pub fn raw(&self) -> &ResponseItem {
        match &self.kind {
            RunItemKind::Message { raw }
            | RunItemKind::ToolCall { raw }
            | RunItemKind::ToolCallOutput { raw, .. }
            | RunItemKind::Handoff { raw, .. } => raw,
        }
    }

    pub fn is_handoff(&self) -> bool {
        matches!(self.kind, RunItemKind::Handoff { .. })
    }

    pub fn is_tool_output(&self) -> bool {
        matches!(self.kind, RunItemKind::ToolCallOutput { .. })
    }

    /// Structured output of a tool-call-output item.
    pub fn output(&self) -> Option<&Value> {
        match &self.kind {
            RunItemKind::ToolCallOutput { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn to_input_item(&self) -> ResponseItem {
        self.raw().clone()
    }
}

/// Text of a message item, or `None` for any other kind.
pub fn text_message_output(item: &RunItem) -> Option<&str> {
    match &item.kind {
        RunItemKind::Message { raw } => raw.text(),
        _ => None,
    }
}

/// Concatenated text of every message item in `items`.
pub fn text_message_outputs(items: &[RunItem]) -> String {
    items.iter().filter_map(text_message_output).collect()
}

/// Name of the agent that is active after `items`, given the agent that started them.
///
/// The last hand-off decides; without one the starting agent stays active.
pub fn active_agent_after<'a>(items: &'a [RunItem], starting_agent: &'a str) -> &'a str {
    items
        .iter()
        .rev()
        .find_map(|item| match &item.kind {
            RunItemKind::Handoff { target, .. } => Some(target.as_str()),
            _ => None,
        })
        .unwrap_or(starting_agent)
}

/// Wire text for a tool output: strings pass through, everything else is JSON-encoded.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_item_serialization() {
        let item = ResponseItem::function_call("call_1", "add", r#"{"a":1}"#);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "function_call");
        assert_eq!(value["name"], "add");

        let message = ResponseItem::user("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["role"], "user");
    }

    #[test]
    fn test_run_item_carries_agent() {
        let item = RunItem::tool_output("Triage", "call_1", json!({"sum": 3}), false);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["agent"], "Triage");
        assert_eq!(value["item_type"], "tool_call_output");
        assert_eq!(value["raw"]["output"], r#"{"sum":3}"#);

        let back: RunItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_handoff_item() {
        let item = RunItem::handoff("call_9", "Triage", "Billing");
        assert!(item.is_handoff());
        assert_eq!(item.agent, "Triage");
        assert_eq!(item.raw().call_id(), Some("call_9"));
        match item.raw() {
            ResponseItem::FunctionCallOutput { output, .. } => {
                assert!(output.contains("Billing"));
            }
            other => panic!("unexpected raw item: {:?}", other),
        }
    }

    #[test]
    fn test_active_agent_after() {
        let items = vec![
            RunItem::message("Triage", "routing"),
            RunItem::handoff("c1", "Triage", "Billing"),
            RunItem::message("Billing", "hello"),
            RunItem::handoff("c2", "Billing", "Refunds"),
        ];
        assert_eq!(active_agent_after(&items, "Triage"), "Refunds");
        assert_eq!(active_agent_after(&items[..1], "Triage"), "Triage");
        assert_eq!(active_agent_after(&[], "Triage"), "Triage");
    }

    #[test]
    fn test_text_message_outputs() {
        let items = vec![
            RunItem::message("A", "Hello, "),
            RunItem::tool_output("A", "c1", json!("ignored"), false),
            RunItem::message("A", "world"),
        ];
        assert_eq!(text_message_outputs(&items), "Hello, world");
        assert_eq!(text_message_output(&items[1]), None);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("plain")), "plain");
        assert_eq!(value_to_text(&json!(42)), "42");
        assert_eq!(value_to_text(&json!({"a": true})), r#"{"a":true}"#);
    }
}

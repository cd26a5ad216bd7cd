//! Shared types used across Threadkeep modules
//!
//! Contains message structures, tool definitions, and tool results.

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation thread
///
/// Messages are immutable once built; use the constructors and accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    /// Tool name, only on tool-role messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::assistant_with_tools(content, Vec::new())
    }

    /// Create an assistant message requesting tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a tool-role message answering the given call
    pub fn tool_result(call: &ToolCall, result: &ToolCallResult) -> Self {
        Self {
            role: Role::Tool,
            content: result.to_content(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether this message requests at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Parse the content of a tool-role message back into a structured value
    pub fn tool_payload(&self) -> Option<serde_json::Value> {
        if self.role != Role::Tool {
            return None;
        }
        serde_json::from_str(&self.content).ok()
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call identifier within the thread
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call with an explicit id
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a tool call with a generated id, for providers that don't return one
    pub fn with_generated_id(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::new(format!("call_{}", uuid::Uuid::new_v4().simple()), name, arguments)
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Result of invoking a tool
///
/// Serializes untagged: a success is the bare payload, a failure is
/// `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCallResult {
    Error { error: String },
    Success(serde_json::Value),
}

impl ToolCallResult {
    /// Create a successful result
    pub fn success(payload: serde_json::Value) -> Self {
        Self::Success(payload)
    }

    /// Create a failed result
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The error message, if this is a failure
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { error } => Some(error),
            Self::Success(_) => None,
        }
    }

    /// Compact JSON rendering used as tool message content
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!("{{\"error\":\"unserializable tool result: {}\"}}", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_result_shape() {
        let result = ToolCallResult::error("Division by zero is not allowed");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"error": "Division by zero is not allowed"})
        );
    }

    #[test]
    fn test_untagged_deserialize_prefers_error_form() {
        let parsed: ToolCallResult = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert!(parsed.is_error());

        let parsed: ToolCallResult = serde_json::from_value(json!({"result": 4})).unwrap();
        assert_eq!(parsed, ToolCallResult::success(json!({"result": 4})));
    }

    #[test]
    fn test_tool_result_message_links_call() {
        let call = ToolCall::new("call_1", "calculator", json!({}));
        let msg = Message::tool_result(&call, &ToolCallResult::success(json!({"result": 4})));

        assert_eq!(msg.role(), Role::Tool);
        assert_eq!(msg.tool_call_id(), Some("call_1"));
        assert_eq!(msg.name(), Some("calculator"));
        assert_eq!(msg.tool_payload(), Some(json!({"result": 4})));
    }

    #[test]
    fn test_message_serialization_omits_empty_fields() {
        let value = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_generated_call_ids_are_unique() {
        let a = ToolCall::with_generated_id("web_search", json!({}));
        let b = ToolCall::with_generated_id("web_search", json!({}));
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("call_"));
    }
}

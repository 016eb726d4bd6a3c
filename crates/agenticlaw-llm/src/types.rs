//! Non-streaming LLM adapter wire types (spec §6): one request, one
//! response, no deltas.

use serde::{Deserialize, Serialize};

/// One turn's message history entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Function-calling-shaped tool schema, passed verbatim to the provider on
/// every turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    pub kind: String,
    pub function: FunctionSchema,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionSchema {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// A single tool invocation requested by the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub kind: String,
    pub function: ToolCallFunction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// Raw JSON-encoded argument object, parsed by the caller.
    pub arguments_json: String,
}

impl ToolCall {
    pub fn parsed_arguments(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.function.arguments_json)
    }
}

/// The single reply from one `chat_completion` call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

fn default_role() -> String {
    "assistant".to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

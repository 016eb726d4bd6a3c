//! Standalone tools a `toolbox` node can contribute (spec §4.5 step 2):
//! named capabilities that aren't bound to any specific kg/memory resource.

use crate::registry::{Tool, ToolResult};
use chrono::Utc;
use serde_json::{json, Value};

/// A scratchpad the model can use to reason out loud before acting; the
/// thought is returned verbatim so it lands in the conversation history.
pub struct ThinkTool;

#[async_trait::async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "think"
    }

    fn description(&self) -> &str {
        "Record a step-by-step thought about the current situation before choosing the next action. Does not change any state."
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "thought": { "type": "string" }
            },
            "required": ["thought"]
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        match args.get("thought").and_then(Value::as_str) {
            Some(thought) => ToolResult::text(thought),
            None => ToolResult::error("missing required field: thought"),
        }
    }
}

/// Returns the current UTC date and time.
pub struct GetDateTimeTool;

#[async_trait::async_trait]
impl Tool for GetDateTimeTool {
    fn name(&self) -> &str {
        "get_date_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time (UTC)."
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> ToolResult {
        ToolResult::text(Utc::now().format("%A, %d %B %Y, %H:%M UTC").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn think_echoes_the_thought() {
        let tool = ThinkTool;
        assert!(tool.is_read_only());
        let result = tool.execute(json!({"thought": "check the map first"})).await;
        match result {
            ToolResult::Text(s) => assert_eq!(s, "check the map first"),
            other => panic!("expected text result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn think_without_thought_is_an_error() {
        let tool = ThinkTool;
        assert!(tool.execute(json!({})).await.is_error());
    }

    #[tokio::test]
    async fn get_date_time_returns_non_empty_text() {
        let tool = GetDateTimeTool;
        match tool.execute(json!({})).await {
            ToolResult::Text(s) => assert!(!s.is_empty()),
            other => panic!("expected text result, got {other:?}"),
        }
    }
}
